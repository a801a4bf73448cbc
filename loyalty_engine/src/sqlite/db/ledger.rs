use log::trace;
use lpg_common::Points;
use sqlx::SqliteConnection;

use crate::db_types::{AccountId, LedgerEntry, OrderNumber, TransactionKind};

/// Appends one entry to the ledger.
///
/// Entries are never updated or deleted after this point; corrections are made by appending compensating entries.
pub async fn insert_entry(
    from: AccountId,
    to: AccountId,
    amount: Points,
    order: &OrderNumber,
    kind: TransactionKind,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, sqlx::Error> {
    let entry: LedgerEntry = sqlx::query_as(
        r#"
            INSERT INTO ledger_transactions (
                from_account,
                to_account,
                amount,
                order_number,
                kind
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(amount)
    .bind(order.as_str())
    .bind(kind)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Ledger entry {} recorded: {} -> {} ({})", entry.id, from, to, amount);
    Ok(entry)
}

/// The signed sum of every entry that mentions the account: credits add, debits subtract.
pub async fn balance_for_account(account: AccountId, conn: &mut SqliteConnection) -> Result<Points, sqlx::Error> {
    let balance: i64 = sqlx::query_scalar(
        r#"
            SELECT COALESCE(SUM(
                CASE WHEN to_account = $1 THEN amount
                     WHEN from_account = $1 THEN -amount
                     ELSE 0
                END), 0)
            FROM ledger_transactions
            WHERE from_account = $1 OR to_account = $1
        "#,
    )
    .bind(account)
    .fetch_one(conn)
    .await?;
    Ok(Points::from(balance))
}

/// The lifetime total the account has withdrawn.
pub async fn withdrawn_total_for_account(
    account: AccountId,
    conn: &mut SqliteConnection,
) -> Result<Points, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM ledger_transactions
            WHERE from_account = $1 AND kind = 'withdraw'
        "#,
    )
    .bind(account)
    .fetch_one(conn)
    .await?;
    Ok(Points::from(total))
}

pub async fn entries_for_account(
    account: AccountId,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let entries = sqlx::query_as(
        r#"
            SELECT * FROM ledger_transactions
            WHERE from_account = $1 OR to_account = $1
            ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(account)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

pub async fn withdrawals_for_account(
    account: AccountId,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let entries = sqlx::query_as(
        r#"
            SELECT * FROM ledger_transactions
            WHERE from_account = $1 AND kind = 'withdraw'
            ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(account)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

/// Every ledger entry attached to the given order number. Used to assert settlement idempotence in tests and
/// consistency checks.
pub async fn entries_for_order(
    order: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM ledger_transactions WHERE order_number = $1 ORDER BY id ASC")
        .bind(order.as_str())
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
