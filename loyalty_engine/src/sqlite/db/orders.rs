use log::debug;
use lpg_common::Points;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{AccountId, NewOrder, Order, OrderNumber, OrderStatusType},
    traits::LoyaltyGatewayError,
};

/// Inserts the order into the database, returning `false` in the second parameter if the order already exists.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), LoyaltyGatewayError> {
    let inserted = match fetch_order_by_number(&order.order_number, conn).await? {
        Some(order) => (order, false),
        None => {
            let order = insert_order(order, conn).await?;
            debug!("📝️ Order {} inserted with id {}", order.order_number, order.id);
            (order, true)
        },
    };
    Ok(inserted)
}

/// Inserts a new order using the given connection. This is not atomic on its own. You can embed this call inside
/// a transaction if you need atomicity, and pass `&mut *tx` as the connection argument.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, LoyaltyGatewayError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                status,
                uploaded_at
            ) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order.order_number)
    .bind(order.user_id)
    .bind(OrderStatusType::New)
    .bind(order.uploaded_at)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Fetches every order whose status is one of `statuses`.
///
/// Resulting orders are ordered by `uploaded_at` in ascending order.
pub async fn orders_by_status(
    statuses: &[OrderStatusType],
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM orders WHERE status IN (");
    let clause = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
    builder.push(clause);
    builder.push(") ORDER BY uploaded_at ASC");
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

pub async fn orders_for_account(user: AccountId, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY uploaded_at ASC")
        .bind(user)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Applies an accrual settlement to the order, guarded so that it only fires from a non-terminal status.
///
/// Returns `None` when no row matched, i.e. when the order does not exist or has already reached a terminal
/// status. The guard is what makes redundant settlement attempts (and concurrent ones for the same order)
/// harmless: at most one of them observes a non-terminal row.
pub(crate) async fn settle_order(
    number: &OrderNumber,
    new_status: OrderStatusType,
    accrual: Option<Points>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, accrual = $2, updated_at = CURRENT_TIMESTAMP
            WHERE order_number = $3 AND status NOT IN ('PROCESSED', 'INVALID')
            RETURNING *;
        "#,
    )
    .bind(new_status)
    .bind(accrual)
    .bind(number.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
