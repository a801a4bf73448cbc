//! Ledger invariants: balances always derive from the transaction log, withdrawals never tear it.
use loyalty_engine::{
    db_types::{AccountId, AccrualResult, OrderNumber, OrderStatusType, TransactionKind},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{LedgerApiError, LedgerManagement, LoyaltyGatewayError},
    AuthApi,
    LedgerApi,
    OrderFlowApi,
    SqliteDatabase,
};
use lpg_common::Points;

async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Seeds the user with a balance by pushing an order through the processed flow.
async fn credit_user(db: &SqliteDatabase, user: AccountId, order: &str, points: i64) {
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    api.process_new_order(OrderNumber::from(order), user).await.expect("Error submitting order");
    let stored = db.fetch_order_by_number(&OrderNumber::from(order)).await.unwrap().unwrap();
    let result = AccrualResult::new(OrderStatusType::Processed, Some(Points::from_points(points)));
    api.reconcile(&stored, result).await.expect("Error crediting user");
}

#[tokio::test]
async fn withdrawal_moves_points_to_the_system_account() {
    let db = new_test_db().await;
    let auth = AuthApi::new(db.clone());
    let user = auth.register_user("alice", "$argon2id$dummy").await.unwrap();
    credit_user(&db, user.id, "12345678903", 500).await;

    let ledger = LedgerApi::new(db.clone());
    let entry = ledger.withdraw(user.id, Points::from_points(100), OrderNumber::from("2377225624")).await.unwrap();
    assert_eq!(entry.from_account, user.id);
    assert!(entry.to_account.is_system());
    assert_eq!(entry.kind, TransactionKind::Withdraw);

    let balance = ledger.balance(user.id).await.unwrap();
    assert_eq!(balance.current, Points::from_points(400));
    assert_eq!(balance.withdrawn, Points::from_points(100));

    let withdrawals = ledger.withdrawals(user.id).await.unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].order, OrderNumber::from("2377225624"));
    assert_eq!(withdrawals[0].sum, Points::from_points(100));
}

#[tokio::test]
async fn insufficient_funds_leaves_the_ledger_untouched() {
    let db = new_test_db().await;
    let auth = AuthApi::new(db.clone());
    let user = auth.register_user("u2", "$argon2id$dummy").await.unwrap();
    credit_user(&db, user.id, "12345678903", 50).await;

    let ledger = LedgerApi::new(db.clone());
    let err = ledger.withdraw(user.id, Points::from_points(100), OrderNumber::from("2377225624")).await.unwrap_err();
    match err {
        LoyaltyGatewayError::LedgerError(LedgerApiError::InsufficientFunds { available, requested }) => {
            assert_eq!(available, Points::from_points(50));
            assert_eq!(requested, Points::from_points(100));
        },
        other => panic!("Expected InsufficientFunds, got {other}"),
    }
    assert_eq!(ledger.balance(user.id).await.unwrap().current, Points::from_points(50));
    assert_eq!(ledger.withdrawals(user.id).await.unwrap().len(), 0);
}

#[tokio::test]
async fn withdrawals_validate_amount_and_order_number() {
    let db = new_test_db().await;
    let auth = AuthApi::new(db.clone());
    let user = auth.register_user("u3", "$argon2id$dummy").await.unwrap();
    let ledger = LedgerApi::new(db.clone());

    let err = ledger.withdraw(user.id, Points::ZERO, OrderNumber::from("2377225624")).await.unwrap_err();
    assert!(matches!(err, LoyaltyGatewayError::LedgerError(LedgerApiError::NonPositiveAmount(_))));

    let err = ledger.withdraw(user.id, Points::from_points(10), OrderNumber::from("987654321")).await.unwrap_err();
    assert!(matches!(err, LoyaltyGatewayError::LedgerError(LedgerApiError::InvalidOrderNumber(_))));

    assert_eq!(ledger.history(user.id).await.unwrap().len(), 0);
}

#[tokio::test]
async fn balance_always_equals_the_recomputed_transaction_sum() {
    let db = new_test_db().await;
    let auth = AuthApi::new(db.clone());
    let user = auth.register_user("u4", "$argon2id$dummy").await.unwrap();
    let ledger = LedgerApi::new(db.clone());

    credit_user(&db, user.id, "12345678903", 500).await;
    credit_user(&db, user.id, "79927398713", 250).await;
    ledger.withdraw(user.id, Points::from_points(120), OrderNumber::from("2377225624")).await.unwrap();
    ledger.withdraw(user.id, Points::from_points(30), OrderNumber::from("4111111111111111")).await.unwrap();

    let entries = ledger.history(user.id).await.unwrap();
    assert_eq!(entries.len(), 4);
    let recomputed: Points = entries
        .iter()
        .map(|e| if e.to_account == user.id { e.amount } else { -e.amount })
        .sum();
    assert_eq!(ledger.balance(user.id).await.unwrap().current, recomputed);
    assert_eq!(recomputed, Points::from_points(600));

    let withdrawn: Points = entries
        .iter()
        .filter(|e| e.kind == TransactionKind::Withdraw && e.from_account == user.id)
        .map(|e| e.amount)
        .sum();
    assert_eq!(ledger.balance(user.id).await.unwrap().withdrawn, withdrawn);
    assert_eq!(withdrawn, Points::from_points(150));
}

#[tokio::test]
async fn duplicate_usernames_are_rejected() {
    let db = new_test_db().await;
    let auth = AuthApi::new(db.clone());
    auth.register_user("alice", "$argon2id$dummy").await.unwrap();
    let err = auth.register_user("alice", "$argon2id$other").await.unwrap_err();
    assert!(matches!(err, loyalty_engine::traits::AuthApiError::UsernameTaken(_)));
}
