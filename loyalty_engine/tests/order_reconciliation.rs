//! End-to-end reconciliation tests against a throwaway SQLite database.
use loyalty_engine::{
    db_types::{AccrualResult, OrderNumber, OrderStatusType},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{InsertOrderResult, LedgerManagement, LoyaltyGatewayDatabase, LoyaltyGatewayError},
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

async fn register_user(db: &SqliteDatabase, name: &str) -> loyalty_engine::db_types::User {
    let auth = AuthApi::new(db.clone());
    auth.register_user(name, "$argon2id$dummy").await.expect("Error creating user")
}

async fn submit_order(api: &OrderFlowApi<SqliteDatabase>, number: &str, user: loyalty_engine::db_types::AccountId) {
    let result = api.process_new_order(OrderNumber::from(number), user).await.expect("Error submitting order");
    assert!(matches!(result, InsertOrderResult::Inserted(_)));
}

#[tokio::test]
async fn processed_on_first_poll_credits_exactly_once() {
    let db = new_test_db().await;
    let user = register_user(&db, "u1").await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    submit_order(&api, "12345678903", user.id).await;

    let order = db.fetch_order_by_number(&OrderNumber::from("12345678903")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::New);

    let result = AccrualResult::new(OrderStatusType::Processed, Some(Points::from_points(500)));
    let updated = api.reconcile(&order, result).await.expect("Error reconciling order");
    assert_eq!(updated.status, OrderStatusType::Processed);
    assert_eq!(updated.accrual, Some(Points::from_points(500)));

    let entries = db.entries_for_order(&order.order_number).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].from_account.is_system());
    assert_eq!(entries[0].to_account, user.id);
    assert_eq!(entries[0].amount, Points::from_points(500));
    assert_eq!(db.current_balance(user.id).await.unwrap(), Points::from_points(500));
}

#[tokio::test]
async fn processing_then_processed_yields_one_transaction() {
    let db = new_test_db().await;
    let user = register_user(&db, "u1").await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    submit_order(&api, "12345678903", user.id).await;
    let number = OrderNumber::from("12345678903");

    let order = db.fetch_order_by_number(&number).await.unwrap().unwrap();
    let updated = api.reconcile(&order, AccrualResult::new(OrderStatusType::Processing, None)).await.unwrap();
    assert_eq!(updated.status, OrderStatusType::Processing);
    assert_eq!(db.entries_for_order(&number).await.unwrap().len(), 0);
    assert_eq!(db.current_balance(user.id).await.unwrap(), Points::ZERO);

    // next tick: the calculation has finished
    let result = AccrualResult::new(OrderStatusType::Processed, Some(Points::from_points(300)));
    let updated = api.reconcile(&updated, result).await.unwrap();
    assert_eq!(updated.status, OrderStatusType::Processed);
    assert_eq!(db.entries_for_order(&number).await.unwrap().len(), 1);
    assert_eq!(db.current_balance(user.id).await.unwrap(), Points::from_points(300));
}

#[tokio::test]
async fn terminal_statuses_are_monotonic() {
    let db = new_test_db().await;
    let user = register_user(&db, "u1").await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    submit_order(&api, "12345678903", user.id).await;
    let number = OrderNumber::from("12345678903");
    let order = db.fetch_order_by_number(&number).await.unwrap().unwrap();

    let result = AccrualResult::new(OrderStatusType::Processed, Some(Points::from_points(500)));
    let settled = api.reconcile(&order, result).await.unwrap();
    assert_eq!(settled.status, OrderStatusType::Processed);

    // replaying the same terminal result must not credit a second time
    let replay = api.reconcile(&settled, result).await.unwrap();
    assert_eq!(replay.status, OrderStatusType::Processed);
    assert_eq!(db.entries_for_order(&number).await.unwrap().len(), 1);
    assert_eq!(db.current_balance(user.id).await.unwrap(), Points::from_points(500));

    // and no result can move a terminal order again, even via a stale snapshot of the order
    let stale = api.reconcile(&order, AccrualResult::new(OrderStatusType::Invalid, None)).await.unwrap();
    assert_eq!(stale.status, OrderStatusType::Processed);
    let demoted = api.reconcile(&settled, AccrualResult::new(OrderStatusType::Processing, None)).await.unwrap();
    assert_eq!(demoted.status, OrderStatusType::Processed);
}

#[tokio::test]
async fn cancel_marks_order_invalid_without_touching_the_ledger() {
    let db = new_test_db().await;
    let user = register_user(&db, "u1").await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    submit_order(&api, "79927398713", user.id).await;
    let number = OrderNumber::from("79927398713");
    let order = db.fetch_order_by_number(&number).await.unwrap().unwrap();

    let cancelled = api.cancel_order(&order).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Invalid);
    assert_eq!(db.entries_for_order(&number).await.unwrap().len(), 0);
    assert_eq!(db.current_balance(user.id).await.unwrap(), Points::ZERO);

    // cancelling again is a no-op
    let again = api.cancel_order(&cancelled).await.unwrap();
    assert_eq!(again.status, OrderStatusType::Invalid);
}

#[tokio::test]
async fn settlement_of_an_unknown_order_writes_nothing() {
    let db = new_test_db().await;
    let number = OrderNumber::from("4111111111111111");
    let err = db.accrue_order(&number, OrderStatusType::Processed, Points::from_points(100)).await.unwrap_err();
    assert!(matches!(err, LoyaltyGatewayError::OrderNotFound(_)));
    assert_eq!(db.entries_for_order(&number).await.unwrap().len(), 0);
}

#[tokio::test]
async fn no_credit_without_a_status_transition() {
    let db = new_test_db().await;
    let user = register_user(&db, "u1").await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    submit_order(&api, "12345678903", user.id).await;
    let number = OrderNumber::from("12345678903");
    let order = db.fetch_order_by_number(&number).await.unwrap().unwrap();
    api.reconcile(&order, AccrualResult::new(OrderStatusType::Processed, Some(Points::from_points(500))))
        .await
        .unwrap();

    // Going behind the API's back: a second settlement attempt for an already-terminal order must not insert a
    // ledger entry, because the guarded status update it is chained to cannot apply.
    let outcome = db.accrue_order(&number, OrderStatusType::Processed, Points::from_points(500)).await.unwrap();
    assert!(!outcome.applied);
    assert!(outcome.entry.is_none());
    assert_eq!(db.entries_for_order(&number).await.unwrap().len(), 1);
    assert_eq!(db.current_balance(user.id).await.unwrap(), Points::from_points(500));
}

#[tokio::test]
async fn accrual_amount_requires_processed_status() {
    let db = new_test_db().await;
    let err = db
        .accrue_order(&OrderNumber::from("12345678903"), OrderStatusType::Processing, Points::from_points(10))
        .await
        .unwrap_err();
    assert!(matches!(err, LoyaltyGatewayError::InconsistentAccrual { .. }));
}

#[tokio::test]
async fn order_submission_is_idempotent_per_user() {
    let db = new_test_db().await;
    let alice = register_user(&db, "alice").await;
    let bob = register_user(&db, "bob").await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let first = api.process_new_order(OrderNumber::from("2377225624"), alice.id).await.unwrap();
    assert!(matches!(first, InsertOrderResult::Inserted(_)));
    let replay = api.process_new_order(OrderNumber::from("2377225624"), alice.id).await.unwrap();
    assert!(matches!(replay, InsertOrderResult::AlreadyUploaded(_)));
    let poached = api.process_new_order(OrderNumber::from("2377225624"), bob.id).await.unwrap();
    assert!(matches!(poached, InsertOrderResult::OwnedByAnotherUser(_)));
}

#[tokio::test]
async fn luhn_invalid_submissions_are_rejected() {
    let db = new_test_db().await;
    let user = register_user(&db, "u1").await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let err = api.process_new_order(OrderNumber::from("12345678904"), user.id).await.unwrap_err();
    assert!(err.is_validation_error());
    let ledger = LedgerApi::new(db.clone());
    assert_eq!(ledger.history(user.id).await.unwrap().len(), 0);
}
