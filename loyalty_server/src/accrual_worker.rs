//! The accrual reconciliation worker.
//!
//! This is the only long-lived background actor in the process. On every tick it lists the orders that have not
//! reached a terminal status and asks the accrual service for their current calculation state, feeding each
//! result into [`OrderFlowApi::reconcile`]. Failures are retried a bounded number of times per order; when the
//! retries are exhausted the order is cancelled to `INVALID` instead of being left to wedge the pipeline forever.
//!
//! The worker shuts down cooperatively: [`AccrualWorkerHandle::shutdown`] asks the loop to exit at the next safe
//! point (between ticks or between orders, never mid-reconcile) and waits until it has done so, guaranteeing
//! that no in-flight ledger write is abandoned.
use std::future::Future;

use accrual_tools::{AccrualApi, AccrualApiError, AccrualStatus};
use log::*;
use loyalty_engine::{
    db_types::{AccrualResult, Order, OrderNumber, OrderStatusType},
    events::EventProducers,
    traits::LoyaltyGatewayDatabase,
    OrderFlowApi,
    SqliteDatabase,
};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::config::WorkerConfig;

/// The statuses the worker considers outstanding. Terminal orders are never revisited.
pub const PENDING_STATUSES: [OrderStatusType; 3] =
    [OrderStatusType::New, OrderStatusType::Registered, OrderStatusType::Processing];

#[derive(Debug, Clone, Error)]
pub enum AccrualSourceError {
    /// The accrual service does not know about the order (yet). Not worth retrying within this tick.
    #[error("The order is not registered with the accrual service")]
    NotFound,
    #[error("The accrual service is rate limiting requests")]
    RateLimited,
    #[error("The accrual service is unavailable: {0}")]
    Unavailable(String),
}

/// The worker's view of the accrual service.
///
/// The production implementation wraps [`AccrualApi`]; tests substitute scripted sources.
pub trait AccrualSource: Clone + Send + Sync + 'static {
    fn order_accrual(
        &self,
        number: &OrderNumber,
    ) -> impl Future<Output = Result<AccrualResult, AccrualSourceError>> + Send;
}

impl AccrualSource for AccrualApi {
    fn order_accrual(
        &self,
        number: &OrderNumber,
    ) -> impl Future<Output = Result<AccrualResult, AccrualSourceError>> + Send {
        let api = self.clone();
        let number = number.clone();
        async move {
            match api.order_accrual(number.as_str()).await {
                Ok(result) => {
                    let status = match result.status {
                        AccrualStatus::Registered => OrderStatusType::Registered,
                        AccrualStatus::Processing => OrderStatusType::Processing,
                        AccrualStatus::Invalid => OrderStatusType::Invalid,
                        AccrualStatus::Processed => OrderStatusType::Processed,
                    };
                    Ok(AccrualResult::new(status, result.accrual))
                },
                Err(AccrualApiError::NotRegistered(_)) => Err(AccrualSourceError::NotFound),
                Err(AccrualApiError::RateLimited) => Err(AccrualSourceError::RateLimited),
                Err(e) => Err(AccrualSourceError::Unavailable(e.to_string())),
            }
        }
    }
}

/// Control handle for a running accrual worker.
pub struct AccrualWorkerHandle {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl AccrualWorkerHandle {
    /// Requests the poll loop to exit at the next safe point and blocks until it has fully exited.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!("🕰️ The accrual worker did not shut down cleanly: {e}");
        }
    }
}

/// Starts the accrual worker. The returned handle must be kept; dropping it stops the worker on its next tick.
pub fn start_accrual_worker<S: AccrualSource>(
    db: SqliteDatabase,
    source: S,
    producers: EventProducers,
    config: WorkerConfig,
) -> AccrualWorkerHandle {
    let (stop_tx, stop_rx) = watch::channel(false);
    let api = OrderFlowApi::new(db.clone(), producers);
    let worker = AccrualWorker { db, api, source, config, stop_rx };
    let handle = tokio::spawn(worker.run());
    AccrualWorkerHandle { stop_tx, handle }
}

struct AccrualWorker<S> {
    db: SqliteDatabase,
    api: OrderFlowApi<SqliteDatabase>,
    source: S,
    config: WorkerConfig,
    stop_rx: watch::Receiver<bool>,
}

impl<S: AccrualSource> AccrualWorker<S> {
    async fn run(self) {
        info!(
            "🕰️ Accrual reconciliation worker started (poll interval {:?}, {} attempts per order)",
            self.config.poll_interval, self.config.max_attempts
        );
        let mut stop_rx = self.stop_rx.clone();
        let mut timer = tokio::time::interval(self.config.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    break;
                },
                _ = timer.tick() => {
                    self.sync_orders().await;
                },
            }
        }
        info!("🕰️ Accrual reconciliation worker has shut down");
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// One scan tick. A store failure is logged and skips the tick; it is not fatal to the worker.
    async fn sync_orders(&self) {
        let orders = match self.db.fetch_orders_by_status(&PENDING_STATUSES).await {
            Ok(orders) => orders,
            Err(e) => {
                error!("🕰️ Could not list outstanding orders. Skipping this tick. {e}");
                return;
            },
        };
        if orders.is_empty() {
            trace!("🕰️ No outstanding orders");
            return;
        }
        debug!("🕰️ {} outstanding orders to reconcile", orders.len());
        for order in orders {
            if self.stop_requested() {
                debug!("🕰️ Stop requested. Leaving the remaining orders for the next run.");
                break;
            }
            self.process_with_retry(&order).await;
        }
    }

    /// Reconciles one order, retrying up to the configured ceiling with a fixed backoff.
    ///
    /// Attempts are strictly sequential. Exhausting the retries degrades this one order to `INVALID`; it never
    /// takes the worker down with it.
    async fn process_with_retry(&self, order: &Order) {
        for attempt in 1..=self.config.max_attempts {
            match self.source.order_accrual(&order.order_number).await {
                Ok(result) => match self.api.reconcile(order, result).await {
                    Ok(_) => return,
                    Err(e) if e.is_validation_error() => {
                        error!(
                            "🕰️ The accrual service returned an inconsistent result for order {}. Reconciliation \
                             for this order is halted. {e}",
                            order.order_number
                        );
                        return;
                    },
                    Err(e) => {
                        warn!(
                            "🕰️ Reconciling order {} failed on attempt {attempt}/{}: {e}",
                            order.order_number, self.config.max_attempts
                        );
                    },
                },
                Err(AccrualSourceError::NotFound) => {
                    debug!(
                        "🕰️ Order {} is not registered with the accrual service yet. It will be revisited on a \
                         later tick.",
                        order.order_number
                    );
                    return;
                },
                Err(e) => {
                    warn!(
                        "🕰️ Could not fetch the accrual state of order {} (attempt {attempt}/{}): {e}",
                        order.order_number, self.config.max_attempts
                    );
                },
            }
            tokio::time::sleep(self.config.retry_backoff).await;
        }
        warn!(
            "🕰️ Giving up on order {} after {} attempts. Cancelling it.",
            order.order_number, self.config.max_attempts
        );
        if let Err(e) = self.api.cancel_order(order).await {
            error!("🕰️ Could not cancel order {}: {e}", order.order_number);
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use loyalty_engine::{
        test_utils::prepare_env::{prepare_test_env, random_db_path},
        traits::LedgerManagement,
        AuthApi,
    };
    use lpg_common::Points;

    use super::*;

    /// Replays a fixed sequence of responses, then keeps answering `NotFound`.
    #[derive(Clone)]
    struct ScriptedSource {
        responses: Arc<Mutex<VecDeque<Result<AccrualResult, AccrualSourceError>>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<AccrualResult, AccrualSourceError>>) -> Self {
            Self { responses: Arc::new(Mutex::new(responses.into())) }
        }
    }

    impl AccrualSource for ScriptedSource {
        fn order_accrual(
            &self,
            _number: &OrderNumber,
        ) -> impl Future<Output = Result<AccrualResult, AccrualSourceError>> + Send {
            let responses = Arc::clone(&self.responses);
            async move { responses.lock().unwrap().pop_front().unwrap_or(Err(AccrualSourceError::NotFound)) }
        }
    }

    fn fast_config(max_attempts: u32) -> WorkerConfig {
        WorkerConfig {
            poll_interval: Duration::from_millis(25),
            max_attempts,
            retry_backoff: Duration::from_millis(5),
        }
    }

    async fn seed_order(db: &SqliteDatabase, number: &str) -> loyalty_engine::db_types::User {
        let auth = AuthApi::new(db.clone());
        let user = auth.register_user("worker_user", "$argon2id$dummy").await.unwrap();
        let api = OrderFlowApi::new(db.clone(), EventProducers::default());
        api.process_new_order(OrderNumber::from(number), user.id).await.unwrap();
        user
    }

    async fn wait_for_status(db: &SqliteDatabase, number: &OrderNumber, status: OrderStatusType) {
        for _ in 0..100 {
            let order = db.fetch_order_by_number(number).await.unwrap().unwrap();
            if order.status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let order = db.fetch_order_by_number(number).await.unwrap().unwrap();
        panic!("Order {number} never reached {status}; it is {}", order.status);
    }

    #[tokio::test]
    async fn a_processed_result_settles_the_order_and_credits_the_balance() {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.unwrap();
        let user = seed_order(&db, "12345678903").await;
        let number = OrderNumber::from("12345678903");

        let source = ScriptedSource::new(vec![Ok(AccrualResult::new(
            OrderStatusType::Processed,
            Some(Points::from_points(500)),
        ))]);
        let worker = start_accrual_worker(db.clone(), source, EventProducers::default(), fast_config(3));
        wait_for_status(&db, &number, OrderStatusType::Processed).await;
        worker.shutdown().await;

        assert_eq!(db.current_balance(user.id).await.unwrap(), Points::from_points(500));
        assert_eq!(db.entries_for_order(&number).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn an_unavailable_service_cancels_the_order_after_max_attempts() {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.unwrap();
        let user = seed_order(&db, "79927398713").await;
        let number = OrderNumber::from("79927398713");

        let source = ScriptedSource::new(vec![
            Err(AccrualSourceError::Unavailable("connection refused".to_string())),
            Err(AccrualSourceError::Unavailable("connection refused".to_string())),
            Err(AccrualSourceError::RateLimited),
        ]);
        let worker = start_accrual_worker(db.clone(), source, EventProducers::default(), fast_config(3));
        wait_for_status(&db, &number, OrderStatusType::Invalid).await;
        worker.shutdown().await;

        // cancellation grants no reward
        assert_eq!(db.current_balance(user.id).await.unwrap(), Points::ZERO);
        assert_eq!(db.entries_for_order(&number).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn an_unregistered_order_is_left_for_a_later_tick() {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.unwrap();
        seed_order(&db, "2377225624").await;
        let number = OrderNumber::from("2377225624");

        let source = ScriptedSource::new(vec![]); // answers NotFound forever
        let worker = start_accrual_worker(db.clone(), source, EventProducers::default(), fast_config(1));
        tokio::time::sleep(Duration::from_millis(200)).await;
        worker.shutdown().await;

        let order = db.fetch_order_by_number(&number).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatusType::New);
        assert_eq!(db.entries_for_order(&number).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn shutdown_returns_once_the_loop_has_exited() {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.unwrap();
        let source = ScriptedSource::new(vec![]);
        let worker = start_accrual_worker(db, source, EventProducers::default(), fast_config(3));
        tokio::time::sleep(Duration::from_millis(50)).await;
        // must not hang, even with ticks in flight
        tokio::time::timeout(Duration::from_secs(5), worker.shutdown()).await.expect("shutdown timed out");
    }
}
