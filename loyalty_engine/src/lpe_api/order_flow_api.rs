use std::fmt::Debug;

use log::*;
use lpg_common::Points;

use crate::{
    db_types::{AccountId, AccrualResult, NewOrder, Order, OrderNumber, OrderStatusType},
    events::{EventProducers, OrderAccruedEvent, OrderAnnulledEvent},
    traits::{InsertOrderResult, LedgerApiError, LoyaltyGatewayDatabase, LoyaltyGatewayError},
};

/// `OrderFlowApi` is the primary API for handling order submissions and for reconciling orders against results
/// from the external accrual service.
///
/// The reconciler decides *what* the order's next state is; how often reconciliation is attempted (and when to
/// give up) is the accrual worker's business. This API performs no retries of its own.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: LoyaltyGatewayDatabase
{
    /// Submit a new order number on behalf of a user.
    ///
    /// The number must pass Luhn validation. Submission is idempotent: re-submitting a number the same user
    /// already uploaded is reported as [`InsertOrderResult::AlreadyUploaded`] rather than an error, while a
    /// number claimed by a different user comes back as [`InsertOrderResult::OwnedByAnotherUser`].
    pub async fn process_new_order(
        &self,
        number: OrderNumber,
        user: AccountId,
    ) -> Result<InsertOrderResult, LoyaltyGatewayError> {
        if !number.is_luhn_valid() {
            debug!("🔄️📦️ Rejecting order submission: {number} fails Luhn validation");
            return Err(LedgerApiError::InvalidOrderNumber(number).into());
        }
        let order = NewOrder::new(number, user);
        let (stored, inserted) = self.db.insert_order(order).await?;
        let result = if inserted {
            debug!("🔄️📦️ Order {} accepted for account {user}", stored.order_number);
            InsertOrderResult::Inserted(stored)
        } else if stored.user_id == user {
            trace!("🔄️📦️ Order {} was already uploaded by account {user}", stored.order_number);
            InsertOrderResult::AlreadyUploaded(stored)
        } else {
            debug!("🔄️📦️ Order {} belongs to another account", stored.order_number);
            InsertOrderResult::OwnedByAnotherUser(stored)
        };
        Ok(result)
    }

    /// Applies an external accrual result to the given order.
    ///
    /// If the order has already reached a terminal status this is a no-op and the stored order is returned
    /// unchanged, which makes redundant polling harmless. Otherwise the external status (and reward, when the
    /// calculation is finished) is settled onto the order; a positive reward is credited to the owner's balance
    /// in the same atomic unit as the status change.
    ///
    /// Returns the up-to-date order record.
    pub async fn reconcile(&self, order: &Order, result: AccrualResult) -> Result<Order, LoyaltyGatewayError> {
        if order.status.is_terminal() {
            trace!("🔄️📦️ Order {} is already {}. Nothing to reconcile.", order.order_number, order.status);
            return Ok(order.clone());
        }
        let amount = if result.status == OrderStatusType::Processed {
            result.amount()
        } else {
            if result.amount().is_positive() {
                warn!(
                    "🔄️📦️ The accrual service reported a reward of {} for order {} while its status is {}. The \
                     reward is ignored until the calculation is finished.",
                    result.amount(),
                    order.order_number,
                    result.status
                );
            }
            Points::ZERO
        };
        let outcome = self.db.accrue_order(&order.order_number, result.status, amount).await?;
        if outcome.applied {
            debug!("🔄️📦️ Order {} reconciled to {}", outcome.order.order_number, outcome.order.status);
            if let Some(entry) = &outcome.entry {
                self.call_order_accrued_hook(&outcome.order, entry.amount).await;
            }
        }
        Ok(outcome.order)
    }

    /// Forces the order into the terminal `Invalid` status without touching the ledger.
    ///
    /// Used by the accrual worker when it has exhausted its retries for an order. If the order reached a
    /// terminal status in the meantime it is left as-is.
    pub async fn cancel_order(&self, order: &Order) -> Result<Order, LoyaltyGatewayError> {
        let outcome = self.db.accrue_order(&order.order_number, OrderStatusType::Invalid, Points::ZERO).await?;
        if outcome.applied {
            info!("🔄️❌️ Order {} has been cancelled", outcome.order.order_number);
            self.call_order_annulled_hook(&outcome.order).await;
        }
        Ok(outcome.order)
    }

    async fn call_order_accrued_hook(&self, order: &Order, amount: Points) {
        for emitter in &self.producers.order_accrued_producer {
            trace!("🔄️📦️ Notifying order accrued hook subscribers");
            let event = OrderAccruedEvent { order: order.clone(), amount };
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            trace!("🔄️📦️ Notifying order annulled hook subscribers");
            let event = OrderAnnulledEvent { order: order.clone() };
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
