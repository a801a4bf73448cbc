use chrono::{DateTime, Utc};
use lpg_common::Points;
use serde::Serialize;

use crate::db_types::{Order, OrderNumber, OrderStatusType};

/// The wire representation of an order, as returned by the order listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub number: OrderNumber,
    pub status: OrderStatusType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderResult {
    fn from(order: Order) -> Self {
        Self {
            number: order.order_number,
            status: order.status,
            accrual: order.accrual,
            uploaded_at: order.uploaded_at,
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn accrual_is_omitted_until_the_order_is_processed() {
        let pending = OrderResult {
            number: OrderNumber::from("12345678903"),
            status: OrderStatusType::Processing,
            accrual: None,
            uploaded_at: Utc.with_ymd_and_hms(2020, 12, 10, 15, 15, 45).unwrap(),
        };
        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["number"], "12345678903");
        assert_eq!(json["status"], "PROCESSING");
        assert!(json.get("accrual").is_none());

        let settled = OrderResult { status: OrderStatusType::Processed, accrual: Some(Points::from_points(500)), ..pending };
        let json = serde_json::to_value(&settled).unwrap();
        assert_eq!(json["status"], "PROCESSED");
        assert_eq!(json["accrual"], 500);
    }
}
