use std::fmt::Display;

use lpg_common::Points;
use serde::{Deserialize, Serialize};

/// Calculation state reported by the accrual service for a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    /// The order is known to the service, but the reward has not been calculated yet.
    Registered,
    /// The reward calculation is in progress.
    Processing,
    /// The order was rejected and no reward will ever be granted.
    Invalid,
    /// The calculation has finished and the reward is final.
    Processed,
}

impl Display for AccrualStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualStatus::Registered => write!(f, "REGISTERED"),
            AccrualStatus::Processing => write!(f, "PROCESSING"),
            AccrualStatus::Invalid => write!(f, "INVALID"),
            AccrualStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

/// A point-in-time calculation result for one order number.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAccrual {
    /// The order number the result applies to.
    pub order: String,
    pub status: AccrualStatus,
    /// The calculated reward. Absent from the response unless the calculation has produced one.
    #[serde(default)]
    pub accrual: Option<Points>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_a_processed_response() {
        let json = r#"{"order": "12345678903", "status": "PROCESSED", "accrual": 500}"#;
        let result: OrderAccrual = serde_json::from_str(json).unwrap();
        assert_eq!(result.order, "12345678903");
        assert_eq!(result.status, AccrualStatus::Processed);
        assert_eq!(result.accrual, Some(Points::from_points(500)));
    }

    #[test]
    fn accrual_field_is_optional() {
        let json = r#"{"order": "12345678903", "status": "PROCESSING"}"#;
        let result: OrderAccrual = serde_json::from_str(json).unwrap();
        assert_eq!(result.status, AccrualStatus::Processing);
        assert_eq!(result.accrual, None);
    }
}
