use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AccrualApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    /// The accrual service does not know about this order number.
    #[error("Order {0} is not registered with the accrual service")]
    NotRegistered(String),
    /// The service asked us to back off. Safe to retry after a delay.
    #[error("The accrual service is rate limiting requests")]
    RateLimited,
    /// The service is unreachable, timed out, or answered with a server error. Safe to retry.
    #[error("The accrual service is unavailable: {0}")]
    Unavailable(String),
    #[error("Could not deserialize accrual response: {0}")]
    JsonError(String),
}
