use lpg_common::Points;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawRequest {
    /// The order number the withdrawal pays for.
    pub order: String,
    pub sum: Points,
}
