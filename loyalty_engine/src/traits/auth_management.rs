use thiserror::Error;

use crate::db_types::{AccountId, User};

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The username {0} is already taken")]
    UsernameTaken(String),
    #[error("User not found")]
    UserNotFound,
}

/// Behaviour for managing user records.
///
/// Password hashing and token issuance live with the embedding server; the engine only stores and returns
/// PHC-format hash strings.
#[allow(async_fn_in_trait)]
pub trait AuthManagement {
    /// Creates a new user record. Fails with [`AuthApiError::UsernameTaken`] if the username is already in use.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AuthApiError>;

    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, AuthApiError>;

    async fn fetch_user_by_id(&self, id: AccountId) -> Result<Option<User>, AuthApiError>;
}
