use std::fmt::Debug;

use crate::{
    db_types::{AccountId, User},
    traits::{AuthApiError, AuthManagement},
};

/// `AuthApi` manages user records. Password hashing and token issuance are the embedding server's concern; only
/// PHC-format hash strings cross this boundary.
pub struct AuthApi<B> {
    db: B,
}

impl<B> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi")
    }
}

impl<B> AuthApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AuthApi<B>
where B: AuthManagement
{
    pub async fn register_user(&self, username: &str, password_hash: &str) -> Result<User, AuthApiError> {
        self.db.create_user(username, password_hash).await
    }

    pub async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, AuthApiError> {
        self.db.fetch_user_by_username(username).await
    }

    pub async fn fetch_user_by_id(&self, id: AccountId) -> Result<Option<User>, AuthApiError> {
        self.db.fetch_user_by_id(id).await
    }
}
