use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{AccountId, User},
    traits::AuthApiError,
};

pub async fn insert_user(
    username: &str,
    password_hash: &str,
    conn: &mut SqliteConnection,
) -> Result<User, AuthApiError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO users (username, password_hash) VALUES ($1, $2)
            RETURNING *;
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .fetch_one(conn)
    .await;
    match result {
        Ok(user) => {
            debug!("🔑️ New user registered: {username}");
            Ok(user)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AuthApiError::UsernameTaken(username.into())),
        Err(e) => Err(AuthApiError::DatabaseError(e.to_string())),
    }
}

pub async fn user_by_username(username: &str, conn: &mut SqliteConnection) -> Result<Option<User>, AuthApiError> {
    let user = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(conn)
        .await
        .map_err(|e| AuthApiError::DatabaseError(e.to_string()))?;
    Ok(user)
}

pub async fn user_by_id(id: AccountId, conn: &mut SqliteConnection) -> Result<Option<User>, AuthApiError> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AuthApiError::DatabaseError(e.to_string()))?;
    Ok(user)
}
