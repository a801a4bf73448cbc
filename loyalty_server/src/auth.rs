//! JWT issuance/validation and password hashing.
//!
//! Access tokens are HS256 JWTs carrying the user's account id. [`JwtClaims`] doubles as an actix extractor, so
//! any handler that takes a `JwtClaims` argument is automatically authenticated.
use std::future::{ready, Ready};

use actix_web::{web, FromRequest, HttpRequest};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2,
    PasswordHasher,
    PasswordVerifier,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use loyalty_engine::db_types::{AccountId, User};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The authenticated user's account id.
    pub sub: i64,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

impl JwtClaims {
    pub fn account(&self) -> AccountId {
        AccountId(self.sub)
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let verifier = req
        .app_data::<web::Data<TokenVerifier>>()
        .ok_or_else(|| ServerError::InitializeError("No token verifier is registered".to_string()))?;
    let header = req.headers().get("Authorization").ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token".to_string()))?;
    let claims = verifier.decode(token)?;
    Ok(claims)
}

//-------------------------------------------------  TokenIssuer  -----------------------------------------------------
/// Issues signed access tokens after a successful registration or login.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    lifetime: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        Self { encoding_key, lifetime: config.token_lifetime }
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user.id.value(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenIssueError(e.to_string()))?;
        debug!("🔑️ Issued access token for {}", user.username);
        Ok(token)
    }
}

//-------------------------------------------------  TokenVerifier  ---------------------------------------------------
/// Validates bearer tokens on incoming requests.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        Self { decoding_key, validation: Validation::default() }
    }

    pub fn decode(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        Ok(data.claims)
    }
}

//-------------------------------------------------  Passwords  -------------------------------------------------------
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::ValidationError(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use loyalty_engine::db_types::{AccountId, User};

    use super::*;
    use crate::config::AuthConfig;

    fn test_user() -> User {
        User {
            id: AccountId(42),
            username: "alice".to_string(),
            password_hash: "unused".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_tokens_validate_and_round_trip_the_account_id() {
        let config = AuthConfig::default();
        let issuer = TokenIssuer::new(&config);
        let verifier = TokenVerifier::new(&config);
        let token = issuer.issue_token(&test_user()).unwrap();
        let claims = verifier.decode(&token).unwrap();
        assert_eq!(claims.account(), AccountId(42));
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let verifier = TokenVerifier::new(&AuthConfig::default());
        let token = issuer.issue_token(&test_user()).unwrap();
        assert!(verifier.decode(&token).is_err());
    }

    #[test]
    fn password_hashes_verify_and_do_not_leak() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }
}
