use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use loyalty_engine::traits::{AuthApiError, LedgerApiError, LoyaltyGatewayError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The order number is invalid: {0}")]
    InvalidOrderNumber(String),
    #[error("There are not enough points on the balance to cover the withdrawal")]
    InsufficientFunds,
    #[error("This order number has already been uploaded by another user")]
    OrderOwnedByAnotherUser,
    #[error("This username is already taken")]
    UsernameTaken,
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::TokenIssueError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            Self::OrderOwnedByAnotherUser => StatusCode::CONFLICT,
            Self::UsernameTaken => StatusCode::CONFLICT,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Invalid login or password")]
    InvalidCredentials,
    #[error("Auth token not provided")]
    MissingToken,
    #[error("Could not read auth token. {0}")]
    PoorlyFormattedToken(String),
    #[error("Token validation error. {0}")]
    ValidationError(String),
    #[error("Could not issue access token. {0}")]
    TokenIssueError(String),
}

impl From<LoyaltyGatewayError> for ServerError {
    fn from(e: LoyaltyGatewayError) -> Self {
        match e {
            LoyaltyGatewayError::LedgerError(le) => le.into(),
            LoyaltyGatewayError::OrderNotFound(number) => ServerError::NoRecordFound(number.to_string()),
            other => ServerError::BackendError(other.to_string()),
        }
    }
}

impl From<LedgerApiError> for ServerError {
    fn from(e: LedgerApiError) -> Self {
        match e {
            LedgerApiError::InsufficientFunds { .. } => ServerError::InsufficientFunds,
            LedgerApiError::InvalidOrderNumber(number) => ServerError::InvalidOrderNumber(number.to_string()),
            LedgerApiError::NonPositiveAmount(amount) => {
                ServerError::InvalidRequestBody(format!("The amount must be positive, but {amount} was given"))
            },
            LedgerApiError::OrderDoesNotExist(number) => ServerError::NoRecordFound(number.to_string()),
            LedgerApiError::AccountNotFound(account) => ServerError::NoRecordFound(account.to_string()),
            LedgerApiError::DatabaseError(msg) => ServerError::BackendError(msg),
        }
    }
}

impl From<AuthApiError> for ServerError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::UsernameTaken(_) => ServerError::UsernameTaken,
            AuthApiError::UserNotFound => ServerError::AuthenticationError(AuthError::InvalidCredentials),
            AuthApiError::DatabaseError(msg) => ServerError::BackendError(msg),
        }
    }
}
