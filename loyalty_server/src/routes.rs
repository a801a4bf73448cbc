//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate
//! module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will
//! cause the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database
//! operations, etc.) should therefore be expressed as futures or asynchronous functions.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use loyalty_engine::{
    db_types::OrderNumber,
    order_objects::OrderResult,
    traits::{AuthManagement, InsertOrderResult, LedgerManagement, LoyaltyGatewayDatabase},
    AuthApi,
    LedgerApi,
    OrderFlowApi,
};

use crate::{
    auth::{hash_password, verify_password, JwtClaims, TokenIssuer},
    data_objects::{AuthTokenResponse, CredentialsRequest, WithdrawRequest},
    errors::{AuthError, ServerError},
};

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Credentials  -------------------------------------------------------

/// Route handler for `POST /api/user/register`.
///
/// Creates a new user and, on success, immediately issues an access token so that the client does not need a
/// follow-up login call. A taken username maps to a 409 response.
pub async fn register<B: AuthManagement>(
    api: web::Data<AuthApi<B>>,
    signer: web::Data<TokenIssuer>,
    body: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, ServerError> {
    let CredentialsRequest { login, password } = body.into_inner();
    if login.trim().is_empty() || password.is_empty() {
        return Err(ServerError::InvalidRequestBody("login and password must not be empty".to_string()));
    }
    let password_hash = hash_password(&password)?;
    let user = api.register_user(login.trim(), &password_hash).await?;
    info!("💻️ New user registered: {}", user.username);
    let token = signer.issue_token(&user)?;
    Ok(HttpResponse::Ok()
        .insert_header(("Authorization", format!("Bearer {token}")))
        .json(AuthTokenResponse { token }))
}

/// Route handler for `POST /api/user/login`.
///
/// A failed lookup and a wrong password are deliberately indistinguishable to the caller.
pub async fn login<B: AuthManagement>(
    api: web::Data<AuthApi<B>>,
    signer: web::Data<TokenIssuer>,
    body: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, ServerError> {
    let CredentialsRequest { login, password } = body.into_inner();
    let user = api
        .fetch_user_by_username(login.trim())
        .await?
        .ok_or(ServerError::AuthenticationError(AuthError::InvalidCredentials))?;
    if !verify_password(&password, &user.password_hash) {
        debug!("💻️ Failed login attempt for {}", user.username);
        return Err(AuthError::InvalidCredentials.into());
    }
    let token = signer.issue_token(&user)?;
    debug!("💻️ {} logged in", user.username);
    Ok(HttpResponse::Ok()
        .insert_header(("Authorization", format!("Bearer {token}")))
        .json(AuthTokenResponse { token }))
}

//----------------------------------------------   Orders  ------------------------------------------------------------

/// Route handler for `POST /api/user/orders`.
///
/// The body is the bare order number as `text/plain`. Replies with 202 when the order is accepted, 200 when the
/// caller already uploaded the same number, 409 when another user owns it and 422 when the number fails Luhn
/// validation.
pub async fn submit_order<B: LoyaltyGatewayDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
    body: String,
) -> Result<HttpResponse, ServerError> {
    let number = body.trim();
    if number.is_empty() {
        return Err(ServerError::InvalidRequestBody("The order number is missing".to_string()));
    }
    debug!("💻️ POST order {number} for account {}", claims.account());
    match api.process_new_order(OrderNumber::from(number), claims.account()).await? {
        InsertOrderResult::Inserted(_) => Ok(HttpResponse::Accepted().finish()),
        InsertOrderResult::AlreadyUploaded(_) => Ok(HttpResponse::Ok().finish()),
        InsertOrderResult::OwnedByAnotherUser(_) => Err(ServerError::OrderOwnedByAnotherUser),
    }
}

/// Route handler for `GET /api/user/orders`.
///
/// Returns the caller's orders, oldest first, or 204 when they have none. Reconciliation progress is visible
/// here and nowhere else: the accrual worker's retries never surface as API errors.
pub async fn my_orders<B: LedgerManagement>(
    claims: JwtClaims,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for account {}", claims.account());
    let orders = api.orders(claims.account()).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let orders = orders.into_iter().map(OrderResult::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Balance  -----------------------------------------------------------

/// Route handler for `GET /api/user/balance`.
pub async fn my_balance<B: LedgerManagement>(
    claims: JwtClaims,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balance for account {}", claims.account());
    let balance = api.balance(claims.account()).await?;
    Ok(HttpResponse::Ok().json(balance))
}

/// Route handler for `POST /api/user/balance/withdraw`.
///
/// Spends part of the balance against an order number. Insufficient funds map to 402 and a Luhn-invalid order
/// number to 422; in both cases nothing is written to the ledger.
pub async fn withdraw<B: LoyaltyGatewayDatabase>(
    claims: JwtClaims,
    api: web::Data<LedgerApi<B>>,
    body: web::Json<WithdrawRequest>,
) -> Result<HttpResponse, ServerError> {
    let WithdrawRequest { order, sum } = body.into_inner();
    debug!("💻️ POST withdraw {sum} against order {order} for account {}", claims.account());
    api.withdraw(claims.account(), sum, OrderNumber::from(order)).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Route handler for `GET /api/user/withdrawals`.
pub async fn my_withdrawals<B: LedgerManagement>(
    claims: JwtClaims,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET withdrawals for account {}", claims.account());
    let withdrawals = api.withdrawals(claims.account()).await?;
    if withdrawals.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    Ok(HttpResponse::Ok().json(withdrawals))
}
