use std::pin::Pin;

use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use accrual_tools::AccrualApi;
use futures::Future;
use log::*;
use loyalty_engine::{
    events::{EventHandlers, EventHooks, EventProducers, OrderAccruedEvent, OrderAnnulledEvent},
    AuthApi,
    LedgerApi,
    OrderFlowApi,
    SqliteDatabase,
};

use crate::{
    accrual_worker::start_accrual_worker,
    auth::{TokenIssuer, TokenVerifier},
    config::ServerConfig,
    errors::ServerError,
    routes::{health, login, my_balance, my_orders, my_withdrawals, register, submit_order, withdraw},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(32, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    // The worker only runs when an upstream accrual service has been configured. Without one, submitted orders
    // simply stay in their pending state.
    let worker = if config.accrual.is_configured() {
        let api = AccrualApi::new(config.accrual.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Some(start_accrual_worker(db.clone(), api, producers.clone(), config.worker.clone()))
    } else {
        warn!("🕰️ No accrual service URL is configured. The reconciliation worker will not start.");
        None
    };

    let srv = create_server_instance(config, db, producers)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    if let Some(worker) = worker {
        info!("🕰️ Waiting for the accrual worker to finish its current round");
        worker.shutdown().await;
    }
    result
}

/// The default event hooks: structured log lines for every credited and annulled order.
fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_accrued(|ev: OrderAccruedEvent| {
        Box::pin(async move {
            info!("💸️ Order {} processed. {} credited to account {}", ev.order.order_number, ev.amount, ev.order.user_id);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_order_annulled(|ev: OrderAnnulledEvent| {
        Box::pin(async move {
            info!("🚫️ Order {} was annulled. No reward will be granted.", ev.order.order_number);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let auth_config = config.auth.clone();
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let ledger_api = LedgerApi::new(db.clone());
        let auth_api = AuthApi::new(db.clone());
        let jwt_signer = TokenIssuer::new(&auth_config);
        let jwt_verifier = TokenVerifier::new(&auth_config);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lpg::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(ledger_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(jwt_verifier))
            .service(health)
            .service(
                web::scope("/api/user")
                    .route("/register", web::post().to(register::<SqliteDatabase>))
                    .route("/login", web::post().to(login::<SqliteDatabase>))
                    .route("/orders", web::post().to(submit_order::<SqliteDatabase>))
                    .route("/orders", web::get().to(my_orders::<SqliteDatabase>))
                    .route("/balance", web::get().to(my_balance::<SqliteDatabase>))
                    .route("/balance/withdraw", web::post().to(withdraw::<SqliteDatabase>))
                    .route("/withdrawals", web::get().to(my_withdrawals::<SqliteDatabase>)),
            )
    })
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
