use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use tokio::sync::watch;

use booking_engine::{
    traits::{BookingDatabase, PaymentGateway},
    BookingFlowApi, PostgresDatabase,
};

use crate::{
    auth::AuthConfig,
    config::ServerConfig,
    errors::ServerError,
    expiration_worker::ExpirationWorker,
    integrations::HttpPaymentGateway,
    middleware::{WebhookSignatureFactory, WEBHOOK_SIGNATURE_HEADER},
    outbox_worker::OutboxWorker,
    rabbit::{declare_topology, ConnectionManager},
    routes::{create_booking, health, list_events, payment_webhook, seats_for_event},
};

const DB_POOL_SIZE: u32 = 25;

/// Brings the whole service up: broker connection + topology, database pool, background
/// workers, and finally the HTTP server. Runs until the server stops (SIGINT/SIGTERM), then
/// tears the workers and the broker connection down in that order.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let manager = ConnectionManager::new(&config.rabbitmq_url);
    info!("🚀️ Waiting for the broker connection...");
    manager.wait_until_ready().await;
    let setup_channel = manager.get_channel().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    declare_topology(&setup_channel).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Broker connection ready, topology declared");

    let db = PostgresDatabase::new_with_url(&config.database_url, DB_POOL_SIZE)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    booking_engine::postgres::db::run_migrations(db.pool())
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Database ready, migrations applied");
    let gateway = HttpPaymentGateway::new(&config.payment_service_url)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = OutboxWorker::new(db.clone(), manager.clone());
    tokio::spawn(relay.run(shutdown_rx.clone()));
    let worker = ExpirationWorker::new(BookingFlowApi::new(db.clone(), gateway.clone()), manager.clone());
    tokio::spawn(worker.run(shutdown_rx));

    let srv = create_server_instance(config, db, gateway)?;
    let result = srv.await;

    info!("🚀️ HTTP server stopped. Shutting down background workers");
    let _ = shutdown_tx.send(true);
    manager.close().await;
    result.map_err(ServerError::from)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: PostgresDatabase,
    gateway: HttpPaymentGateway,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let api = BookingFlowApi::new(db.clone(), gateway.clone());
        let auth = AuthConfig::new(config.jwt_secret.clone());
        let webhook_guard =
            WebhookSignatureFactory::new(WEBHOOK_SIGNATURE_HEADER, config.payment_webhook_secret.clone(), true);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %U").log_target("access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(auth))
            .configure(configure_routes::<PostgresDatabase, HttpPaymentGateway>(webhook_guard))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Route wiring, shared between the real server and the endpoint tests (which instantiate it
/// with mock stores).
pub fn configure_routes<B, G>(webhook_guard: WebhookSignatureFactory) -> impl FnOnce(&mut web::ServiceConfig)
where
    B: BookingDatabase,
    G: PaymentGateway,
{
    move |cfg| {
        cfg.service(health).service(
            web::scope("/api/v1")
                .service(web::resource("/events").route(web::get().to(list_events::<B, G>)))
                .service(web::resource("/events/{event_id}/seats").route(web::get().to(seats_for_event::<B, G>)))
                .service(web::resource("/bookings").route(web::post().to(create_booking::<B, G>)))
                .service(
                    web::scope("/payments")
                        .wrap(webhook_guard)
                        .service(web::resource("/webhook").route(web::post().to(payment_webhook::<B, G>))),
                ),
        );
    }
}
