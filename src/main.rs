use actix::prelude::*;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod actors;
mod api;
mod clients;
mod config;
mod domain;
mod error;
mod metrics;
mod otp;
mod pricing;
mod services;
mod store;
mod utils;

use actors::{CoordinatorActor, Shutdown, SweepSchedule};
use api::AppState;
use clients::{CarrierClient, RazorpayClient, ShiprocketClient};
use config::AppConfig;
use otp::{LoggingOtpSender, OtpService, RedisOtpStore};
use pricing::PricingEngine;
use services::{FileService, OrderService, PaymentService, ShipmentService};
use store::PgStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, with debug for this crate; RUST_LOG overrides
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,print_orders=debug")),
        )
        .init();

    tracing::info!("🚀 Starting print order service");

    let config = AppConfig::from_env()?;

    // === 1. Storage ===
    tracing::info!("Connecting to PostgreSQL...");
    let store = Arc::new(PgStore::connect(&config.database_url, config.database_max_connections).await?);
    store.migrate().await?;
    store.ping().await?;
    tracing::info!("✅ Database ready");

    tracing::info!("Connecting to Redis...");
    let otp_store = Arc::new(RedisOtpStore::connect(&config.redis_url).await?);

    // === 2. Metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. External clients ===
    let carrier: Arc<dyn CarrierClient> = Arc::new(ShiprocketClient::new(config.carrier.clone())?);
    let gateway = Arc::new(RazorpayClient::new(config.gateway.clone())?);

    // === 4. Services ===
    let payments = Arc::new(PaymentService::new(
        store.clone(),
        store.clone(),
        gateway,
        config.gateway.webhook_secret.clone(),
        metrics.clone(),
    ));
    let shipments = Arc::new(
        ShipmentService::new(
            store.clone(),
            carrier.clone(),
            config.carrier.pickup_location.clone(),
            metrics.clone(),
        )
        // Tracking calls retry internally; leave room for the backoff
        .with_sweep_limits(config.carrier.timeout * 3, config.tracking_concurrency),
    );
    let state = web::Data::new(AppState {
        pricing: Arc::new(PricingEngine::new(store.clone())),
        orders: Arc::new(OrderService::new(
            store.clone(),
            store.clone(),
            payments.clone(),
            metrics.clone(),
        )),
        files: Arc::new(FileService::new(store.clone())),
        payments: payments.clone(),
        shipments: shipments.clone(),
        otp: Arc::new(OtpService::new(otp_store, Arc::new(LoggingOtpSender), config.otp_ttl)),
        metrics: metrics.clone(),
    });

    // === 5. Background actors ===
    tracing::info!("Starting coordinator actor");
    let coordinator = CoordinatorActor::new(
        shipments,
        payments,
        carrier,
        metrics.clone(),
        SweepSchedule {
            tracking_interval: config.tracking_poll_interval,
            reconcile_interval: config.payment_reconcile_interval,
        },
    )
    .start();

    // === 6. HTTP ===
    tracing::info!(bind = %config.http_bind, "🌐 Starting HTTP server");
    let metrics_data = web::Data::new(metrics);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(metrics_data.clone())
            .configure(metrics::configure)
            .configure(api::configure)
    })
    .bind(&config.http_bind)?
    .run()
    .await?;

    coordinator.send(Shutdown).await?;
    tracing::info!("👋 Shut down cleanly");
    Ok(())
}
