//! Innkeep Booking Server
//!
//! HTTP server for hotel availability, booking lifecycle, pricing and
//! payments. PostgreSQL holds the catalog, inventory and bookings; Redis
//! caches catalog reads and carries housekeeping and guest events.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use innkeep_api::{configure_health, configure_routes};
use innkeep_cache::{RedisCache, RedisEventPublisher};
use innkeep_core::{
    traits::{BookingNotifier, CatalogRepository, HousekeepingNotifier},
    AppConfig,
};
use innkeep_db::{
    create_pool, run_migrations, PgBookingRepository, PgCatalogRepository, PgInventoryStore,
};
use innkeep_services::{
    BookingService, CachedCatalog, Collaborators, HttpPaymentGateway, LogNotifier, Stores,
};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
///
/// `LOG_FORMAT=json` switches to JSON lines for log shippers.
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "innkeep={lvl},innkeep_api={lvl},innkeep_services={lvl},innkeep_db={lvl},innkeep_cache={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    let json = env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

/// Catalog reads plus the event sinks, backed by Redis when it is enabled
async fn catalog_and_notifiers(
    config: &AppConfig,
    catalog: Arc<dyn CatalogRepository>,
) -> (
    Arc<dyn CatalogRepository>,
    Arc<dyn HousekeepingNotifier>,
    Arc<dyn BookingNotifier>,
) {
    if !config.redis.enabled {
        info!("Redis disabled; catalog reads are uncached and events are logged");
        return (catalog, Arc::new(LogNotifier), Arc::new(LogNotifier));
    }

    match RedisCache::new(&config.redis.url).await {
        Ok(cache) => {
            info!("Redis connected; caching catalog for {}s", config.redis.catalog_ttl_secs);
            let publisher = Arc::new(RedisEventPublisher::new(
                cache.clone(),
                &config.redis.events_channel_prefix,
            ));
            let cached: Arc<dyn CatalogRepository> = Arc::new(CachedCatalog::new(
                catalog,
                Arc::new(cache),
                config.redis.catalog_ttl_secs,
            ));
            let housekeeping: Arc<dyn HousekeepingNotifier> = publisher.clone();
            let notifier: Arc<dyn BookingNotifier> = publisher;
            (cached, housekeeping, notifier)
        }
        Err(e) => {
            warn!("Redis unavailable, continuing without it: {}", e);
            (catalog, Arc::new(LogNotifier), Arc::new(LogNotifier))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting Innkeep v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().context("failed to load configuration")?;

    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .context("failed to create database pool")?;

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .context("failed to run database migrations")?;
    }

    let (catalog, housekeeping, notifier) =
        catalog_and_notifiers(&config, Arc::new(PgCatalogRepository::new(pool.clone()))).await;

    let gateway =
        HttpPaymentGateway::new(&config.payment).context("failed to build payment gateway")?;

    let service = web::Data::new(BookingService::new(
        Stores {
            catalog,
            inventory: Arc::new(PgInventoryStore::new(pool.clone())),
            bookings: Arc::new(PgBookingRepository::new(pool.clone())),
        },
        Collaborators {
            gateway: Arc::new(gateway),
            housekeeping,
            notifier,
        },
        config.booking.clone(),
    ));

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    let cors_origins = config.server.cors_origins.clone();

    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, workers
    );

    HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origin.to_str().is_ok_and(|origin_str| {
                    cors_origins_inner
                        .split(',')
                        .any(|o| o.trim() == origin_str)
                })
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec![
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("idempotency-key"),
            ])
            .max_age(3600);

        App::new()
            .app_data(service.clone())
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_query",
                        "message": error_message,
                        "status": 400
                    })),
                )
                .into()
            }))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_body",
                        "message": error_message,
                        "status": 400
                    })),
                )
                .into()
            }))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_health)
            .configure(configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {}", bind_addr))?
    .run()
    .await?;

    Ok(())
}
