//! Studio Equipment Server
//!
//! REST API server for studio equipment checkout, returns and maintenance.

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studio_equipment_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{notifications::NotificationHub, redis::RedisRelay, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("studio_equipment_server={},tower_http=debug", config.logging.level).into()
    });

    // Optional daily-rotated JSON log files next to the console output
    let (file_layer, _log_guard) = match config.logging.directory.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "studio-equipment-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Studio Equipment Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let hub = NotificationHub::new(config.notifications.channel_capacity);
    let relay = if config.redis.enabled {
        let relay = RedisRelay::new(&config.redis.url, &config.redis.channel)
            .await
            .context("Failed to connect to Redis")?;
        tracing::info!("Connected to Redis");

        let task = relay.clone();
        let task_hub = hub.clone();
        tokio::spawn(async move {
            if let Err(e) = task.run(task_hub).await {
                tracing::error!(error = %e, "Redis relay stopped");
            }
        });
        Some(relay)
    } else {
        None
    };

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let repository = Repository::new(pool.clone());
    let services = Services::new(repository, &config, hub, relay);
    services
        .users
        .ensure_bootstrap_admin()
        .await
        .context("Failed to create bootstrap administrator")?;

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        pool,
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Users
        .route("/users", get(api::users::list_users).post(api::users::create_user))
        .route("/users/:id", get(api::users::get_user).put(api::users::update_user))
        // Equipment catalog
        .route(
            "/equipment",
            get(api::equipment::list_equipment).post(api::equipment::create_equipment),
        )
        .route("/equipment/categories", get(api::equipment::list_categories))
        .route("/equipment/maintenance/due", get(api::equipment::maintenance_due))
        .route(
            "/equipment/:id",
            get(api::equipment::get_equipment)
                .put(api::equipment::update_equipment)
                .delete(api::equipment::delete_equipment),
        )
        .route("/equipment/:id/checkouts", get(api::equipment::equipment_checkouts))
        .route(
            "/equipment/:id/maintenance",
            get(api::maintenance::list_maintenance).post(api::maintenance::create_maintenance),
        )
        // Checkout workflow
        .route(
            "/equipment/checkout",
            get(api::checkouts::list_checkouts).post(api::checkouts::request_checkout),
        )
        .route("/equipment/checkout/overdue", get(api::checkouts::list_overdue))
        .route("/equipment/checkout/:id", get(api::checkouts::get_checkout))
        .route("/equipment/checkout/:id/approve", post(api::checkouts::approve_checkout))
        .route("/equipment/checkout/:id/cancel", post(api::checkouts::cancel_checkout))
        .route("/equipment/checkout/:id/handoff", post(api::checkouts::hand_off_checkout))
        .route("/equipment/checkout/:id/return", post(api::checkouts::return_checkout))
        // Notifications
        .route("/notifications", get(api::notifications::list_notifications))
        .route("/notifications/unread-count", get(api::notifications::unread_count))
        .route("/notifications/stream", get(api::notifications::stream))
        .route("/notifications/read-all", put(api::notifications::mark_all_read))
        .route(
            "/notifications/:id",
            axum::routing::delete(api::notifications::delete_notification),
        )
        .route("/notifications/:id/read", put(api::notifications::mark_read))
        // Activity history
        .route("/activities", get(api::activities::list_activities))
        // Reports
        .route("/reports/equipment", get(api::reports::equipment_report))
        .route("/reports/dashboard", get(api::reports::dashboard))
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
