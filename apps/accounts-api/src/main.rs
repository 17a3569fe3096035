use axum::middleware;
use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::RetryConfig;
use observability::middleware::metrics_middleware;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Before any fallible operation so startup errors are colored too
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);
    observability::init_metrics()?;

    info!("Connecting to PostgreSQL");
    let db = database::postgres::connect_with_retry(config.database.clone(), RetryConfig::default())
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    if config.run_migrations {
        database::postgres::run_migrations::<migration::Migrator>(&db).await?;
    }

    let state = AppState::new(config, db);

    // Stateless router; each domain router already carries its service
    let api_routes = api::routes(&state);

    // Adds /api prefix, docs UIs, tracing, CORS and compression
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes)?;

    // - /health: liveness with app name/version
    // - /ready: PostgreSQL round trip
    // - /metrics: Prometheus exposition
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()))
        .merge(api::metrics_router())
        .layer(middleware::from_fn(metrics_middleware));

    // The service handles live in the routers; keep what shutdown needs
    let AppState { config, db, .. } = state;

    info!("Starting accounts API with graceful shutdown (30s timeout)");

    create_production_app(
        app,
        &config.server,
        Duration::from_secs(30),
        async move {
            info!("Shutting down: closing database connections");
            match db.close().await {
                Ok(_) => info!("PostgreSQL connection closed successfully"),
                Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
            }
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Accounts API shutdown complete");
    Ok(())
}
