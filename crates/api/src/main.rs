use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediatag_api::background::ledger_retention;
use mediatag_api::config::ServerConfig;
use mediatag_api::router::build_app_router;
use mediatag_api::state::AppState;
use mediatag_cloud::AwsSettings;
use mediatag_worker::wiring::{self, DatabaseSettings};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mediatag_api=debug,mediatag_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let database = DatabaseSettings::from_env().expect("Invalid database configuration");
    let aws = AwsSettings::from_env().expect("Invalid AWS configuration");
    let settings = wiring::pipeline_settings(|key| std::env::var(key).ok(), &aws)
        .expect("Invalid pipeline configuration");

    // --- Database ---
    let pool = mediatag_db::create_pool(&database.url, database.max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    mediatag_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    mediatag_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Pipeline ---
    let pipeline = wiring::build_pipeline(pool.clone(), &aws, settings).await;

    // --- Background tasks ---
    let cancel = CancellationToken::new();

    let retention_days = ledger_retention::retention_days(|key| std::env::var(key).ok());
    let retention_handle = tokio::spawn(ledger_retention::run(
        pool,
        retention_days,
        cancel.clone(),
    ));

    let consumer_handles = if config.run_consumers {
        let handles = wiring::spawn_consumers(&pipeline, &cancel);
        tracing::info!(consumers = handles.len(), "Queue consumers started in-process");
        handles
    } else {
        Vec::new()
    };

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        pipeline,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(wiring::shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    wiring::stop_consumers(&cancel, consumer_handles).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Background tasks stopped");

    tracing::info!("Graceful shutdown complete");
}
