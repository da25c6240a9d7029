use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediatag_cloud::AwsSettings;
use mediatag_worker::wiring::{self, DatabaseSettings};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediatag_worker=debug,mediatag_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let database = DatabaseSettings::from_env().expect("Invalid database configuration");
    let aws = AwsSettings::from_env().expect("Invalid AWS configuration");
    let settings = wiring::pipeline_settings(|key| std::env::var(key).ok(), &aws)
        .expect("Invalid pipeline configuration");
    tracing::info!(
        page_size = settings.page_size,
        max_faces = settings.max_faces,
        "Loaded worker configuration",
    );

    // --- Database ---
    let pool = mediatag_db::create_pool(&database.url, database.max_connections)
        .await
        .expect("Failed to connect to database");
    mediatag_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    // --- Pipeline and consumers ---
    let pipeline = wiring::build_pipeline(pool, &aws, settings).await;
    let cancel = CancellationToken::new();
    let handles = wiring::spawn_consumers(&pipeline, &cancel);
    tracing::info!(consumers = handles.len(), "Worker started");

    wiring::shutdown_signal().await;

    wiring::stop_consumers(&cancel, handles).await;
    tracing::info!("Worker shut down");
}
