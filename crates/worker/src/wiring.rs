//! Building the live pipeline from environment settings.
//!
//! Both binaries (the worker and the API server) construct exactly one
//! [`MediaPipeline`] here and share it with everything that needs it.

use std::sync::Arc;
use std::time::Duration;

use mediatag_cloud::config::load_sdk_config;
use mediatag_cloud::{AwsSettings, ConfigError, RekognitionService, SqsQueue};
use mediatag_db::store::{PgDeliveryLedger, PgMediaStore};
use mediatag_db::DbPool;
use mediatag_pipeline::{
    MediaPipeline, PipelineSettings, Ports, DEFAULT_MAX_FACES, DEFAULT_PAGE_SIZE,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::consumer::{ConsumerKind, QueueConsumer};

/// Default size of the PostgreSQL connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// How long shutdown waits for each consumer to finish its current batch.
pub const CONSUMER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error(transparent)]
    Aws(#[from] ConfigError),

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} must be {expected} (got '{value}')")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, WiringError> {
    match lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| WiringError::Invalid {
            var,
            expected,
            value,
        }),
    }
}

/// Database connection settings.
///
/// | Env Var                    | Default  |
/// |----------------------------|----------|
/// | `DATABASE_URL`             | required |
/// | `DATABASE_MAX_CONNECTIONS` | `20`     |
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn from_env() -> Result<Self, WiringError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WiringError> {
        let url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(WiringError::Missing("DATABASE_URL"))?;
        let max_connections = parse_var(
            &lookup,
            "DATABASE_MAX_CONNECTIONS",
            "a positive integer",
            DEFAULT_MAX_CONNECTIONS,
        )?;
        Ok(Self {
            url,
            max_connections: max_connections.max(1),
        })
    }
}

/// Read pipeline tunables.
///
/// | Env Var           | Default |
/// |-------------------|---------|
/// | `BULK_PAGE_SIZE`  | `100`   |
/// | `INDEX_MAX_FACES` | `100`   |
pub fn pipeline_settings(
    lookup: impl Fn(&str) -> Option<String>,
    aws: &AwsSettings,
) -> Result<PipelineSettings, WiringError> {
    let page_size: usize = parse_var(
        &lookup,
        "BULK_PAGE_SIZE",
        "a positive integer",
        DEFAULT_PAGE_SIZE,
    )?;
    let max_faces: i32 = parse_var(
        &lookup,
        "INDEX_MAX_FACES",
        "a positive integer",
        DEFAULT_MAX_FACES,
    )?;
    if page_size == 0 {
        return Err(WiringError::Invalid {
            var: "BULK_PAGE_SIZE",
            expected: "a positive integer",
            value: "0".into(),
        });
    }
    if max_faces < 1 {
        return Err(WiringError::Invalid {
            var: "INDEX_MAX_FACES",
            expected: "a positive integer",
            value: max_faces.to_string(),
        });
    }

    Ok(PipelineSettings {
        page_size,
        max_faces,
        notification_channel: aws.notification_channel.clone(),
    })
}

/// Build the live pipeline: PostgreSQL store and ledger, Rekognition, and
/// one SQS client shared by both queues.
pub async fn build_pipeline(
    pool: DbPool,
    aws: &AwsSettings,
    settings: PipelineSettings,
) -> MediaPipeline {
    let sdk_config = load_sdk_config(aws).await;
    let sqs = mediatag_cloud::SqsClient::new(&sdk_config);

    tracing::info!(
        detection_queue = %aws.detection_queue_url,
        completion_queue = %aws.completion_queue_url,
        notifications = aws.notification_channel.is_some(),
        "AWS clients configured",
    );

    MediaPipeline::new(
        Ports {
            store: Arc::new(PgMediaStore::new(pool.clone())),
            recognition: Arc::new(RekognitionService::new(&sdk_config)),
            detection_queue: Arc::new(SqsQueue::with_client(
                sqs.clone(),
                &aws.detection_queue_url,
            )),
            completion_queue: Arc::new(SqsQueue::with_client(sqs, &aws.completion_queue_url)),
            ledger: Arc::new(PgDeliveryLedger::new(pool)),
        },
        settings,
    )
}

/// Spawn the job-completion and image-detection consumers.
pub fn spawn_consumers(
    pipeline: &MediaPipeline,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    [ConsumerKind::JobCompletion, ConsumerKind::ImageDetection]
        .into_iter()
        .map(|kind| {
            let consumer = QueueConsumer::new(kind, pipeline.clone());
            let cancel = cancel.clone();
            tokio::spawn(async move { consumer.run(cancel).await })
        })
        .collect()
}

/// Cancel the consumers and wait for each to finish its current batch.
pub async fn stop_consumers(cancel: &CancellationToken, handles: Vec<JoinHandle<()>>) {
    cancel.cancel();
    for handle in handles {
        if tokio::time::timeout(CONSUMER_SHUTDOWN_TIMEOUT, handle)
            .await
            .is_err()
        {
            tracing::warn!("Queue consumer did not stop in time");
        }
    }
}

/// Wait for SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
