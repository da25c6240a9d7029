//! Long-poll queue consumers.
//!
//! A [`QueueConsumer`] repeatedly receives up to [`RECEIVE_BATCH`] messages
//! from one queue and hands each to the pipeline, which deletes it once
//! handled. Receive errors are logged and retried after [`ERROR_BACKOFF`].

use std::time::Duration;

use mediatag_core::batching::MAX_QUEUE_BATCH;
use mediatag_core::error::CoreResult;
use mediatag_core::message::ReceivedMessage;
use mediatag_pipeline::MediaPipeline;
use tokio_util::sync::CancellationToken;

/// Messages requested per receive call.
pub const RECEIVE_BATCH: i32 = MAX_QUEUE_BATCH as i32;

/// Long-poll wait per receive call.
pub const RECEIVE_WAIT: Duration = Duration::from_secs(20);

/// Pause after a failed receive.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Which queue a consumer drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerKind {
    /// Face-search job notices, reconciled onto videos and chunks.
    JobCompletion,
    /// Photo and frame detection requests.
    ImageDetection,
}

impl ConsumerKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::JobCompletion => "job-completion",
            Self::ImageDetection => "image-detection",
        }
    }
}

pub struct QueueConsumer {
    kind: ConsumerKind,
    pipeline: MediaPipeline,
    wait: Duration,
    backoff: Duration,
}

impl QueueConsumer {
    pub fn new(kind: ConsumerKind, pipeline: MediaPipeline) -> Self {
        Self {
            kind,
            pipeline,
            wait: RECEIVE_WAIT,
            backoff: ERROR_BACKOFF,
        }
    }

    /// Override the long-poll wait and error backoff (tests use short ones).
    pub fn with_timing(mut self, wait: Duration, backoff: Duration) -> Self {
        self.wait = wait;
        self.backoff = backoff;
        self
    }

    pub fn kind(&self) -> ConsumerKind {
        self.kind
    }

    /// Run until `cancel` fires. A batch already received is finished
    /// before the loop exits.
    pub async fn run(&self, cancel: CancellationToken) {
        let consumer = self.kind.name();
        tracing::info!(
            consumer,
            wait_secs = self.wait.as_secs(),
            "Queue consumer started",
        );

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.receive() => received,
            };

            match received {
                Ok(messages) => {
                    if !messages.is_empty() {
                        tracing::debug!(consumer, count = messages.len(), "Received messages");
                    }
                    for message in &messages {
                        self.handle(message).await;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        consumer,
                        error = %e,
                        backoff_secs = self.backoff.as_secs(),
                        "Receive failed; backing off",
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.backoff) => {}
                    }
                }
            }
        }

        tracing::info!(consumer, "Queue consumer stopped");
    }

    async fn receive(&self) -> CoreResult<Vec<ReceivedMessage>> {
        let queue = match self.kind {
            ConsumerKind::JobCompletion => self.pipeline.completion_queue(),
            ConsumerKind::ImageDetection => self.pipeline.detection_queue(),
        };
        queue.receive(RECEIVE_BATCH, self.wait).await
    }

    async fn handle(&self, message: &ReceivedMessage) {
        let result = match self.kind {
            ConsumerKind::JobCompletion => self
                .pipeline
                .process_completion_message(message)
                .await
                .map(|outcome| {
                    if let Some(outcome) = outcome {
                        tracing::info!(
                            job_id = %outcome.job_id,
                            matched = outcome.matched,
                            updated = outcome.updated,
                            duplicates = outcome.duplicates,
                            "Job notice processed",
                        );
                    }
                }),
            ConsumerKind::ImageDetection => self
                .pipeline
                .process_detection_message(message)
                .await
                .map(|outcome| {
                    if let Some(outcome) = outcome {
                        tracing::debug!(?outcome, "Detection message processed");
                    }
                }),
        };

        if let Err(e) = result {
            tracing::error!(
                consumer = self.kind.name(),
                message_id = ?message.message_id,
                error = %e,
                "Failed to delete consumed message",
            );
        }
    }
}
