//! Orchestration of face collections, detection enqueueing and job
//! reconciliation.
//!
//! [`MediaPipeline`] is built once per process from the port implementations
//! and shared by the HTTP handlers and the queue consumers. It holds no
//! mutable state of its own; every operation reads and writes through the
//! ports.

pub mod collections;
pub mod completion;
pub mod detection;
pub mod enqueue;
pub mod summary;
pub mod video_search;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use std::sync::Arc;

use mediatag_core::error::CoreResult;
use mediatag_core::ports::{DeliveryLedger, FaceRecognition, MediaStore, MessageQueue};
use mediatag_core::vision::NotificationChannel;

/// Default number of records fetched per page during bulk enqueue.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default cap on faces indexed from one image.
pub const DEFAULT_MAX_FACES: i32 = 100;

/// Tunables for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Records fetched per page during bulk enqueue.
    pub page_size: usize,
    /// Upper bound passed to the vision service when indexing an image.
    pub max_faces: i32,
    /// Where face-search jobs publish their completion notices. Without it,
    /// jobs still run but nothing reports back to the completion queue.
    pub notification_channel: Option<NotificationChannel>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_faces: DEFAULT_MAX_FACES,
            notification_channel: None,
        }
    }
}

/// The collaborators a pipeline talks to.
#[derive(Clone)]
pub struct Ports {
    pub store: Arc<dyn MediaStore>,
    pub recognition: Arc<dyn FaceRecognition>,
    pub detection_queue: Arc<dyn MessageQueue>,
    pub completion_queue: Arc<dyn MessageQueue>,
    pub ledger: Arc<dyn DeliveryLedger>,
}

/// Entry point for every face-detection operation.
///
/// Cheap to clone; all handles are behind `Arc`.
#[derive(Clone)]
pub struct MediaPipeline {
    store: Arc<dyn MediaStore>,
    recognition: Arc<dyn FaceRecognition>,
    detection_queue: Arc<dyn MessageQueue>,
    completion_queue: Arc<dyn MessageQueue>,
    ledger: Arc<dyn DeliveryLedger>,
    settings: PipelineSettings,
}

impl MediaPipeline {
    pub fn new(ports: Ports, mut settings: PipelineSettings) -> Self {
        settings.page_size = settings.page_size.max(1);
        settings.max_faces = settings.max_faces.max(1);
        Self {
            store: ports.store,
            recognition: ports.recognition,
            detection_queue: ports.detection_queue,
            completion_queue: ports.completion_queue,
            ledger: ports.ledger,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Queue read by the image-detection consumer.
    pub fn detection_queue(&self) -> Arc<dyn MessageQueue> {
        Arc::clone(&self.detection_queue)
    }

    /// Queue read by the job-completion consumer.
    pub fn completion_queue(&self) -> Arc<dyn MessageQueue> {
        Arc::clone(&self.completion_queue)
    }

    /// Check that the system of record is reachable.
    pub async fn ping(&self) -> CoreResult<()> {
        self.store.ping().await
    }
}
