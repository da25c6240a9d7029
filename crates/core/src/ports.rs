//! Port traits for the external collaborators.
//!
//! The orchestration layer only talks to the system of record, the vision
//! service and the message queues through these traits. Live adapters live in
//! the `db` and `cloud` crates; in-memory fakes live in the pipeline crate's
//! `testing` module.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::idempotency::IdempotencyKey;
use crate::media::{DetectedFace, MediaFilter, MediaKind, MediaRecord, StatusCount, StatusUpdate};
use crate::message::{BatchSendOutcome, OutgoingMessage, ReceivedMessage};
use crate::vision::{CollectionCreated, CollectionStats, FaceSearchJob, IndexFacesRequest};

/// System of record for media rows.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Cheap reachability check for the health endpoint.
    async fn ping(&self) -> CoreResult<()>;

    async fn find_media(&self, kind: MediaKind, id: &str) -> CoreResult<Option<MediaRecord>>;

    /// Non-archived records of `kind` owned by `filter` whose status is
    /// enqueueable, ordered by id, strictly after `after_id`.
    async fn list_detection_candidates(
        &self,
        kind: MediaKind,
        filter: &MediaFilter,
        after_id: Option<&str>,
        limit: usize,
    ) -> CoreResult<Vec<MediaRecord>>;

    /// Every record of `kind` carrying `job_id`.
    async fn find_by_job_id(&self, kind: MediaKind, job_id: &str) -> CoreResult<Vec<MediaRecord>>;

    /// Apply `update` if the transition is valid. Returns whether a row
    /// changed.
    async fn update_status(
        &self,
        kind: MediaKind,
        id: &str,
        update: &StatusUpdate,
    ) -> CoreResult<bool>;

    /// Store faces indexed for one record. Returns the number stored.
    async fn record_faces(
        &self,
        kind: MediaKind,
        media_id: &str,
        faces: &[DetectedFace],
    ) -> CoreResult<usize>;

    async fn status_summary(
        &self,
        kind: MediaKind,
        filter: &MediaFilter,
    ) -> CoreResult<Vec<StatusCount>>;
}

/// External face-recognition service.
#[async_trait]
pub trait FaceRecognition: Send + Sync {
    async fn create_collection(&self, collection_id: &str) -> CoreResult<CollectionCreated>;

    async fn describe_collection(&self, collection_id: &str) -> CoreResult<CollectionStats>;

    /// Returns `false` when the collection did not exist.
    async fn delete_collection(&self, collection_id: &str) -> CoreResult<bool>;

    /// Start an asynchronous face search. Returns the job id.
    async fn start_face_search(&self, job: &FaceSearchJob) -> CoreResult<String>;

    async fn index_faces(&self, request: &IndexFacesRequest) -> CoreResult<Vec<DetectedFace>>;
}

/// One message queue, bound to its URL at construction.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Send one message. Returns the queue-assigned message id.
    async fn send(&self, message: &OutgoingMessage) -> CoreResult<String>;

    /// Send at most [`MAX_QUEUE_BATCH`](crate::batching::MAX_QUEUE_BATCH)
    /// messages in one call. Individual entries may fail.
    async fn send_batch(&self, messages: &[OutgoingMessage]) -> CoreResult<BatchSendOutcome>;

    /// Long-poll for up to `max_messages` messages.
    async fn receive(&self, max_messages: i32, wait: Duration) -> CoreResult<Vec<ReceivedMessage>>;

    async fn delete(&self, receipt_handle: &str) -> CoreResult<()>;
}

/// Idempotency keys of work that has already been applied.
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    async fn contains(&self, key: &IdempotencyKey) -> CoreResult<bool>;

    /// Record `key`. Recording an existing key is not an error.
    async fn record(&self, key: &IdempotencyKey, scope: &str) -> CoreResult<()>;
}
