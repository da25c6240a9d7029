//! In-memory port implementations for tests.
//!
//! Enabled inside this crate's own tests and, for other crates, through the
//! `test-support` feature. [`Harness`] wires one of each fake into a
//! [`MediaPipeline`] and keeps handles so tests can seed and inspect them.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use mediatag_core::error::{CoreError, CoreResult};
use mediatag_core::idempotency::IdempotencyKey;
use mediatag_core::media::{
    DetectedFace, MediaFilter, MediaKind, MediaRecord, StatusCount, StatusUpdate,
};
use mediatag_core::message::{BatchSendOutcome, FailedEntry, OutgoingMessage, ReceivedMessage};
use mediatag_core::ports::{DeliveryLedger, FaceRecognition, MediaStore, MessageQueue};
use mediatag_core::status::RecognitionStatus;
use mediatag_core::vision::{
    CollectionCreated, CollectionStats, FaceSearchJob, IndexFacesRequest,
};

use crate::{MediaPipeline, PipelineSettings, Ports};

/// Lock a fake's state. A panicking test must not poison the others.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A record owned by `u-1` / `e-1` in bucket `media`.
pub fn media(kind: MediaKind, id: &str, status: RecognitionStatus) -> MediaRecord {
    MediaRecord {
        kind,
        id: id.to_string(),
        user_id: "u-1".into(),
        event_id: "e-1".into(),
        video_id: matches!(kind, MediaKind::Frame | MediaKind::VideoChunk).then(|| "v-1".into()),
        bucket_name: "media".into(),
        s3_key: format!("events/e-1/{kind}/{id}"),
        status,
        recognition_job_id: None,
        face_count: None,
        is_archived: false,
    }
}

// ---------------------------------------------------------------------------
// Media store
// ---------------------------------------------------------------------------

struct StoredMedia {
    record: MediaRecord,
    failure_reason: Option<String>,
    faces: Vec<DetectedFace>,
}

/// [`MediaStore`] over a vector, applying the same transition rules as the
/// PostgreSQL store.
#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<StoredMedia>>,
    failure: Mutex<Option<String>>,
    face_write_failure: Mutex<Option<String>>,
}

impl InMemoryStore {
    pub fn insert(&self, record: MediaRecord) {
        lock(&self.rows).push(StoredMedia {
            record,
            failure_reason: None,
            faces: Vec::new(),
        });
    }

    pub fn get(&self, kind: MediaKind, id: &str) -> Option<MediaRecord> {
        lock(&self.rows)
            .iter()
            .find(|row| row.record.kind == kind && row.record.id == id)
            .map(|row| row.record.clone())
    }

    /// All records of `kind`, ordered by id.
    pub fn all(&self, kind: MediaKind) -> Vec<MediaRecord> {
        let mut records: Vec<_> = lock(&self.rows)
            .iter()
            .filter(|row| row.record.kind == kind)
            .map(|row| row.record.clone())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn failure_reason(&self, kind: MediaKind, id: &str) -> Option<String> {
        lock(&self.rows)
            .iter()
            .find(|row| row.record.kind == kind && row.record.id == id)
            .and_then(|row| row.failure_reason.clone())
    }

    pub fn faces_for(&self, kind: MediaKind, id: &str) -> Vec<DetectedFace> {
        lock(&self.rows)
            .iter()
            .find(|row| row.record.kind == kind && row.record.id == id)
            .map(|row| row.faces.clone())
            .unwrap_or_default()
    }

    /// Make every subsequent port call fail with a storage error.
    pub fn fail_with(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    /// Make only `record_faces` fail; status writes keep working.
    pub fn fail_face_writes_with(&self, message: &str) {
        *lock(&self.face_write_failure) = Some(message.to_string());
    }

    fn check(&self) -> CoreResult<()> {
        match lock(&self.failure).as_ref() {
            Some(message) => Err(CoreError::Storage(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MediaStore for InMemoryStore {
    async fn ping(&self) -> CoreResult<()> {
        self.check()
    }

    async fn find_media(&self, kind: MediaKind, id: &str) -> CoreResult<Option<MediaRecord>> {
        self.check()?;
        Ok(self.get(kind, id))
    }

    async fn list_detection_candidates(
        &self,
        kind: MediaKind,
        filter: &MediaFilter,
        after_id: Option<&str>,
        limit: usize,
    ) -> CoreResult<Vec<MediaRecord>> {
        self.check()?;
        Ok(self
            .all(kind)
            .into_iter()
            .filter(|r| r.user_id == filter.user_id && r.event_id == filter.event_id)
            .filter(|r| !r.is_archived && r.status.is_enqueueable())
            .filter(|r| after_id.map_or(true, |after| r.id.as_str() > after))
            .take(limit)
            .collect())
    }

    async fn find_by_job_id(&self, kind: MediaKind, job_id: &str) -> CoreResult<Vec<MediaRecord>> {
        self.check()?;
        Ok(self
            .all(kind)
            .into_iter()
            .filter(|r| r.recognition_job_id.as_deref() == Some(job_id))
            .collect())
    }

    async fn update_status(
        &self,
        kind: MediaKind,
        id: &str,
        update: &StatusUpdate,
    ) -> CoreResult<bool> {
        self.check()?;
        let mut rows = lock(&self.rows);
        let Some(row) = rows
            .iter_mut()
            .find(|row| row.record.kind == kind && row.record.id == id)
        else {
            return Ok(false);
        };

        let record = &mut row.record;
        if !record.status.can_transition(update.status) {
            return Ok(false);
        }
        if let Some(expected) = &update.expected_job_id {
            if record.recognition_job_id.as_ref() != Some(expected) {
                return Ok(false);
            }
        }

        record.status = update.status;
        if let Some(job_id) = &update.job_id {
            record.recognition_job_id = Some(job_id.clone());
        }
        if let Some(count) = update.face_count {
            record.face_count = Some(count);
        }
        row.failure_reason = update.failure_reason.clone();
        Ok(true)
    }

    async fn record_faces(
        &self,
        kind: MediaKind,
        media_id: &str,
        faces: &[DetectedFace],
    ) -> CoreResult<usize> {
        self.check()?;
        if let Some(message) = lock(&self.face_write_failure).as_ref() {
            return Err(CoreError::Storage(message.clone()));
        }
        let mut rows = lock(&self.rows);
        let row = rows
            .iter_mut()
            .find(|row| row.record.kind == kind && row.record.id == media_id)
            .ok_or_else(|| kind.not_found(media_id))?;

        let mut stored = 0;
        for face in faces {
            if !row
                .faces
                .iter()
                .any(|f| f.external_face_id == face.external_face_id)
            {
                row.faces.push(face.clone());
                stored += 1;
            }
        }
        Ok(stored)
    }

    async fn status_summary(
        &self,
        kind: MediaKind,
        filter: &MediaFilter,
    ) -> CoreResult<Vec<StatusCount>> {
        self.check()?;
        let mut counts: Vec<StatusCount> = Vec::new();
        for record in self.all(kind) {
            if record.user_id != filter.user_id
                || record.event_id != filter.event_id
                || record.is_archived
            {
                continue;
            }
            match counts.iter_mut().find(|c| c.status == record.status) {
                Some(count) => count.count += 1,
                None => counts.push(StatusCount {
                    status: record.status,
                    count: 1,
                }),
            }
        }
        Ok(counts)
    }
}

// ---------------------------------------------------------------------------
// Face recognition
// ---------------------------------------------------------------------------

/// [`FaceRecognition`] that keeps collections in memory and records calls.
#[derive(Default)]
pub struct FakeRecognition {
    collections: Mutex<HashMap<String, i64>>,
    jobs_by_token: Mutex<HashMap<String, String>>,
    started: Mutex<Vec<FaceSearchJob>>,
    indexed: Mutex<Vec<IndexFacesRequest>>,
    faces: Mutex<Vec<DetectedFace>>,
    failure: Mutex<Option<String>>,
}

impl FakeRecognition {
    pub fn set_face_count(&self, collection_id: &str, count: i64) {
        lock(&self.collections).insert(collection_id.to_string(), count);
    }

    pub fn collection_count(&self) -> usize {
        lock(&self.collections).len()
    }

    /// Faces returned by every subsequent `index_faces` call.
    pub fn set_indexed_faces(&self, faces: Vec<DetectedFace>) {
        *lock(&self.faces) = faces;
    }

    /// Make every subsequent call fail with an upstream error.
    pub fn fail_with(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    /// Undo [`FakeRecognition::fail_with`].
    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    pub fn started_jobs(&self) -> Vec<FaceSearchJob> {
        lock(&self.started).clone()
    }

    pub fn indexed_requests(&self) -> Vec<IndexFacesRequest> {
        lock(&self.indexed).clone()
    }

    fn check(&self) -> CoreResult<()> {
        match lock(&self.failure).as_ref() {
            Some(message) => Err(CoreError::Upstream {
                service: "Rekognition",
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FaceRecognition for FakeRecognition {
    async fn create_collection(&self, collection_id: &str) -> CoreResult<CollectionCreated> {
        self.check()?;
        let mut collections = lock(&self.collections);
        if collections.contains_key(collection_id) {
            return Err(CoreError::Conflict(format!(
                "Collection '{collection_id}' already exists"
            )));
        }
        collections.insert(collection_id.to_string(), 0);
        Ok(CollectionCreated {
            collection_arn: Some(format!(
                "arn:aws:rekognition:eu-west-1:000000000000:collection/{collection_id}"
            )),
            status_code: Some(200),
        })
    }

    async fn describe_collection(&self, collection_id: &str) -> CoreResult<CollectionStats> {
        self.check()?;
        lock(&self.collections)
            .get(collection_id)
            .map(|&face_count| CollectionStats { face_count })
            .ok_or_else(|| CoreError::NotFound {
                entity: "Collection",
                id: collection_id.to_string(),
            })
    }

    async fn delete_collection(&self, collection_id: &str) -> CoreResult<bool> {
        self.check()?;
        Ok(lock(&self.collections).remove(collection_id).is_some())
    }

    async fn start_face_search(&self, job: &FaceSearchJob) -> CoreResult<String> {
        self.check()?;
        lock(&self.started).push(job.clone());

        let mut jobs = lock(&self.jobs_by_token);
        let next = format!("job-{}", jobs.len() + 1);
        let job_id = match &job.client_request_token {
            Some(token) => jobs.entry(token.clone()).or_insert(next).clone(),
            None => next,
        };
        Ok(job_id)
    }

    async fn index_faces(&self, request: &IndexFacesRequest) -> CoreResult<Vec<DetectedFace>> {
        lock(&self.indexed).push(request.clone());
        self.check()?;
        Ok(lock(&self.faces).clone())
    }
}

// ---------------------------------------------------------------------------
// Message queue
// ---------------------------------------------------------------------------

/// [`MessageQueue`] that records sends and deletes and serves queued bodies
/// to `receive`.
#[derive(Default)]
pub struct RecordingQueue {
    singles: Mutex<Vec<OutgoingMessage>>,
    batches: Mutex<Vec<Vec<OutgoingMessage>>>,
    rejected_markers: Mutex<Vec<String>>,
    send_failure: Mutex<Option<String>>,
    repeat_acks: Mutex<bool>,
    incoming: Mutex<VecDeque<ReceivedMessage>>,
    deleted: Mutex<Vec<String>>,
    receipts: AtomicUsize,
}

impl RecordingQueue {
    /// Batch entries whose body contains `marker` are reported as failed.
    pub fn reject_bodies_containing(&self, marker: &str) {
        lock(&self.rejected_markers).push(marker.to_string());
    }

    /// Make every subsequent send fail with an upstream error.
    pub fn fail_sends(&self, message: &str) {
        *lock(&self.send_failure) = Some(message.to_string());
    }

    /// Report every accepted batch entry id twice.
    pub fn repeat_batch_acks(&self) {
        *lock(&self.repeat_acks) = true;
    }

    /// Queue a body for `receive`. Returns its receipt handle.
    pub fn push_incoming(&self, body: impl Into<String>) -> String {
        let n = self.receipts.fetch_add(1, Ordering::SeqCst) + 1;
        let receipt_handle = format!("receipt-{n}");
        lock(&self.incoming).push_back(ReceivedMessage {
            message_id: Some(format!("msg-{n}")),
            receipt_handle: receipt_handle.clone(),
            body: body.into(),
        });
        receipt_handle
    }

    /// Take every queued message without going through `receive`.
    pub fn drain_incoming(&self) -> Vec<ReceivedMessage> {
        lock(&self.incoming).drain(..).collect()
    }

    pub fn pending_incoming(&self) -> usize {
        lock(&self.incoming).len()
    }

    /// Number of send calls, single and batch.
    pub fn send_calls(&self) -> usize {
        lock(&self.singles).len() + lock(&self.batches).len()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        lock(&self.batches).iter().map(Vec::len).collect()
    }

    /// Every message accepted by the queue, in send order.
    pub fn sent_messages(&self) -> Vec<OutgoingMessage> {
        let markers = lock(&self.rejected_markers).clone();
        let mut sent = lock(&self.singles).clone();
        sent.extend(
            lock(&self.batches)
                .iter()
                .flatten()
                .filter(|m| !markers.iter().any(|marker| m.body.contains(marker.as_str())))
                .cloned(),
        );
        sent
    }

    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }

    fn check(&self) -> CoreResult<()> {
        match lock(&self.send_failure).as_ref() {
            Some(message) => Err(CoreError::Upstream {
                service: "SQS",
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessageQueue for RecordingQueue {
    async fn send(&self, message: &OutgoingMessage) -> CoreResult<String> {
        self.check()?;
        let mut singles = lock(&self.singles);
        singles.push(message.clone());
        Ok(format!("sent-{}", singles.len()))
    }

    async fn send_batch(&self, messages: &[OutgoingMessage]) -> CoreResult<BatchSendOutcome> {
        self.check()?;
        lock(&self.batches).push(messages.to_vec());

        let markers = lock(&self.rejected_markers).clone();
        let mut outcome = BatchSendOutcome::default();
        for message in messages {
            if markers.iter().any(|m| message.body.contains(m.as_str())) {
                outcome.failed.push(FailedEntry {
                    id: message.id.clone(),
                    reason: "rejected".into(),
                });
            } else {
                outcome.sent.push(message.id.clone());
            }
        }
        if *lock(&self.repeat_acks) {
            let again = outcome.sent.clone();
            outcome.sent.extend(again);
        }
        Ok(outcome)
    }

    async fn receive(&self, max_messages: i32, wait: Duration) -> CoreResult<Vec<ReceivedMessage>> {
        let max = usize::try_from(max_messages).unwrap_or(0);
        let batch: Vec<_> = {
            let mut incoming = lock(&self.incoming);
            let take = max.min(incoming.len());
            incoming.drain(..take).collect()
        };
        if batch.is_empty() {
            // Stand-in for the long poll so idle consumers do not spin.
            tokio::time::sleep(wait.min(Duration::from_millis(10))).await;
        }
        Ok(batch)
    }

    async fn delete(&self, receipt_handle: &str) -> CoreResult<()> {
        lock(&self.deleted).push(receipt_handle.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryLedger {
    keys: Mutex<HashMap<IdempotencyKey, String>>,
}

impl InMemoryLedger {
    pub fn len(&self) -> usize {
        lock(&self.keys).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys recorded under `scope`.
    pub fn count_in_scope(&self, scope: &str) -> usize {
        lock(&self.keys).values().filter(|s| s.as_str() == scope).count()
    }
}

#[async_trait]
impl DeliveryLedger for InMemoryLedger {
    async fn contains(&self, key: &IdempotencyKey) -> CoreResult<bool> {
        Ok(lock(&self.keys).contains_key(key))
    }

    async fn record(&self, key: &IdempotencyKey, scope: &str) -> CoreResult<()> {
        lock(&self.keys)
            .entry(key.clone())
            .or_insert_with(|| scope.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A pipeline wired to fresh fakes.
pub struct Harness {
    pub pipeline: MediaPipeline,
    pub store: Arc<InMemoryStore>,
    pub recognition: Arc<FakeRecognition>,
    pub detection_queue: Arc<RecordingQueue>,
    pub completion_queue: Arc<RecordingQueue>,
    pub ledger: Arc<InMemoryLedger>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(PipelineSettings::default())
    }

    pub fn with_settings(settings: PipelineSettings) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let recognition = Arc::new(FakeRecognition::default());
        let detection_queue = Arc::new(RecordingQueue::default());
        let completion_queue = Arc::new(RecordingQueue::default());
        let ledger = Arc::new(InMemoryLedger::default());

        let pipeline = MediaPipeline::new(
            Ports {
                store: store.clone(),
                recognition: recognition.clone(),
                detection_queue: detection_queue.clone(),
                completion_queue: completion_queue.clone(),
                ledger: ledger.clone(),
            },
            settings,
        );

        Self {
            pipeline,
            store,
            recognition,
            detection_queue,
            completion_queue,
            ledger,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
