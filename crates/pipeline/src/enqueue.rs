//! Sending still images to the detection queue.
//!
//! A single enqueue sends one message for one record. A bulk enqueue walks
//! every eligible record of one event page by page, sends them in batches of
//! at most [`MAX_QUEUE_BATCH`] and moves each accepted record to `PENDING`.

use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};
use mediatag_core::batching::{batches, MAX_QUEUE_BATCH};
use mediatag_core::error::{CoreError, CoreResult};
use mediatag_core::idempotency::IdempotencyKey;
use mediatag_core::media::{MediaKind, MediaRecord, SourceType, StatusUpdate};
use mediatag_core::message::{DetectionMessage, OutgoingMessage};
use mediatag_core::requests::{BulkDetection, Detection};
use mediatag_core::status::RecognitionStatus;
use serde::Serialize;
use uuid::Uuid;

use crate::MediaPipeline;

/// How many `PENDING` writes run at once after a batch is accepted.
const STATUS_UPDATE_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueOutcome {
    /// Queue message id; absent when nothing was sent.
    pub message_id: Option<String>,
    /// The record was already waiting on the queue or the vision service.
    pub already_queued: bool,
}

/// Counts for one bulk enqueue. `messages_sent + failed == matched`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEnqueueOutcome {
    pub messages_sent: usize,
    pub failed: usize,
    pub matched: usize,
}

fn outgoing(entry_id: String, message: &DetectionMessage) -> CoreResult<OutgoingMessage> {
    Ok(OutgoingMessage {
        id: entry_id,
        body: message.to_body()?,
        idempotency_key: Some(message.idempotency_key.clone()),
    })
}

fn new_delivery_id() -> String {
    Uuid::new_v4().to_string()
}

fn bulk_message(
    source_type: SourceType,
    record: &MediaRecord,
    bulk: &BulkDetection,
) -> DetectionMessage {
    let (photo_id, frame_id) = match source_type {
        SourceType::Photo => (Some(record.id.clone()), None),
        SourceType::Frame => (None, Some(record.id.clone())),
    };
    DetectionMessage {
        user_id: record.user_id.clone(),
        event_id: record.event_id.clone(),
        source_type,
        photo_id,
        frame_id,
        video_id: record.video_id.clone(),
        rekognition_collection_id: bulk.collection_id.clone(),
        bucket_name: bulk.bucket_name.clone(),
        s3_key: record.s3_key.clone(),
        idempotency_key: IdempotencyKey::for_enqueue(record.kind, &record.id, &bulk.collection_id),
        delivery_id: new_delivery_id(),
    }
}

impl MediaPipeline {
    /// Queue one photo or frame for face detection.
    pub async fn enqueue_detection(&self, detection: &Detection) -> CoreResult<EnqueueOutcome> {
        let kind = detection.source_type.media_kind();
        let record = self
            .store
            .find_media(kind, &detection.media_id)
            .await?
            .filter(|r| r.user_id == detection.user_id && r.event_id == detection.event_id)
            .ok_or_else(|| kind.not_found(&detection.media_id))?;

        if record.status.is_in_flight() {
            tracing::debug!(
                kind = %kind,
                media_id = %record.id,
                status = %record.status,
                "Record already queued; not sending again",
            );
            return Ok(EnqueueOutcome {
                message_id: None,
                already_queued: true,
            });
        }

        let (photo_id, frame_id) = match detection.source_type {
            SourceType::Photo => (Some(detection.media_id.clone()), None),
            SourceType::Frame => (None, Some(detection.media_id.clone())),
        };
        let message = DetectionMessage {
            user_id: detection.user_id.clone(),
            event_id: detection.event_id.clone(),
            source_type: detection.source_type,
            photo_id,
            frame_id,
            video_id: detection.video_id.clone(),
            rekognition_collection_id: detection.collection_id.clone(),
            bucket_name: detection.bucket_name.clone(),
            s3_key: detection.s3_key.clone(),
            idempotency_key: IdempotencyKey::for_enqueue(
                kind,
                &detection.media_id,
                &detection.collection_id,
            ),
            delivery_id: new_delivery_id(),
        };

        let message_id = self
            .detection_queue
            .send(&outgoing(record.id.clone(), &message)?)
            .await?;

        let pending = StatusUpdate::to(RecognitionStatus::Pending);
        if !self.store.update_status(kind, &record.id, &pending).await? {
            tracing::warn!(
                kind = %kind,
                media_id = %record.id,
                "Message sent but record was not moved to PENDING",
            );
        }

        tracing::info!(
            kind = %kind,
            media_id = %record.id,
            message_id = %message_id,
            "Queued record for face detection",
        );
        Ok(EnqueueOutcome {
            message_id: Some(message_id),
            already_queued: false,
        })
    }

    /// Queue every eligible photo or frame of one event.
    ///
    /// Eligible means not archived and `UPLOADED` or `FAILED`. Individual
    /// entries the queue rejects are counted in `failed` and left in their
    /// current status so a later call picks them up again. If every batch
    /// fails outright, the first queue error is returned instead.
    pub async fn enqueue_bulk(
        &self,
        kind: MediaKind,
        bulk: &BulkDetection,
    ) -> CoreResult<BulkEnqueueOutcome> {
        let source_type = SourceType::try_from(kind)?;
        let page_size = self.settings.page_size;

        let mut outcome = BulkEnqueueOutcome::default();
        let mut first_error: Option<CoreError> = None;
        let mut after_id: Option<String> = None;

        loop {
            let page = self
                .store
                .list_detection_candidates(kind, &bulk.filter, after_id.as_deref(), page_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            after_id = Some(last.id.clone());
            outcome.matched += page.len();

            for chunk in batches(&page) {
                let messages = chunk
                    .iter()
                    .enumerate()
                    .map(|(i, record)| {
                        outgoing(i.to_string(), &bulk_message(source_type, record, bulk))
                    })
                    .collect::<CoreResult<Vec<_>>>()?;
                debug_assert!(messages.len() <= MAX_QUEUE_BATCH);

                let sent = match self.detection_queue.send_batch(&messages).await {
                    Ok(result) => {
                        for entry in &result.failed {
                            tracing::warn!(
                                kind = %kind,
                                entry_id = %entry.id,
                                reason = %entry.reason,
                                "Queue rejected detection message",
                            );
                        }
                        result.sent
                    }
                    Err(e) => {
                        tracing::error!(
                            kind = %kind,
                            error = %e,
                            batch = chunk.len(),
                            "Batch send failed",
                        );
                        first_error.get_or_insert(e);
                        Vec::new()
                    }
                };

                let accepted: BTreeSet<usize> = sent
                    .iter()
                    .filter_map(|id| id.parse::<usize>().ok())
                    .filter(|&i| i < chunk.len())
                    .collect();
                outcome.messages_sent += accepted.len();
                outcome.failed += chunk.len().saturating_sub(accepted.len());

                let ids = accepted.into_iter().map(|i| chunk[i].id.clone()).collect();
                self.mark_pending(kind, ids).await;
            }
        }

        if outcome.messages_sent == 0 {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        tracing::info!(
            kind = %kind,
            user_id = %bulk.filter.user_id,
            event_id = %bulk.filter.event_id,
            matched = outcome.matched,
            messages_sent = outcome.messages_sent,
            failed = outcome.failed,
            "Bulk detection enqueue finished",
        );
        Ok(outcome)
    }

    /// Move sent records to `PENDING`. A failed write only leaves the record
    /// eligible for another bulk run, so errors are logged and not returned.
    async fn mark_pending(&self, kind: MediaKind, media_ids: Vec<String>) {
        let pending = StatusUpdate::to(RecognitionStatus::Pending);
        stream::iter(media_ids)
            .map(|media_id| {
                let store = self.store.clone();
                let pending = pending.clone();
                async move {
                    let result = store.update_status(kind, &media_id, &pending).await;
                    (media_id, result)
                }
            })
            .buffer_unordered(STATUS_UPDATE_CONCURRENCY)
            .for_each(|(media_id, result)| async move {
                match result {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!(kind = %kind, media_id = %media_id, "Record not moved to PENDING")
                    }
                    Err(e) => tracing::warn!(
                        kind = %kind,
                        media_id = %media_id,
                        error = %e,
                        "Failed to mark record PENDING",
                    ),
                }
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use mediatag_core::media::MediaFilter;

    use super::*;
    use crate::testing::{media, Harness};
    use crate::PipelineSettings;

    fn bulk() -> BulkDetection {
        BulkDetection {
            filter: MediaFilter {
                user_id: "u-1".into(),
                event_id: "e-1".into(),
            },
            bucket_name: "media".into(),
            collection_id: "event-e-1".into(),
        }
    }

    fn detection(source_type: SourceType, media_id: &str) -> Detection {
        Detection {
            user_id: "u-1".into(),
            event_id: "e-1".into(),
            source_type,
            media_id: media_id.into(),
            video_id: None,
            collection_id: "event-e-1".into(),
            bucket_name: "media".into(),
            s3_key: format!("events/e-1/{media_id}.jpg"),
        }
    }

    fn seed_photos(h: &Harness, count: usize) {
        for i in 0..count {
            h.store.insert(media(
                MediaKind::Photo,
                &format!("p-{i:03}"),
                RecognitionStatus::Uploaded,
            ));
        }
    }

    // -----------------------------------------------------------------------
    // Single
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn single_enqueue_sends_and_marks_pending() {
        let h = Harness::new();
        h.store
            .insert(media(MediaKind::Photo, "p-1", RecognitionStatus::Uploaded));

        let outcome = h
            .pipeline
            .enqueue_detection(&detection(SourceType::Photo, "p-1"))
            .await
            .unwrap();

        assert!(!outcome.already_queued);
        assert!(outcome.message_id.is_some());
        assert_eq!(
            h.store.get(MediaKind::Photo, "p-1").unwrap().status,
            RecognitionStatus::Pending
        );

        let sent = h.detection_queue.sent_messages();
        assert_eq!(sent.len(), 1);
        let message = DetectionMessage::parse(&sent[0].body).unwrap();
        assert_eq!(message.photo_id.as_deref(), Some("p-1"));
        assert_eq!(
            message.idempotency_key,
            IdempotencyKey::for_enqueue(MediaKind::Photo, "p-1", "event-e-1")
        );
    }

    #[tokio::test]
    async fn in_flight_record_is_not_sent_again() {
        let h = Harness::new();
        h.store
            .insert(media(MediaKind::Frame, "f-1", RecognitionStatus::Processing));

        let outcome = h
            .pipeline
            .enqueue_detection(&detection(SourceType::Frame, "f-1"))
            .await
            .unwrap();

        assert!(outcome.already_queued);
        assert_eq!(outcome.message_id, None);
        assert_eq!(h.detection_queue.send_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let h = Harness::new();
        assert_matches!(
            h.pipeline
                .enqueue_detection(&detection(SourceType::Photo, "missing"))
                .await,
            Err(CoreError::NotFound { entity: "Photo", .. })
        );
        assert_eq!(h.detection_queue.send_calls(), 0);
    }

    #[tokio::test]
    async fn record_of_another_event_is_not_found() {
        let h = Harness::new();
        let mut other = media(MediaKind::Photo, "p-1", RecognitionStatus::Uploaded);
        other.event_id = "e-2".into();
        h.store.insert(other);

        assert_matches!(
            h.pipeline
                .enqueue_detection(&detection(SourceType::Photo, "p-1"))
                .await,
            Err(CoreError::NotFound { .. })
        );
    }

    // -----------------------------------------------------------------------
    // Bulk
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn bulk_sends_one_message_per_matching_record() {
        let h = Harness::new();
        seed_photos(&h, 23);

        let outcome = h.pipeline.enqueue_bulk(MediaKind::Photo, &bulk()).await.unwrap();

        assert_eq!(
            outcome,
            BulkEnqueueOutcome {
                messages_sent: 23,
                failed: 0,
                matched: 23
            }
        );
        assert_eq!(h.detection_queue.batch_sizes(), vec![10, 10, 3]);
        assert_eq!(h.detection_queue.sent_messages().len(), 23);
        assert!(h
            .store
            .all(MediaKind::Photo)
            .iter()
            .all(|r| r.status == RecognitionStatus::Pending));
    }

    #[tokio::test]
    async fn no_batch_exceeds_the_queue_limit_across_pages() {
        let h = Harness::with_settings(PipelineSettings {
            page_size: 25,
            ..PipelineSettings::default()
        });
        seed_photos(&h, 61);

        let outcome = h.pipeline.enqueue_bulk(MediaKind::Photo, &bulk()).await.unwrap();

        assert_eq!(outcome.messages_sent, 61);
        let sizes = h.detection_queue.batch_sizes();
        assert!(sizes.iter().all(|&s| s <= MAX_QUEUE_BATCH), "{sizes:?}");
        assert_eq!(sizes.iter().sum::<usize>(), 61);
    }

    #[tokio::test]
    async fn zero_matching_records_make_no_queue_calls() {
        let h = Harness::new();
        h.store
            .insert(media(MediaKind::Photo, "p-1", RecognitionStatus::Completed));

        let outcome = h.pipeline.enqueue_bulk(MediaKind::Photo, &bulk()).await.unwrap();

        assert_eq!(outcome, BulkEnqueueOutcome::default());
        assert_eq!(h.detection_queue.send_calls(), 0);
    }

    #[tokio::test]
    async fn bulk_skips_in_flight_archived_and_foreign_records() {
        let h = Harness::new();
        h.store
            .insert(media(MediaKind::Frame, "f-1", RecognitionStatus::Uploaded));
        h.store
            .insert(media(MediaKind::Frame, "f-2", RecognitionStatus::Failed));
        h.store
            .insert(media(MediaKind::Frame, "f-3", RecognitionStatus::Pending));
        let mut archived = media(MediaKind::Frame, "f-4", RecognitionStatus::Uploaded);
        archived.is_archived = true;
        h.store.insert(archived);
        let mut foreign = media(MediaKind::Frame, "f-5", RecognitionStatus::Uploaded);
        foreign.user_id = "u-2".into();
        h.store.insert(foreign);
        h.store
            .insert(media(MediaKind::Photo, "p-1", RecognitionStatus::Uploaded));

        let outcome = h.pipeline.enqueue_bulk(MediaKind::Frame, &bulk()).await.unwrap();

        assert_eq!(outcome.matched, 2);
        let ids: Vec<_> = h
            .detection_queue
            .sent_messages()
            .iter()
            .map(|m| DetectionMessage::parse(&m.body).unwrap().frame_id.unwrap())
            .collect();
        assert_eq!(ids, vec!["f-1", "f-2"]);
    }

    #[tokio::test]
    async fn rejected_entries_are_counted_and_stay_eligible() {
        let h = Harness::new();
        seed_photos(&h, 12);
        h.detection_queue.reject_bodies_containing("p-004");

        let outcome = h.pipeline.enqueue_bulk(MediaKind::Photo, &bulk()).await.unwrap();

        assert_eq!(
            outcome,
            BulkEnqueueOutcome {
                messages_sent: 11,
                failed: 1,
                matched: 12
            }
        );
        assert_eq!(
            h.store.get(MediaKind::Photo, "p-004").unwrap().status,
            RecognitionStatus::Uploaded
        );
    }

    #[tokio::test]
    async fn entry_acknowledged_twice_is_counted_once() {
        let h = Harness::new();
        seed_photos(&h, 4);
        h.detection_queue.reject_bodies_containing("p-002");
        h.detection_queue.repeat_batch_acks();

        let outcome = h.pipeline.enqueue_bulk(MediaKind::Photo, &bulk()).await.unwrap();

        assert_eq!(
            outcome,
            BulkEnqueueOutcome {
                messages_sent: 3,
                failed: 1,
                matched: 4
            }
        );
        assert_eq!(
            h.store.get(MediaKind::Photo, "p-002").unwrap().status,
            RecognitionStatus::Uploaded
        );
    }

    #[tokio::test]
    async fn queue_outage_is_reported_as_upstream_error() {
        let h = Harness::new();
        seed_photos(&h, 3);
        h.detection_queue.fail_sends("queue does not exist");

        assert_matches!(
            h.pipeline.enqueue_bulk(MediaKind::Photo, &bulk()).await,
            Err(CoreError::Upstream { .. })
        );
        assert!(h
            .store
            .all(MediaKind::Photo)
            .iter()
            .all(|r| r.status == RecognitionStatus::Uploaded));
    }

    #[tokio::test]
    async fn videos_cannot_be_bulk_enqueued() {
        let h = Harness::new();
        assert_matches!(
            h.pipeline.enqueue_bulk(MediaKind::Video, &bulk()).await,
            Err(CoreError::Validation(_))
        );
    }
}
