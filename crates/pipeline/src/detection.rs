//! Consuming detection-queue messages: index the image's faces into the
//! event collection and record the result on the photo or frame.

use mediatag_core::error::{CoreError, CoreResult};
use mediatag_core::idempotency::{IdempotencyKey, SCOPE_DETECT};
use mediatag_core::media::{MediaKind, StatusUpdate};
use mediatag_core::message::{DetectionMessage, ReceivedMessage};
use mediatag_core::status::RecognitionStatus;
use mediatag_core::vision::IndexFacesRequest;

use crate::MediaPipeline;

/// What happened to one detection message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// Faces were indexed and the record is `COMPLETED`.
    Indexed {
        kind: MediaKind,
        media_id: String,
        face_count: usize,
    },
    /// The vision service rejected the image; the record is `FAILED`.
    Failed {
        kind: MediaKind,
        media_id: String,
        reason: String,
    },
    /// The message was already handled.
    Duplicate,
    /// The record is archived; nothing was indexed.
    Skipped,
}

/// Stored with every indexed face so search hits map back to the record.
fn external_image_id(kind: MediaKind, media_id: &str) -> String {
    format!("{kind}:{media_id}")
}

impl MediaPipeline {
    /// Run face indexing for one decoded detection message.
    pub async fn detect_faces(&self, message: &DetectionMessage) -> CoreResult<DetectionOutcome> {
        let (kind, media_id) = message.media()?;
        let key = IdempotencyKey::for_detection(kind, media_id, &message.delivery_id);
        if self.ledger.contains(&key).await? {
            tracing::debug!(kind = %kind, media_id, "Detection message already handled");
            return Ok(DetectionOutcome::Duplicate);
        }

        let record = self
            .store
            .find_media(kind, media_id)
            .await?
            .ok_or_else(|| kind.not_found(media_id))?;
        if record.is_archived {
            tracing::info!(kind = %kind, media_id, "Record archived; skipping detection");
            self.ledger.record(&key, SCOPE_DETECT).await?;
            return Ok(DetectionOutcome::Skipped);
        }

        let processing = StatusUpdate::to(RecognitionStatus::Processing);
        self.store.update_status(kind, media_id, &processing).await?;

        let request = IndexFacesRequest {
            collection_id: message.rekognition_collection_id.clone(),
            bucket_name: message.bucket_name.clone(),
            s3_key: message.s3_key.clone(),
            external_image_id: external_image_id(kind, media_id),
            max_faces: self.settings.max_faces,
        };

        let face_count = match self.index_and_record(kind, media_id, &request).await {
            Ok(face_count) => face_count,
            Err(e @ CoreError::Upstream { .. }) => {
                let reason = e.to_string();
                let failed =
                    StatusUpdate::to(RecognitionStatus::Failed).with_failure_reason(&reason);
                self.store.update_status(kind, media_id, &failed).await?;

                // Not recorded in the ledger: a redelivery may succeed.
                tracing::warn!(kind = %kind, media_id, error = %reason, "Face indexing failed");
                return Ok(DetectionOutcome::Failed {
                    kind,
                    media_id: media_id.to_string(),
                    reason,
                });
            }
            Err(e) => {
                self.release_failed(kind, media_id, &e).await;
                return Err(e);
            }
        };

        self.ledger.record(&key, SCOPE_DETECT).await?;
        Ok(DetectionOutcome::Indexed {
            kind,
            media_id: media_id.to_string(),
            face_count,
        })
    }

    async fn index_and_record(
        &self,
        kind: MediaKind,
        media_id: &str,
        request: &IndexFacesRequest,
    ) -> CoreResult<usize> {
        let faces = self.recognition.index_faces(request).await?;
        let stored = self.store.record_faces(kind, media_id, &faces).await?;
        let face_count = i32::try_from(faces.len()).unwrap_or(i32::MAX);
        let done = StatusUpdate::to(RecognitionStatus::Completed).with_face_count(face_count);
        self.store.update_status(kind, media_id, &done).await?;

        tracing::info!(
            kind = %kind,
            media_id,
            face_count = faces.len(),
            stored,
            "Faces indexed",
        );
        Ok(faces.len())
    }

    /// Move a record this consumer left in `PROCESSING` to `FAILED` so it can
    /// be enqueued again. Errors here are only logged.
    async fn release_failed(&self, kind: MediaKind, media_id: &str, cause: &CoreError) {
        let failed =
            StatusUpdate::to(RecognitionStatus::Failed).with_failure_reason(cause.to_string());
        if let Err(e) = self.store.update_status(kind, media_id, &failed).await {
            tracing::error!(
                kind = %kind,
                media_id,
                error = %e,
                cause = %cause,
                "Record left in PROCESSING",
            );
        }
    }

    /// Handle one detection-queue message and delete it.
    ///
    /// Like the completion path, the message is deleted whether or not it
    /// could be handled. A record that errors after reaching `PROCESSING` is
    /// moved to `FAILED` first, so the next bulk call picks it up again.
    pub async fn process_detection_message(
        &self,
        message: &ReceivedMessage,
    ) -> CoreResult<Option<DetectionOutcome>> {
        let outcome = match DetectionMessage::parse(&message.body) {
            Ok(detection) => match self.detect_faces(&detection).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::error!(
                        message_id = ?message.message_id,
                        error = %e,
                        "Failed to handle detection message",
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    message_id = ?message.message_id,
                    error = %e,
                    "Discarding malformed detection message",
                );
                None
            }
        };

        self.detection_queue.delete(&message.receipt_handle).await?;
        Ok(outcome)
    }
}
