//! Asynchronous face search over stored videos.

use mediatag_core::error::{CoreError, CoreResult};
use mediatag_core::idempotency::IdempotencyKey;
use mediatag_core::media::{MediaKind, MediaRecord, StatusUpdate};
use mediatag_core::requests::VideoSearch;
use mediatag_core::status::RecognitionStatus;
use mediatag_core::vision::FaceSearchJob;
use serde::Serialize;

use crate::MediaPipeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceSearchStarted {
    pub job_id: String,
}

/// Tag echoed back in the completion notice, e.g. `video_chunk:c-9`.
fn job_tag(kind: MediaKind, id: &str) -> String {
    format!("{kind}:{id}")
}

impl MediaPipeline {
    /// Start a face search of `search.video_name` against a collection.
    ///
    /// When the search targets a video or chunk record, that record is moved
    /// to `PROCESSING` and stamped with the job id so the completion notice
    /// can be reconciled onto it. A target already `PROCESSING` or
    /// `COMPLETED` keeps its job, which is returned without starting another.
    /// A `FAILED` target gets a fresh start token so the search really runs
    /// again.
    pub async fn search_faces_in_video(&self, search: &VideoSearch) -> CoreResult<FaceSearchStarted> {
        let target = match &search.target {
            Some((kind, id)) => Some(
                self.store
                    .find_media(*kind, id)
                    .await?
                    .ok_or_else(|| kind.not_found(id))?,
            ),
            None => None,
        };

        if let Some(job_id) = target.as_ref().and_then(current_job) {
            tracing::info!(
                job_id = %job_id,
                video_name = %search.video_name,
                "Record already has a running or finished face search",
            );
            return Ok(FaceSearchStarted { job_id });
        }

        let failed_job = target
            .as_ref()
            .filter(|record| record.status == RecognitionStatus::Failed)
            .and_then(|record| record.recognition_job_id.as_deref());
        let token = IdempotencyKey::for_face_search(
            &search.bucket_name,
            &search.video_name,
            &search.collection_id,
            failed_job,
        );
        let job = FaceSearchJob {
            bucket_name: search.bucket_name.clone(),
            video_name: search.video_name.clone(),
            collection_id: search.collection_id.clone(),
            notification: self.settings.notification_channel.clone(),
            job_tag: search.target.as_ref().map(|(kind, id)| job_tag(*kind, id)),
            client_request_token: Some(token.to_string()),
        };
        if job.notification.is_none() {
            tracing::warn!(
                video_name = %search.video_name,
                "No notification channel configured; job completion will not be reported",
            );
        }

        let job_id = self.recognition.start_face_search(&job).await?;
        tracing::info!(
            job_id = %job_id,
            video_name = %search.video_name,
            collection_id = %search.collection_id,
            "Face search started",
        );

        if let Some(record) = target {
            let update = StatusUpdate::to(RecognitionStatus::Processing).with_job_id(&job_id);
            let changed = self.store.update_status(record.kind, &record.id, &update).await?;
            if !changed {
                return Err(CoreError::Conflict(format!(
                    "{} {} could not be moved to {}",
                    record.kind.entity(),
                    record.id,
                    RecognitionStatus::Processing
                )));
            }
        }

        Ok(FaceSearchStarted { job_id })
    }
}

/// Job id of a search that is still running or already finished.
fn current_job(record: &MediaRecord) -> Option<String> {
    match record.status {
        RecognitionStatus::Processing | RecognitionStatus::Completed => {
            record.recognition_job_id.clone()
        }
        _ => None,
    }
}
