//! Reconciling finished face-search jobs onto video records.

use mediatag_core::error::{CoreError, CoreResult};
use mediatag_core::idempotency::{IdempotencyKey, SCOPE_JOB};
use mediatag_core::media::{MediaKind, StatusUpdate};
use mediatag_core::message::{JobCompletionNotice, ReceivedMessage};
use mediatag_core::status::{JobOutcome, RecognitionStatus};
use serde::Serialize;

use crate::MediaPipeline;

/// Record kinds that carry face-search job ids.
const JOB_KINDS: [MediaKind; 2] = [MediaKind::Video, MediaKind::VideoChunk];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub job_id: String,
    pub status: RecognitionStatus,
    /// Records carrying the job id.
    pub matched: usize,
    /// Records whose status changed.
    pub updated: usize,
    /// Records skipped because this notice was already applied to them.
    pub duplicates: usize,
}

impl MediaPipeline {
    /// Apply a job's reported status to every video and chunk carrying its
    /// job id.
    ///
    /// Each (record, job, status) transition is applied at most once; a
    /// redelivered notice only bumps `duplicates`. A record whose current
    /// status cannot move to the reported one (e.g. a late `FAILED` after
    /// `COMPLETED`) is left alone.
    pub async fn handle_job_completion(
        &self,
        notice: &JobCompletionNotice,
    ) -> CoreResult<CompletionOutcome> {
        let job_id = notice.job_id.trim();
        let outcome = JobOutcome::parse(&notice.status).ok_or_else(|| {
            CoreError::Validation(format!("Unknown job status '{}'", notice.status))
        })?;
        let target = outcome.target_status();

        let mut records = Vec::new();
        for kind in JOB_KINDS {
            records.extend(self.store.find_by_job_id(kind, job_id).await?);
        }

        let mut result = CompletionOutcome {
            job_id: job_id.to_string(),
            status: target,
            matched: records.len(),
            updated: 0,
            duplicates: 0,
        };

        match records.len() {
            0 => {
                tracing::warn!(
                    job_id,
                    job_tag = ?notice.job_tag,
                    "No video or chunk carries this job id",
                );
                return Ok(result);
            }
            1 => {}
            n => tracing::warn!(job_id, matched = n, "Job id shared by several records"),
        }

        for record in &records {
            let key = IdempotencyKey::for_job_transition(record.kind, &record.id, job_id, target);
            if self.ledger.contains(&key).await? {
                tracing::debug!(
                    job_id,
                    kind = %record.kind,
                    media_id = %record.id,
                    "Job notice already applied",
                );
                result.duplicates += 1;
                continue;
            }

            let mut update = StatusUpdate::to(target).expecting_job_id(job_id);
            if outcome == JobOutcome::Failed {
                update = update.with_failure_reason(format!(
                    "Face search job {job_id} reported {}",
                    notice.status
                ));
            }

            if self.store.update_status(record.kind, &record.id, &update).await? {
                result.updated += 1;
                tracing::info!(
                    job_id,
                    kind = %record.kind,
                    media_id = %record.id,
                    from = %record.status,
                    to = %target,
                    "Applied job status",
                );
            } else {
                tracing::info!(
                    job_id,
                    kind = %record.kind,
                    media_id = %record.id,
                    current = %record.status,
                    reported = %target,
                    "Job status not applicable to current record state",
                );
            }

            self.ledger.record(&key, SCOPE_JOB).await?;
        }

        Ok(result)
    }

    /// Handle one completion-queue message and delete it.
    ///
    /// The message is deleted whether or not it could be parsed or applied;
    /// failures are logged. Only a failed delete is returned as an error.
    pub async fn process_completion_message(
        &self,
        message: &ReceivedMessage,
    ) -> CoreResult<Option<CompletionOutcome>> {
        let outcome = match JobCompletionNotice::parse(&message.body) {
            Ok(notice) => match self.handle_job_completion(&notice).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::error!(
                        message_id = ?message.message_id,
                        job_id = %notice.job_id,
                        error = %e,
                        "Failed to apply job notice",
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    message_id = ?message.message_id,
                    error = %e,
                    "Discarding malformed job notice",
                );
                None
            }
        };

        self.completion_queue.delete(&message.receipt_handle).await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::testing::{media, Harness};

    fn with_job(kind: MediaKind, id: &str, status: RecognitionStatus, job: &str) -> Harness {
        let h = Harness::new();
        let mut record = media(kind, id, status);
        record.recognition_job_id = Some(job.into());
        h.store.insert(record);
        h
    }

    #[tokio::test]
    async fn succeeded_job_completes_its_video_only() {
        let h = with_job(MediaKind::Video, "v-1", RecognitionStatus::Processing, "job-1");
        let mut chunk = media(MediaKind::VideoChunk, "c-1", RecognitionStatus::Processing);
        chunk.recognition_job_id = Some("job-2".into());
        h.store.insert(chunk);

        let outcome = h
            .pipeline
            .handle_job_completion(&JobCompletionNotice::new("job-1", "SUCCEEDED"))
            .await
            .unwrap();

        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.updated, 1);
        assert_eq!(
            h.store.get(MediaKind::Video, "v-1").unwrap().status,
            RecognitionStatus::Completed
        );
        assert_eq!(
            h.store.get(MediaKind::VideoChunk, "c-1").unwrap().status,
            RecognitionStatus::Processing
        );
    }

    #[tokio::test]
    async fn chunk_jobs_are_reconciled_too() {
        let h = with_job(MediaKind::VideoChunk, "c-7", RecognitionStatus::Processing, "job-7");

        h.pipeline
            .handle_job_completion(&JobCompletionNotice::new("job-7", "FAILED"))
            .await
            .unwrap();

        let chunk = h.store.get(MediaKind::VideoChunk, "c-7").unwrap();
        assert_eq!(chunk.status, RecognitionStatus::Failed);
        assert!(h.store.failure_reason(MediaKind::VideoChunk, "c-7").is_some());
    }

    #[tokio::test]
    async fn every_record_sharing_the_job_is_updated() {
        let h = with_job(MediaKind::Video, "v-1", RecognitionStatus::Processing, "job-1");
        let mut chunk = media(MediaKind::VideoChunk, "c-1", RecognitionStatus::Processing);
        chunk.recognition_job_id = Some("job-1".into());
        h.store.insert(chunk);

        let outcome = h
            .pipeline
            .handle_job_completion(&JobCompletionNotice::new("job-1", "SUCCEEDED"))
            .await
            .unwrap();

        assert_eq!((outcome.matched, outcome.updated), (2, 2));
    }

    #[tokio::test]
    async fn redelivered_notice_is_a_no_op() {
        let h = with_job(MediaKind::Video, "v-1", RecognitionStatus::Processing, "job-1");
        let notice = JobCompletionNotice::new("job-1", "SUCCEEDED");

        h.pipeline.handle_job_completion(&notice).await.unwrap();
        let again = h.pipeline.handle_job_completion(&notice).await.unwrap();

        assert_eq!(again.updated, 0);
        assert_eq!(again.duplicates, 1);
        assert_eq!(h.ledger.len(), 1);
    }

    #[tokio::test]
    async fn late_failure_does_not_overwrite_completed() {
        let h = with_job(MediaKind::Video, "v-1", RecognitionStatus::Completed, "job-1");

        let outcome = h
            .pipeline
            .handle_job_completion(&JobCompletionNotice::new("job-1", "FAILED"))
            .await
            .unwrap();

        assert_eq!(outcome.updated, 0);
        assert_eq!(
            h.store.get(MediaKind::Video, "v-1").unwrap().status,
            RecognitionStatus::Completed
        );
    }

    #[tokio::test]
    async fn unknown_job_matches_nothing() {
        let h = Harness::new();
        let outcome = h
            .pipeline
            .handle_job_completion(&JobCompletionNotice::new("job-x", "SUCCEEDED"))
            .await
            .unwrap();
        assert_eq!(outcome.matched, 0);
        assert_eq!(h.ledger.len(), 0);
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let h = Harness::new();
        assert_matches!(
            h.pipeline
                .handle_job_completion(&JobCompletionNotice::new("job-1", "PAUSED"))
                .await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn consumed_message_is_always_deleted() {
        let h = with_job(MediaKind::Video, "v-1", RecognitionStatus::Processing, "job-1");
        let envelope = json!({
            "Type": "Notification",
            "Message": json!({"JobId": "job-1", "Status": "SUCCEEDED"}).to_string(),
        });

        let good = h.completion_queue.push_incoming(envelope.to_string());
        let malformed = h.completion_queue.push_incoming("not json");
        let unknown_status =
            h.completion_queue
                .push_incoming(r#"{"JobId":"job-1","Status":"PAUSED"}"#);

        for message in h.completion_queue.drain_incoming() {
            h.pipeline.process_completion_message(&message).await.unwrap();
        }

        assert_eq!(h.completion_queue.deleted(), vec![good, malformed, unknown_status]);
        assert_eq!(
            h.store.get(MediaKind::Video, "v-1").unwrap().status,
            RecognitionStatus::Completed
        );
    }

    #[tokio::test]
    async fn storage_failure_still_deletes_the_message() {
        let h = with_job(MediaKind::Video, "v-1", RecognitionStatus::Processing, "job-1");
        h.store.fail_with("connection reset");
        let receipt = h
            .completion_queue
            .push_incoming(r#"{"JobId":"job-1","Status":"SUCCEEDED"}"#);

        let message = h.completion_queue.drain_incoming().remove(0);
        let outcome = h.pipeline.process_completion_message(&message).await.unwrap();

        assert_eq!(outcome, None);
        assert_eq!(h.completion_queue.deleted(), vec![receipt]);
    }
}
