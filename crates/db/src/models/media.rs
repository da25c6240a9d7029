//! Row model shared by the `photos`, `frames`, `videos` and `video_chunks`
//! tables.

use mediatag_core::error::CoreError;
use mediatag_core::media::{MediaKind, MediaRecord};
use mediatag_core::status::{RecognitionStatus, StatusId};
use mediatag_core::types::Timestamp;
use serde::Deserialize;
use sqlx::FromRow;

/// A row from one of the media tables. `video_id` is always `NULL` for
/// photos and videos.
#[derive(Debug, Clone, FromRow)]
pub struct MediaRow {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub video_id: Option<String>,
    pub bucket_name: String,
    pub s3_key: String,
    pub status_id: StatusId,
    pub recognition_job_id: Option<String>,
    pub face_count: Option<i32>,
    pub failure_reason: Option<String>,
    pub is_archived: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MediaRow {
    /// Convert into the domain record. Fails on a status id missing from the
    /// lookup table, which would mean the schema and code disagree.
    pub fn into_record(self, kind: MediaKind) -> Result<MediaRecord, CoreError> {
        let status = RecognitionStatus::from_id(self.status_id).ok_or_else(|| {
            CoreError::Storage(format!(
                "{kind} {} has unknown status_id {}",
                self.id, self.status_id
            ))
        })?;

        Ok(MediaRecord {
            kind,
            id: self.id,
            user_id: self.user_id,
            event_id: self.event_id,
            video_id: self.video_id,
            bucket_name: self.bucket_name,
            s3_key: self.s3_key,
            status,
            recognition_job_id: self.recognition_job_id,
            face_count: self.face_count,
            is_archived: self.is_archived,
        })
    }
}

/// DTO for inserting a media row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedia {
    /// Generated when absent.
    pub id: Option<String>,
    pub user_id: String,
    pub event_id: String,
    /// Required for frames and video chunks, ignored otherwise.
    pub video_id: Option<String>,
    pub bucket_name: String,
    pub s3_key: String,
    /// Defaults to `UPLOADED`.
    pub status: Option<RecognitionStatus>,
    pub recognition_job_id: Option<String>,
}

/// One `GROUP BY status_id` row.
#[derive(Debug, Clone, FromRow)]
pub struct StatusCountRow {
    pub status_id: StatusId,
    pub count: i64,
}
