//! Repository for the four media tables.
//!
//! The tables share their recognition columns, so one repository serves all
//! of them; the [`MediaKind`] picks the table. Photos and videos have no
//! `video_id` column and select `NULL` in its place.

use mediatag_core::media::{MediaFilter, MediaKind, StatusUpdate};
use mediatag_core::status::{RecognitionStatus, StatusId, ALL_STATUSES};
use sqlx::PgPool;

use crate::models::media::{CreateMedia, MediaRow, StatusCountRow};

/// Maximum page size for candidate listing.
const MAX_LIMIT: i64 = 500;

/// Table name for each media kind. Only these literals are ever formatted
/// into SQL.
fn table(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Photo => "photos",
        MediaKind::Frame => "frames",
        MediaKind::Video => "videos",
        MediaKind::VideoChunk => "video_chunks",
    }
}

fn has_parent_video(kind: MediaKind) -> bool {
    matches!(kind, MediaKind::Frame | MediaKind::VideoChunk)
}

/// Column list for `kind`.
fn columns(kind: MediaKind) -> String {
    let video_id = if has_parent_video(kind) {
        "video_id"
    } else {
        "NULL::TEXT AS video_id"
    };
    format!(
        "id, user_id, event_id, {video_id}, bucket_name, s3_key, status_id, \
         recognition_job_id, face_count, failure_reason, is_archived, created_at, updated_at"
    )
}

fn enqueueable_status_ids() -> Vec<StatusId> {
    ALL_STATUSES
        .into_iter()
        .filter(|s| s.is_enqueueable())
        .map(RecognitionStatus::id)
        .collect()
}

/// Provides CRUD and status-transition operations for media rows.
pub struct MediaRepo;

impl MediaRepo {
    /// Insert a media row. `video_id` is only written for frames and chunks.
    pub async fn create(
        pool: &PgPool,
        kind: MediaKind,
        input: &CreateMedia,
    ) -> Result<MediaRow, sqlx::Error> {
        let id = input
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let status = input.status.unwrap_or(RecognitionStatus::Uploaded).id();
        let table = table(kind);
        let cols = columns(kind);

        if has_parent_video(kind) {
            let query = format!(
                "INSERT INTO {table} \
                    (id, user_id, event_id, video_id, bucket_name, s3_key, status_id, recognition_job_id) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 RETURNING {cols}"
            );
            sqlx::query_as::<_, MediaRow>(&query)
                .bind(&id)
                .bind(&input.user_id)
                .bind(&input.event_id)
                .bind(&input.video_id)
                .bind(&input.bucket_name)
                .bind(&input.s3_key)
                .bind(status)
                .bind(&input.recognition_job_id)
                .fetch_one(pool)
                .await
        } else {
            let query = format!(
                "INSERT INTO {table} \
                    (id, user_id, event_id, bucket_name, s3_key, status_id, recognition_job_id) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 RETURNING {cols}"
            );
            sqlx::query_as::<_, MediaRow>(&query)
                .bind(&id)
                .bind(&input.user_id)
                .bind(&input.event_id)
                .bind(&input.bucket_name)
                .bind(&input.s3_key)
                .bind(status)
                .bind(&input.recognition_job_id)
                .fetch_one(pool)
                .await
        }
    }

    pub async fn find_by_id(
        pool: &PgPool,
        kind: MediaKind,
        id: &str,
    ) -> Result<Option<MediaRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1",
            columns(kind),
            table(kind)
        );
        sqlx::query_as::<_, MediaRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Keyset page of records eligible for detection: owned by `filter`, not
    /// archived, in an enqueueable status, id strictly greater than
    /// `after_id`.
    ///
    /// Keyset (rather than offset) paging keeps the walk stable while the
    /// caller flips already-visited rows to `PENDING`.
    pub async fn list_detection_candidates(
        pool: &PgPool,
        kind: MediaKind,
        filter: &MediaFilter,
        after_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<MediaRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} \
             WHERE user_id = $1 AND event_id = $2 \
               AND is_archived = FALSE \
               AND status_id = ANY($3) \
               AND ($4::TEXT IS NULL OR id > $4) \
             ORDER BY id ASC \
             LIMIT $5",
            columns(kind),
            table(kind)
        );
        sqlx::query_as::<_, MediaRow>(&query)
            .bind(&filter.user_id)
            .bind(&filter.event_id)
            .bind(enqueueable_status_ids())
            .bind(after_id)
            .bind(limit.clamp(1, MAX_LIMIT))
            .fetch_all(pool)
            .await
    }

    /// All rows carrying `job_id`, oldest first.
    pub async fn find_by_job_id(
        pool: &PgPool,
        kind: MediaKind,
        job_id: &str,
    ) -> Result<Vec<MediaRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} WHERE recognition_job_id = $1 ORDER BY created_at ASC, id ASC",
            columns(kind),
            table(kind)
        );
        sqlx::query_as::<_, MediaRow>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// Conditionally apply a status update.
    ///
    /// The row changes only if its current status may transition to
    /// `update.status` and, when `update.expected_job_id` is set, it still
    /// carries that job id. `failure_reason` is overwritten (cleared on
    /// success); `recognition_job_id` and `face_count` keep their stored
    /// values when the update leaves them `None`.
    pub async fn update_status(
        pool: &PgPool,
        kind: MediaKind,
        id: &str,
        update: &StatusUpdate,
    ) -> Result<bool, sqlx::Error> {
        let sources: Vec<StatusId> = RecognitionStatus::sources_for(update.status)
            .into_iter()
            .map(RecognitionStatus::id)
            .collect();

        let query = format!(
            "UPDATE {} SET \
                status_id = $2, \
                recognition_job_id = COALESCE($3, recognition_job_id), \
                face_count = COALESCE($4, face_count), \
                failure_reason = $5, \
                updated_at = NOW() \
             WHERE id = $1 \
               AND status_id = ANY($6) \
               AND ($7::TEXT IS NULL OR recognition_job_id = $7)",
            table(kind)
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(update.status.id())
            .bind(&update.job_id)
            .bind(update.face_count)
            .bind(&update.failure_reason)
            .bind(sources)
            .bind(&update.expected_job_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a row archived. Archived rows are skipped by bulk enqueue.
    pub async fn archive(pool: &PgPool, kind: MediaKind, id: &str) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET is_archived = TRUE, updated_at = NOW() \
             WHERE id = $1 AND is_archived = FALSE",
            table(kind)
        );
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count non-archived rows per status for one user's event.
    pub async fn count_by_status(
        pool: &PgPool,
        kind: MediaKind,
        filter: &MediaFilter,
    ) -> Result<Vec<StatusCountRow>, sqlx::Error> {
        let query = format!(
            "SELECT status_id, COUNT(*) AS count FROM {} \
             WHERE user_id = $1 AND event_id = $2 AND is_archived = FALSE \
             GROUP BY status_id \
             ORDER BY status_id",
            table(kind)
        );
        sqlx::query_as::<_, StatusCountRow>(&query)
            .bind(&filter.user_id)
            .bind(&filter.event_id)
            .fetch_all(pool)
            .await
    }
}
