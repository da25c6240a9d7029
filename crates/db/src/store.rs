//! PostgreSQL adapters for the `mediatag-core` port traits.

use async_trait::async_trait;
use mediatag_core::error::{CoreError, CoreResult};
use mediatag_core::idempotency::IdempotencyKey;
use mediatag_core::media::{
    DetectedFace, MediaFilter, MediaKind, MediaRecord, StatusCount, StatusUpdate,
};
use mediatag_core::ports::{DeliveryLedger, MediaStore};
use mediatag_core::status::RecognitionStatus;

use crate::models::media::MediaRow;
use crate::repositories::{DeliveryRepo, FaceRepo, MediaRepo};
use crate::DbPool;

/// Map a database error onto the domain error. The message is logged by the
/// HTTP layer and never returned to clients.
fn storage(err: sqlx::Error) -> CoreError {
    CoreError::Storage(err.to_string())
}

fn into_records(kind: MediaKind, rows: Vec<MediaRow>) -> CoreResult<Vec<MediaRecord>> {
    rows.into_iter().map(|row| row.into_record(kind)).collect()
}

/// [`MediaStore`] backed by the media tables.
#[derive(Clone)]
pub struct PgMediaStore {
    pool: DbPool,
}

impl PgMediaStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn ping(&self) -> CoreResult<()> {
        crate::health_check(&self.pool).await.map_err(storage)
    }

    async fn find_media(&self, kind: MediaKind, id: &str) -> CoreResult<Option<MediaRecord>> {
        MediaRepo::find_by_id(&self.pool, kind, id)
            .await
            .map_err(storage)?
            .map(|row| row.into_record(kind))
            .transpose()
    }

    async fn list_detection_candidates(
        &self,
        kind: MediaKind,
        filter: &MediaFilter,
        after_id: Option<&str>,
        limit: usize,
    ) -> CoreResult<Vec<MediaRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = MediaRepo::list_detection_candidates(&self.pool, kind, filter, after_id, limit)
            .await
            .map_err(storage)?;
        into_records(kind, rows)
    }

    async fn find_by_job_id(&self, kind: MediaKind, job_id: &str) -> CoreResult<Vec<MediaRecord>> {
        let rows = MediaRepo::find_by_job_id(&self.pool, kind, job_id)
            .await
            .map_err(storage)?;
        into_records(kind, rows)
    }

    async fn update_status(
        &self,
        kind: MediaKind,
        id: &str,
        update: &StatusUpdate,
    ) -> CoreResult<bool> {
        MediaRepo::update_status(&self.pool, kind, id, update)
            .await
            .map_err(storage)
    }

    async fn record_faces(
        &self,
        kind: MediaKind,
        media_id: &str,
        faces: &[DetectedFace],
    ) -> CoreResult<usize> {
        FaceRepo::insert_many(&self.pool, kind, media_id, faces)
            .await
            .map_err(storage)
    }

    async fn status_summary(
        &self,
        kind: MediaKind,
        filter: &MediaFilter,
    ) -> CoreResult<Vec<StatusCount>> {
        let rows = MediaRepo::count_by_status(&self.pool, kind, filter)
            .await
            .map_err(storage)?;

        rows.into_iter()
            .map(|row| {
                let status = RecognitionStatus::from_id(row.status_id).ok_or_else(|| {
                    CoreError::Storage(format!("Unknown status_id {}", row.status_id))
                })?;
                Ok(StatusCount {
                    status,
                    count: row.count,
                })
            })
            .collect()
    }
}

/// [`DeliveryLedger`] backed by `processed_deliveries`.
#[derive(Clone)]
pub struct PgDeliveryLedger {
    pool: DbPool,
}

impl PgDeliveryLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryLedger for PgDeliveryLedger {
    async fn contains(&self, key: &IdempotencyKey) -> CoreResult<bool> {
        DeliveryRepo::exists(&self.pool, key.as_ref())
            .await
            .map_err(storage)
    }

    async fn record(&self, key: &IdempotencyKey, scope: &str) -> CoreResult<()> {
        let inserted = DeliveryRepo::insert(&self.pool, key.as_ref(), scope)
            .await
            .map_err(storage)?;
        if !inserted {
            tracing::debug!(key = %key, scope, "Idempotency key already recorded");
        }
        Ok(())
    }
}
