//! Repository for the `faces` table.

use mediatag_core::media::{DetectedFace, MediaKind};
use sqlx::PgPool;

use crate::models::face::Face;

const COLUMNS: &str = "id, media_kind, media_id, external_face_id, confidence, \
    bbox_left, bbox_top, bbox_width, bbox_height, person_id, created_at";

pub struct FaceRepo;

impl FaceRepo {
    /// Insert the faces indexed for one image in a single transaction.
    ///
    /// Faces already stored for the same image (same external face id) are
    /// skipped, so redelivered detection messages do not duplicate rows.
    /// Returns the number of rows inserted.
    pub async fn insert_many(
        pool: &PgPool,
        kind: MediaKind,
        media_id: &str,
        faces: &[DetectedFace],
    ) -> Result<usize, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut inserted = 0;

        for face in faces {
            let result = sqlx::query(
                "INSERT INTO faces \
                    (id, media_kind, media_id, external_face_id, confidence, \
                     bbox_left, bbox_top, bbox_width, bbox_height) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 ON CONFLICT (media_kind, media_id, external_face_id) DO NOTHING",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(kind.as_str())
            .bind(media_id)
            .bind(&face.external_face_id)
            .bind(face.confidence)
            .bind(face.bounding_box.left)
            .bind(face.bounding_box.top)
            .bind(face.bounding_box.width)
            .bind(face.bounding_box.height)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn list_by_media(
        pool: &PgPool,
        kind: MediaKind,
        media_id: &str,
    ) -> Result<Vec<Face>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM faces \
             WHERE media_kind = $1 AND media_id = $2 \
             ORDER BY confidence DESC"
        );
        sqlx::query_as::<_, Face>(&query)
            .bind(kind.as_str())
            .bind(media_id)
            .fetch_all(pool)
            .await
    }
}
