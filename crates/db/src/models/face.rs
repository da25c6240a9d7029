//! Face rows: one per face the vision service indexed in an image.

use mediatag_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `faces` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Face {
    pub id: String,
    pub media_kind: String,
    pub media_id: String,
    pub external_face_id: String,
    pub confidence: f32,
    pub bbox_left: f32,
    pub bbox_top: f32,
    pub bbox_width: f32,
    pub bbox_height: f32,
    pub person_id: Option<String>,
    pub created_at: Timestamp,
}
