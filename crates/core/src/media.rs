//! Media records as seen by the orchestration layer.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::RecognitionStatus;
use crate::types::RecordId;

/// The four media tables that carry a recognition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Frame,
    Video,
    VideoChunk,
}

impl MediaKind {
    /// Stable lower-case name, used in idempotency keys and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Frame => "frame",
            Self::Video => "video",
            Self::VideoChunk => "video_chunk",
        }
    }

    /// Inverse of [`as_str`](Self::as_str), case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "photo" => Some(Self::Photo),
            "frame" => Some(Self::Frame),
            "video" => Some(Self::Video),
            "video_chunk" => Some(Self::VideoChunk),
            _ => None,
        }
    }

    /// Entity name used in `NotFound` errors.
    pub fn entity(self) -> &'static str {
        match self {
            Self::Photo => "Photo",
            Self::Frame => "Frame",
            Self::Video => "Video",
            Self::VideoChunk => "VideoChunk",
        }
    }

    /// Still images go through the detection queue; videos and chunks go
    /// through asynchronous face-search jobs.
    pub fn is_image(self) -> bool {
        matches!(self, Self::Photo | Self::Frame)
    }

    /// Build the `NotFound` error for a record of this kind.
    pub fn not_found(self, id: &str) -> CoreError {
        CoreError::NotFound {
            entity: self.entity(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `sourceType` of a detection message. Only still images are queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Photo,
    Frame,
}

impl SourceType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PHOTO" => Some(Self::Photo),
            "FRAME" => Some(Self::Frame),
            _ => None,
        }
    }

    pub fn media_kind(self) -> MediaKind {
        match self {
            Self::Photo => MediaKind::Photo,
            Self::Frame => MediaKind::Frame,
        }
    }
}

impl TryFrom<MediaKind> for SourceType {
    type Error = CoreError;

    fn try_from(kind: MediaKind) -> Result<Self, Self::Error> {
        match kind {
            MediaKind::Photo => Ok(Self::Photo),
            MediaKind::Frame => Ok(Self::Frame),
            other => Err(CoreError::Validation(format!(
                "{other} records are not sent through the detection queue"
            ))),
        }
    }
}

/// One row from any of the media tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub kind: MediaKind,
    pub id: RecordId,
    pub user_id: RecordId,
    pub event_id: RecordId,
    /// Parent video for frames and chunks.
    pub video_id: Option<RecordId>,
    pub bucket_name: String,
    pub s3_key: String,
    pub status: RecognitionStatus,
    pub recognition_job_id: Option<String>,
    pub face_count: Option<i32>,
    pub is_archived: bool,
}

/// Ownership filter used by bulk operations and status summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFilter {
    pub user_id: RecordId,
    pub event_id: RecordId,
}

/// A status write. The store applies it only when the current status may
/// transition to `status` (and, when set, the record still carries
/// `expected_job_id`).
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: RecognitionStatus,
    /// New job id; `None` keeps the stored one.
    pub job_id: Option<String>,
    pub expected_job_id: Option<String>,
    pub face_count: Option<i32>,
    pub failure_reason: Option<String>,
}

impl StatusUpdate {
    pub fn to(status: RecognitionStatus) -> Self {
        Self {
            status,
            job_id: None,
            expected_job_id: None,
            face_count: None,
            failure_reason: None,
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn expecting_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.expected_job_id = Some(job_id.into());
        self
    }

    pub fn with_face_count(mut self, count: i32) -> Self {
        self.face_count = Some(count);
        self
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }
}

/// Axis-aligned box, as ratios of the image width/height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// A face found and indexed by the vision service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    pub external_face_id: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// Number of records of one kind in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: RecognitionStatus,
    pub count: i64,
}
