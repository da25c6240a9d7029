//! Request bodies accepted by the HTTP surface.
//!
//! Every field is optional at the serde level so a missing field turns into a
//! validation error (HTTP 400) rather than a deserialization rejection. Each
//! request converts into a validated form whose fields are plain strings.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{CoreError, CoreResult};
use crate::media::{MediaKind, MediaFilter, SourceType};
use crate::validation::{required, validate_collection_id};

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// `{collectionId}` body shared by the collection endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRequest {
    #[validate(required(message = "collectionId is required"))]
    pub collection_id: Option<String>,
}

impl CollectionRequest {
    /// Validate and return the collection id.
    pub fn into_collection_id(self) -> CoreResult<String> {
        self.validate()?;
        let id = required(&self.collection_id, "collectionId")?;
        validate_collection_id(id)?;
        Ok(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Video face search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VideoSearchRequest {
    #[validate(required(message = "bucketName is required"))]
    pub bucket_name: Option<String>,
    #[validate(required(message = "videoName is required"))]
    pub video_name: Option<String>,
    #[validate(required(message = "collectionId is required"))]
    pub collection_id: Option<String>,
    /// Video whose status and job id should track this search.
    pub video_id: Option<String>,
    /// Video chunk whose status and job id should track this search.
    pub video_chunk_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSearch {
    pub bucket_name: String,
    pub video_name: String,
    pub collection_id: String,
    /// Record to mark `PROCESSING` with the returned job id.
    pub target: Option<(MediaKind, String)>,
}

impl VideoSearchRequest {
    pub fn into_validated(self) -> CoreResult<VideoSearch> {
        self.validate()?;
        let collection_id = required(&self.collection_id, "collectionId")?.to_string();
        validate_collection_id(&collection_id)?;

        let target = match (non_blank(self.video_id), non_blank(self.video_chunk_id)) {
            (Some(_), Some(_)) => {
                return Err(CoreError::Validation(
                    "Provide either videoId or videoChunkId, not both".into(),
                ))
            }
            (Some(id), None) => Some((MediaKind::Video, id)),
            (None, Some(id)) => Some((MediaKind::VideoChunk, id)),
            (None, None) => None,
        };

        Ok(VideoSearch {
            bucket_name: required(&self.bucket_name, "bucketName")?.to_string(),
            video_name: required(&self.video_name, "videoName")?.to_string(),
            collection_id,
            target,
        })
    }
}

// ---------------------------------------------------------------------------
// Single-item detection enqueue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRequest {
    #[validate(required(message = "userId is required"))]
    pub user_id: Option<String>,
    #[validate(required(message = "eventId is required"))]
    pub event_id: Option<String>,
    #[validate(required(message = "sourceType is required"))]
    pub source_type: Option<String>,
    pub photo_id: Option<String>,
    pub frame_id: Option<String>,
    pub video_id: Option<String>,
    #[validate(required(message = "rekognitionCollectionId is required"))]
    pub rekognition_collection_id: Option<String>,
    #[validate(required(message = "bucketName is required"))]
    pub bucket_name: Option<String>,
    #[validate(required(message = "s3Key is required"))]
    pub s3_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub user_id: String,
    pub event_id: String,
    pub source_type: SourceType,
    /// Photo id for `PHOTO`, frame id for `FRAME`.
    pub media_id: String,
    pub video_id: Option<String>,
    pub collection_id: String,
    pub bucket_name: String,
    pub s3_key: String,
}

impl DetectionRequest {
    pub fn into_validated(self) -> CoreResult<Detection> {
        self.validate()?;

        let raw_source = required(&self.source_type, "sourceType")?;
        let source_type = SourceType::parse(raw_source).ok_or_else(|| {
            CoreError::Validation(format!(
                "sourceType must be PHOTO or FRAME (got '{raw_source}')"
            ))
        })?;

        let media_id = match source_type {
            SourceType::Photo => required(&self.photo_id, "photoId")?,
            SourceType::Frame => required(&self.frame_id, "frameId")?,
        }
        .to_string();

        let collection_id = required(&self.rekognition_collection_id, "rekognitionCollectionId")?;
        validate_collection_id(collection_id)?;

        Ok(Detection {
            user_id: required(&self.user_id, "userId")?.to_string(),
            event_id: required(&self.event_id, "eventId")?.to_string(),
            source_type,
            media_id,
            video_id: non_blank(self.video_id),
            collection_id: collection_id.to_string(),
            bucket_name: required(&self.bucket_name, "bucketName")?.to_string(),
            s3_key: required(&self.s3_key, "s3Key")?.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Bulk detection enqueue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkDetectionRequest {
    #[validate(required(message = "userId is required"))]
    pub user_id: Option<String>,
    #[validate(required(message = "eventId is required"))]
    pub event_id: Option<String>,
    #[validate(required(message = "bucketName is required"))]
    pub bucket_name: Option<String>,
    #[validate(required(message = "rekognitionCollectionId is required"))]
    pub rekognition_collection_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDetection {
    pub filter: MediaFilter,
    pub bucket_name: String,
    pub collection_id: String,
}

impl BulkDetectionRequest {
    pub fn into_validated(self) -> CoreResult<BulkDetection> {
        self.validate()?;
        let collection_id = required(&self.rekognition_collection_id, "rekognitionCollectionId")?;
        validate_collection_id(collection_id)?;

        Ok(BulkDetection {
            filter: MediaFilter {
                user_id: required(&self.user_id, "userId")?.to_string(),
                event_id: required(&self.event_id, "eventId")?.to_string(),
            },
            bucket_name: required(&self.bucket_name, "bucketName")?.to_string(),
            collection_id: collection_id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Status summary
// ---------------------------------------------------------------------------

/// `?kind=&userId=&eventId=` query of the status summary endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    #[validate(required(message = "kind is required"))]
    pub kind: Option<String>,
    #[validate(required(message = "userId is required"))]
    pub user_id: Option<String>,
    #[validate(required(message = "eventId is required"))]
    pub event_id: Option<String>,
}

impl StatusQuery {
    pub fn into_validated(self) -> CoreResult<(MediaKind, MediaFilter)> {
        self.validate()?;
        let raw_kind = required(&self.kind, "kind")?;
        let kind = MediaKind::parse(raw_kind).ok_or_else(|| {
            CoreError::Validation(format!(
                "kind must be photo, frame, video or video_chunk (got '{raw_kind}')"
            ))
        })?;
        Ok((
            kind,
            MediaFilter {
                user_id: required(&self.user_id, "userId")?.to_string(),
                event_id: required(&self.event_id, "eventId")?.to_string(),
            },
        ))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn bulk() -> BulkDetectionRequest {
        BulkDetectionRequest {
            user_id: Some("u-1".into()),
            event_id: Some("e-1".into()),
            bucket_name: Some("media".into()),
            rekognition_collection_id: Some("event-e-1".into()),
        }
    }

    #[test]
    fn bulk_request_validates() {
        let validated = bulk().into_validated().unwrap();
        assert_eq!(validated.filter.user_id, "u-1");
        assert_eq!(validated.filter.event_id, "e-1");
        assert_eq!(validated.collection_id, "event-e-1");
    }

    #[test]
    fn bulk_request_missing_user_id_names_the_field() {
        let request = BulkDetectionRequest {
            user_id: None,
            ..bulk()
        };
        assert_matches!(
            request.into_validated(),
            Err(CoreError::Validation(m)) if m.contains("userId is required")
        );
    }

    #[test]
    fn bulk_request_missing_both_ids_lists_both() {
        let request = BulkDetectionRequest {
            user_id: None,
            event_id: None,
            ..bulk()
        };
        let err = request.into_validated().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("userId is required"), "{message}");
        assert!(message.contains("eventId is required"), "{message}");
    }

    #[test]
    fn blank_event_id_is_rejected() {
        let request = BulkDetectionRequest {
            event_id: Some(String::new()),
            ..bulk()
        };
        assert_matches!(request.into_validated(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn detection_request_requires_matching_media_id() {
        let request = DetectionRequest {
            user_id: Some("u".into()),
            event_id: Some("e".into()),
            source_type: Some("FRAME".into()),
            photo_id: Some("p-1".into()),
            frame_id: None,
            video_id: None,
            rekognition_collection_id: Some("c".into()),
            bucket_name: Some("b".into()),
            s3_key: Some("k".into()),
        };
        assert_matches!(
            request.into_validated(),
            Err(CoreError::Validation(m)) if m == "frameId is required"
        );
    }

    #[test]
    fn detection_request_rejects_video_source() {
        let request = DetectionRequest {
            user_id: Some("u".into()),
            event_id: Some("e".into()),
            source_type: Some("VIDEO".into()),
            video_id: Some("v".into()),
            rekognition_collection_id: Some("c".into()),
            bucket_name: Some("b".into()),
            s3_key: Some("k".into()),
            ..Default::default()
        };
        assert_matches!(request.into_validated(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn video_search_picks_chunk_target() {
        let request = VideoSearchRequest {
            bucket_name: Some("b".into()),
            video_name: Some("v.mp4".into()),
            collection_id: Some("c".into()),
            video_id: None,
            video_chunk_id: Some("chunk-1".into()),
        };
        let validated = request.into_validated().unwrap();
        assert_eq!(
            validated.target,
            Some((MediaKind::VideoChunk, "chunk-1".to_string()))
        );
    }

    #[test]
    fn status_query_parses_kind() {
        let query = StatusQuery {
            kind: Some("video_chunk".into()),
            user_id: Some("u".into()),
            event_id: Some("e".into()),
        };
        let (kind, filter) = query.into_validated().unwrap();
        assert_eq!(kind, MediaKind::VideoChunk);
        assert_eq!(filter.event_id, "e");

        let unknown = StatusQuery {
            kind: Some("audio".into()),
            user_id: Some("u".into()),
            event_id: Some("e".into()),
        };
        assert_matches!(unknown.into_validated(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn collection_request_checks_characters() {
        let request = CollectionRequest {
            collection_id: Some("bad id".into()),
        };
        assert_matches!(request.into_collection_id(), Err(CoreError::Validation(_)));
    }
}
