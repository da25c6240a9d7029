//! Request and response types for the face-recognition port.

use serde::Serialize;

/// Where the vision service publishes job-completion notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    pub sns_topic_arn: String,
    pub role_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCreated {
    pub collection_arn: Option<String>,
    pub status_code: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub face_count: i64,
}

/// An asynchronous face search of a stored video against a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceSearchJob {
    pub bucket_name: String,
    pub video_name: String,
    pub collection_id: String,
    pub notification: Option<NotificationChannel>,
    /// Echoed back in the completion notice as `JobTag`.
    pub job_tag: Option<String>,
    /// Repeated starts with the same token return the same job id.
    pub client_request_token: Option<String>,
}

/// Detect faces in a stored image and add them to a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFacesRequest {
    pub collection_id: String,
    pub bucket_name: String,
    pub s3_key: String,
    /// Stored with every indexed face so search hits map back to the image.
    pub external_image_id: String,
    pub max_faces: i32,
}
