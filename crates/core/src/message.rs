//! Queue message shapes.
//!
//! Two queues are involved:
//!
//! - the detection queue carries one [`DetectionMessage`] per still image;
//! - the completion queue carries [`JobCompletionNotice`]s published by the
//!   vision service, either bare or wrapped in an SNS envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::idempotency::IdempotencyKey;
use crate::media::{MediaKind, SourceType};

// ---------------------------------------------------------------------------
// Detection queue
// ---------------------------------------------------------------------------

/// Body of a detection-queue message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionMessage {
    pub user_id: String,
    pub event_id: String,
    pub source_type: SourceType,
    pub photo_id: Option<String>,
    pub frame_id: Option<String>,
    pub video_id: Option<String>,
    pub rekognition_collection_id: String,
    pub bucket_name: String,
    pub s3_key: String,
    pub idempotency_key: IdempotencyKey,
    /// Fresh for every send. Redeliveries of one send share it; a later
    /// enqueue of the same record does not.
    pub delivery_id: String,
}

impl DetectionMessage {
    /// Parse a message body received from the detection queue.
    pub fn parse(body: &str) -> CoreResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| CoreError::Validation(format!("Malformed detection message: {e}")))
    }

    /// The record this message refers to.
    pub fn media(&self) -> CoreResult<(MediaKind, &str)> {
        let id = match self.source_type {
            SourceType::Photo => self.photo_id.as_deref(),
            SourceType::Frame => self.frame_id.as_deref(),
        };
        let kind = self.source_type.media_kind();
        id.filter(|id| !id.is_empty())
            .map(|id| (kind, id))
            .ok_or_else(|| {
                CoreError::Validation(format!("Detection message for a {kind} has no {kind} id"))
            })
    }

    pub fn to_body(&self) -> CoreResult<String> {
        serde_json::to_string(self)
            .map_err(|e| CoreError::Internal(format!("Failed to encode detection message: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Completion queue
// ---------------------------------------------------------------------------

/// Job status report published by the vision service when an asynchronous
/// job finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCompletionNotice {
    #[serde(rename = "JobId")]
    pub job_id: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "API", default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(rename = "JobTag", default, skip_serializing_if = "Option::is_none")]
    pub job_tag: Option<String>,
}

impl JobCompletionNotice {
    pub fn new(job_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: status.into(),
            api: None,
            job_tag: None,
        }
    }

    /// Parse a raw queue body.
    pub fn parse(body: &str) -> CoreResult<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| CoreError::Validation(format!("Malformed job notice: {e}")))?;
        Self::from_value(value)
    }

    /// Accept either the notice itself or an SNS envelope whose `Message`
    /// field holds the notice as a JSON string.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        let notice: Self = match value.get("Message").and_then(Value::as_str) {
            Some(inner) => serde_json::from_str(inner),
            None => serde_json::from_value(value),
        }
        .map_err(|e| CoreError::Validation(format!("Malformed job notice: {e}")))?;

        if notice.job_id.trim().is_empty() {
            return Err(CoreError::Validation("JobId must not be empty".into()));
        }
        Ok(notice)
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A message about to be sent. `id` identifies the entry inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub id: String,
    pub body: String,
    pub idempotency_key: Option<IdempotencyKey>,
}

/// A message received from a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: Option<String>,
    pub receipt_handle: String,
    pub body: String,
}

/// One batch entry the queue rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub id: String,
    pub reason: String,
}

/// Result of one batch send: accepted entry ids and rejected entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSendOutcome {
    pub sent: Vec<String>,
    pub failed: Vec<FailedEntry>,
}
