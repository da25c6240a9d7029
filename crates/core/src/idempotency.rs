//! Deterministic idempotency keys.
//!
//! A key is the SHA-256 hex digest of a scope name followed by the parts that
//! identify one unit of work. Each part is length-prefixed so that
//! `("ab", "c")` and `("a", "bc")` never collide.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::media::MediaKind;
use crate::status::RecognitionStatus;

/// Ledger scope for enqueue keys.
pub const SCOPE_ENQUEUE: &str = "enqueue";
/// Ledger scope for job-completion transitions.
pub const SCOPE_JOB: &str = "job";
/// Ledger scope for processed detection messages.
pub const SCOPE_DETECT: &str = "detect";
/// Scope for face-search start tokens.
pub const SCOPE_SEARCH: &str = "search";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Key for queueing one media record against one collection.
    pub fn for_enqueue(kind: MediaKind, media_id: &str, collection_id: &str) -> Self {
        Self::derive(SCOPE_ENQUEUE, &[kind.as_str(), media_id, collection_id])
    }

    /// Key for applying a job's reported status to one media record.
    pub fn for_job_transition(
        kind: MediaKind,
        media_id: &str,
        job_id: &str,
        target: RecognitionStatus,
    ) -> Self {
        Self::derive(
            SCOPE_JOB,
            &[kind.as_str(), media_id, job_id, target.as_str()],
        )
    }

    /// Key for handling one send of a detection message, shared by its
    /// redeliveries.
    pub fn for_detection(kind: MediaKind, media_id: &str, delivery_id: &str) -> Self {
        Self::derive(SCOPE_DETECT, &[kind.as_str(), media_id, delivery_id])
    }

    /// Token for starting a face search of one video against one collection.
    /// `failed_job` is the job a retry replaces, if any.
    pub fn for_face_search(
        bucket_name: &str,
        video_name: &str,
        collection_id: &str,
        failed_job: Option<&str>,
    ) -> Self {
        match failed_job {
            Some(job_id) => {
                Self::derive(SCOPE_SEARCH, &[bucket_name, video_name, collection_id, job_id])
            }
            None => Self::derive(SCOPE_SEARCH, &[bucket_name, video_name, collection_id]),
        }
    }

    /// Wrap a key previously produced by one of the constructors (e.g. read
    /// back from the ledger or a message body).
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    fn derive(scope: &str, parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in std::iter::once(&scope).chain(parts) {
            hasher.update(part.len().to_string().as_bytes());
            hasher.update(b":");
            hasher.update(part.as_bytes());
            hasher.update(b"|");
        }
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_give_same_key() {
        let a = IdempotencyKey::for_enqueue(MediaKind::Photo, "p-1", "event-9");
        let b = IdempotencyKey::for_enqueue(MediaKind::Photo, "p-1", "event-9");
        assert_eq!(a, b);
        assert_eq!(a.as_ref().len(), 64);
    }

    #[test]
    fn kind_is_part_of_the_key() {
        let photo = IdempotencyKey::for_enqueue(MediaKind::Photo, "x", "c");
        let frame = IdempotencyKey::for_enqueue(MediaKind::Frame, "x", "c");
        assert_ne!(photo, frame);
    }

    #[test]
    fn part_boundaries_do_not_collide() {
        let a = IdempotencyKey::for_enqueue(MediaKind::Photo, "ab", "c");
        let b = IdempotencyKey::for_enqueue(MediaKind::Photo, "a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn scopes_do_not_collide() {
        let detect = IdempotencyKey::for_detection(MediaKind::Photo, "p", "c");
        let enqueue = IdempotencyKey::for_enqueue(MediaKind::Photo, "p", "c");
        assert_ne!(detect, enqueue);
    }

    #[test]
    fn search_retry_gets_a_new_token() {
        let first = IdempotencyKey::for_face_search("media", "v.mp4", "c", None);
        let again = IdempotencyKey::for_face_search("media", "v.mp4", "c", None);
        let retry = IdempotencyKey::for_face_search("media", "v.mp4", "c", Some("job-1"));
        assert_eq!(first, again);
        assert_ne!(first, retry);
    }

    #[test]
    fn target_status_is_part_of_job_key() {
        let done = IdempotencyKey::for_job_transition(
            MediaKind::Video,
            "v-1",
            "job-1",
            RecognitionStatus::Completed,
        );
        let running = IdempotencyKey::for_job_transition(
            MediaKind::Video,
            "v-1",
            "job-1",
            RecognitionStatus::Processing,
        );
        assert_ne!(done, running);
    }
}
