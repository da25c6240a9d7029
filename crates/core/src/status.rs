//! Recognition status shared by photos, frames, videos and video chunks.
//!
//! Discriminants match the seed rows of the `recognition_statuses` lookup
//! table (1-based SMALLSERIAL). Historical records and callers used several
//! spellings for the same state (`processed`, `COMPLETED`, `SUCCEEDED`...);
//! [`RecognitionStatus::parse_legacy`] is the single mapping table for them.

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// Face-recognition lifecycle of a media record.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecognitionStatus {
    Uploaded = 1,
    Pending = 2,
    Processing = 3,
    Completed = 4,
    Failed = 5,
}

/// Every status, in seed-data order.
pub const ALL_STATUSES: [RecognitionStatus; 5] = [
    RecognitionStatus::Uploaded,
    RecognitionStatus::Pending,
    RecognitionStatus::Processing,
    RecognitionStatus::Completed,
    RecognitionStatus::Failed,
];

/// Legacy spelling -> status. Keys are compared after trimming and
/// lower-casing the input.
const LEGACY_SPELLINGS: &[(&str, RecognitionStatus)] = &[
    ("uploaded", RecognitionStatus::Uploaded),
    ("pending", RecognitionStatus::Pending),
    ("queued", RecognitionStatus::Pending),
    ("processing", RecognitionStatus::Processing),
    ("in_progress", RecognitionStatus::Processing),
    ("completed", RecognitionStatus::Completed),
    ("processed", RecognitionStatus::Completed),
    ("succeeded", RecognitionStatus::Completed),
    ("failed", RecognitionStatus::Failed),
    ("error", RecognitionStatus::Failed),
];

impl RecognitionStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Look up a status by its database ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        ALL_STATUSES.into_iter().find(|s| s.id() == id)
    }

    /// Canonical upper-case wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "UPLOADED",
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Map any historical spelling onto the closed enum.
    pub fn parse_legacy(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        LEGACY_SPELLINGS
            .iter()
            .find(|(spelling, _)| *spelling == normalized)
            .map(|(_, status)| *status)
    }

    /// Statuses reachable from `self`.
    ///
    /// `Processing -> Processing` covers a fresh job replacing one that never
    /// reported back. `Completed` can only be re-opened for a new run, never
    /// overwritten by a late failure.
    pub fn valid_transitions(self) -> &'static [RecognitionStatus] {
        use RecognitionStatus::*;
        match self {
            Uploaded => &[Pending, Processing, Completed, Failed],
            Pending => &[Processing, Completed, Failed],
            Processing => &[Processing, Completed, Failed],
            Completed => &[Pending, Processing],
            Failed => &[Pending, Processing, Completed],
        }
    }

    /// Check whether a transition from `self` to `to` is valid.
    pub fn can_transition(self, to: RecognitionStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Statuses from which `to` may be entered. Used to build conditional
    /// `UPDATE ... WHERE status_id = ANY(..)` statements.
    pub fn sources_for(to: RecognitionStatus) -> Vec<RecognitionStatus> {
        ALL_STATUSES
            .into_iter()
            .filter(|from| from.can_transition(to))
            .collect()
    }

    /// Records in these states are picked up by bulk enqueue.
    pub fn is_enqueueable(self) -> bool {
        matches!(self, Self::Uploaded | Self::Failed)
    }

    /// Work has been handed to the queue or the vision service and has not
    /// reported back yet.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl std::fmt::Display for RecognitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RecognitionStatus> for StatusId {
    fn from(value: RecognitionStatus) -> Self {
        value as StatusId
    }
}

/// Terminal job states reported by the vision service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    InProgress,
}

impl JobOutcome {
    /// Parse the `Status` field of a job-completion notice.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" | "ERROR" => Some(Self::Failed),
            "IN_PROGRESS" => Some(Self::InProgress),
            _ => None,
        }
    }

    /// The media status this outcome settles on.
    pub fn target_status(self) -> RecognitionStatus {
        match self {
            Self::Succeeded => RecognitionStatus::Completed,
            Self::Failed => RecognitionStatus::Failed,
            Self::InProgress => RecognitionStatus::Processing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ids_match_seed_data() {
        assert_eq!(RecognitionStatus::Uploaded.id(), 1);
        assert_eq!(RecognitionStatus::Pending.id(), 2);
        assert_eq!(RecognitionStatus::Processing.id(), 3);
        assert_eq!(RecognitionStatus::Completed.id(), 4);
        assert_eq!(RecognitionStatus::Failed.id(), 5);
    }

    #[test]
    fn from_id_round_trips_every_status() {
        for status in ALL_STATUSES {
            assert_eq!(RecognitionStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(RecognitionStatus::from_id(0), None);
        assert_eq!(RecognitionStatus::from_id(6), None);
    }

    #[test]
    fn legacy_spellings_map_to_one_status() {
        assert_eq!(
            RecognitionStatus::parse_legacy("processed"),
            Some(RecognitionStatus::Completed)
        );
        assert_eq!(
            RecognitionStatus::parse_legacy("COMPLETED"),
            Some(RecognitionStatus::Completed)
        );
        assert_eq!(
            RecognitionStatus::parse_legacy(" Succeeded "),
            Some(RecognitionStatus::Completed)
        );
        assert_eq!(
            RecognitionStatus::parse_legacy("uploaded"),
            Some(RecognitionStatus::Uploaded)
        );
        assert_eq!(
            RecognitionStatus::parse_legacy("PROCESSING"),
            Some(RecognitionStatus::Processing)
        );
        assert_eq!(RecognitionStatus::parse_legacy("done-ish"), None);
    }

    #[test]
    fn canonical_form_parses_back() {
        for status in ALL_STATUSES {
            assert_eq!(RecognitionStatus::parse_legacy(status.as_str()), Some(status));
        }
    }

    #[test]
    fn serde_uses_upper_case() {
        let json = serde_json::to_string(&RecognitionStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
    }

    #[test]
    fn completed_is_not_overwritten_by_failure() {
        assert!(!RecognitionStatus::Completed.can_transition(RecognitionStatus::Failed));
        assert!(!RecognitionStatus::Completed.can_transition(RecognitionStatus::Completed));
        assert!(RecognitionStatus::Completed.can_transition(RecognitionStatus::Pending));
    }

    #[test]
    fn sources_for_completed_excludes_completed() {
        let sources = RecognitionStatus::sources_for(RecognitionStatus::Completed);
        assert!(!sources.contains(&RecognitionStatus::Completed));
        assert!(sources.contains(&RecognitionStatus::Processing));
        assert!(sources.contains(&RecognitionStatus::Failed));
    }

    #[test]
    fn only_uploaded_and_failed_are_enqueueable() {
        let enqueueable: Vec<_> = ALL_STATUSES
            .into_iter()
            .filter(|s| s.is_enqueueable())
            .collect();
        assert_eq!(
            enqueueable,
            vec![RecognitionStatus::Uploaded, RecognitionStatus::Failed]
        );
    }

    #[test]
    fn job_outcome_maps_to_target_status() {
        assert_eq!(
            JobOutcome::parse("SUCCEEDED").map(JobOutcome::target_status),
            Some(RecognitionStatus::Completed)
        );
        assert_eq!(
            JobOutcome::parse("failed").map(JobOutcome::target_status),
            Some(RecognitionStatus::Failed)
        );
        assert_eq!(
            JobOutcome::parse("IN_PROGRESS").map(JobOutcome::target_status),
            Some(RecognitionStatus::Processing)
        );
        assert_eq!(JobOutcome::parse("PAUSED"), None);
    }
}
