use mediatag_core::error::CoreResult;
use mediatag_core::media::{MediaFilter, MediaKind, StatusCount};
use mediatag_core::status::ALL_STATUSES;
use serde::Serialize;

use crate::MediaPipeline;

/// Per-status record counts for one kind within one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub kind: MediaKind,
    /// One entry per status, in lifecycle order, zero-filled.
    pub counts: Vec<StatusCount>,
    pub total: i64,
}

impl MediaPipeline {
    pub async fn status_summary(
        &self,
        kind: MediaKind,
        filter: &MediaFilter,
    ) -> CoreResult<StatusSummary> {
        let stored = self.store.status_summary(kind, filter).await?;

        let counts: Vec<StatusCount> = ALL_STATUSES
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: stored
                    .iter()
                    .filter(|c| c.status == status)
                    .map(|c| c.count)
                    .sum(),
            })
            .collect();
        let total = counts.iter().map(|c| c.count).sum();

        Ok(StatusSummary {
            kind,
            counts,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use mediatag_core::status::RecognitionStatus;

    use super::*;
    use crate::testing::{media, Harness};

    #[tokio::test]
    async fn summary_is_zero_filled_in_lifecycle_order() {
        let h = Harness::new();
        h.store
            .insert(media(MediaKind::Photo, "p-1", RecognitionStatus::Completed));
        h.store
            .insert(media(MediaKind::Photo, "p-2", RecognitionStatus::Completed));
        h.store
            .insert(media(MediaKind::Photo, "p-3", RecognitionStatus::Failed));
        h.store
            .insert(media(MediaKind::Frame, "f-1", RecognitionStatus::Uploaded));

        let filter = MediaFilter {
            user_id: "u-1".into(),
            event_id: "e-1".into(),
        };
        let summary = h
            .pipeline
            .status_summary(MediaKind::Photo, &filter)
            .await
            .unwrap();

        let pairs: Vec<_> = summary.counts.iter().map(|c| (c.status, c.count)).collect();
        assert_eq!(
            pairs,
            vec![
                (RecognitionStatus::Uploaded, 0),
                (RecognitionStatus::Pending, 0),
                (RecognitionStatus::Processing, 0),
                (RecognitionStatus::Completed, 2),
                (RecognitionStatus::Failed, 1),
            ]
        );
        assert_eq!(summary.total, 3);
    }
}
