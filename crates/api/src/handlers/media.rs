use axum::extract::State;
use mediatag_core::requests::StatusQuery;
use mediatag_pipeline::summary::StatusSummary;

use crate::error::AppResult;
use crate::extract::ValidQuery;
use crate::response::Success;
use crate::state::AppState;

/// GET /api/media/status?kind=&userId=&eventId=
///
/// Per-status record counts for one media kind within one event.
pub async fn status_summary(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<StatusQuery>,
) -> AppResult<Success<StatusSummary>> {
    let (kind, filter) = query.into_validated()?;
    let summary = state.pipeline.status_summary(kind, &filter).await?;
    Ok(Success::new(summary))
}
