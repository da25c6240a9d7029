//! Handlers for the `/jobs` resource.

use axum::extract::State;
use mediatag_core::message::JobCompletionNotice;
use mediatag_pipeline::completion::CompletionOutcome;

use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::response::Success;
use crate::state::AppState;

/// POST /api/jobs/completion
///
/// Webhook counterpart of the job-completion consumer. Accepts the bare
/// `{JobId, Status}` notice or an SNS envelope carrying it in `Message`.
pub async fn job_completion(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<serde_json::Value>,
) -> AppResult<Success<CompletionOutcome>> {
    let notice = JobCompletionNotice::from_value(body)?;
    let outcome = state.pipeline.handle_job_completion(&notice).await?;
    Ok(Success::new(outcome))
}
