use axum::routing::post;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST /completion    -> job_completion
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/completion", post(jobs::job_completion))
}
