use axum::routing::get;
use axum::Router;

use crate::handlers::media;
use crate::state::AppState;

/// Routes mounted at `/media`.
///
/// ```text
/// GET /status    -> status_summary  (?kind=&userId=&eventId=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(media::status_summary))
}
