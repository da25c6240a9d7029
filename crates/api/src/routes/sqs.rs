//! Route definitions for the `/sqs` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::sqs;
use crate::state::AppState;

/// Routes mounted at `/sqs`.
///
/// ```text
/// POST /addToPhotoDetectionQueue        -> enqueue_one
/// POST /addToPhotosDetectionQueueBulk   -> enqueue_photos_bulk
/// POST /addToFrameDetectionQueueBulk    -> enqueue_frames_bulk
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/addToPhotoDetectionQueue", post(sqs::enqueue_one))
        .route("/addToPhotosDetectionQueueBulk", post(sqs::enqueue_photos_bulk))
        .route("/addToFrameDetectionQueueBulk", post(sqs::enqueue_frames_bulk))
}
