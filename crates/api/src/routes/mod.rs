pub mod health;
pub mod jobs;
pub mod media;
pub mod rekognition;
pub mod sqs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /rekognition/createCollection            create a face collection
/// /rekognition/getCollectionStats          face count of a collection
/// /rekognition/resetCollection             drop and re-create a collection
/// /rekognition/searchFacesInVideo          start an async face search
///
/// /sqs/addToPhotoDetectionQueue            enqueue one photo or frame
/// /sqs/addToPhotosDetectionQueueBulk       enqueue every eligible photo of an event
/// /sqs/addToFrameDetectionQueueBulk        enqueue every eligible frame of an event
///
/// /jobs/completion                         job-completion webhook
///
/// /media/status                            per-status counts (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/rekognition", rekognition::router())
        .nest("/sqs", sqs::router())
        .nest("/jobs", jobs::router())
        .nest("/media", media::router())
}
