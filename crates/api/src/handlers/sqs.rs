//! Handlers for the `/sqs` resource.
//!
//! Queue photos and frames for face detection. The bulk endpoints page
//! through every eligible record of one event and send them in batches of at
//! most ten; required fields are checked before any queue call.

use axum::extract::State;
use mediatag_core::media::MediaKind;
use mediatag_core::requests::{BulkDetectionRequest, DetectionRequest};
use mediatag_pipeline::enqueue::{BulkEnqueueOutcome, EnqueueOutcome};

use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::response::Success;
use crate::state::AppState;

/// POST /api/sqs/addToPhotoDetectionQueue
///
/// Enqueue one photo or frame. A record already on the queue or in flight
/// is not sent again; the response carries `alreadyQueued: true`.
pub async fn enqueue_one(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<DetectionRequest>,
) -> AppResult<Success<EnqueueOutcome>> {
    let detection = body.into_validated()?;
    let outcome = state.pipeline.enqueue_detection(&detection).await?;
    Ok(Success::new(outcome))
}

/// POST /api/sqs/addToPhotosDetectionQueueBulk
pub async fn enqueue_photos_bulk(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<BulkDetectionRequest>,
) -> AppResult<Success<BulkEnqueueOutcome>> {
    enqueue_bulk(&state, MediaKind::Photo, body).await
}

/// POST /api/sqs/addToFrameDetectionQueueBulk
pub async fn enqueue_frames_bulk(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<BulkDetectionRequest>,
) -> AppResult<Success<BulkEnqueueOutcome>> {
    enqueue_bulk(&state, MediaKind::Frame, body).await
}

async fn enqueue_bulk(
    state: &AppState,
    kind: MediaKind,
    body: BulkDetectionRequest,
) -> AppResult<Success<BulkEnqueueOutcome>> {
    let bulk = body.into_validated()?;
    let outcome = state.pipeline.enqueue_bulk(kind, &bulk).await?;
    Ok(Success::new(outcome))
}
