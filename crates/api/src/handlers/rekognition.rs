//! Handlers for the `/rekognition` resource.
//!
//! Face collection management and the asynchronous video face search. All
//! endpoints take a JSON body; a missing `collectionId` is a 400.

use axum::extract::State;
use mediatag_core::requests::{CollectionRequest, VideoSearchRequest};
use mediatag_core::vision::{CollectionCreated, CollectionStats};
use mediatag_pipeline::collections::CollectionReset;
use mediatag_pipeline::video_search::FaceSearchStarted;

use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::response::Success;
use crate::state::AppState;

/// POST /api/rekognition/createCollection
pub async fn create_collection(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CollectionRequest>,
) -> AppResult<Success<CollectionCreated>> {
    let collection_id = body.into_collection_id()?;
    let created = state.pipeline.create_collection(&collection_id).await?;
    tracing::info!(collection_id = %collection_id, "Face collection created");
    Ok(Success::new(created))
}

/// POST /api/rekognition/getCollectionStats
pub async fn get_collection_stats(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CollectionRequest>,
) -> AppResult<Success<CollectionStats>> {
    let collection_id = body.into_collection_id()?;
    let stats = state.pipeline.collection_stats(&collection_id).await?;
    Ok(Success::new(stats))
}

/// POST /api/rekognition/resetCollection
///
/// Deletes the collection if it exists, then creates it again empty.
pub async fn reset_collection(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CollectionRequest>,
) -> AppResult<Success<CollectionReset>> {
    let collection_id = body.into_collection_id()?;
    let reset = state.pipeline.reset_collection(&collection_id).await?;
    Ok(Success::new(reset))
}

/// POST /api/rekognition/searchFacesInVideo
///
/// Starts a face search job and returns its id. When `videoId` or
/// `videoChunkId` is given, that record is moved to `PROCESSING` and tagged
/// with the job id; an unknown record is a 404.
pub async fn search_faces_in_video(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<VideoSearchRequest>,
) -> AppResult<Success<FaceSearchStarted>> {
    let search = body.into_validated()?;
    let started = state.pipeline.search_faces_in_video(&search).await?;
    Ok(Success::new(started))
}
