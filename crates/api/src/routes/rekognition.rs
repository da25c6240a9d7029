//! Route definitions for the `/rekognition` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::rekognition;
use crate::state::AppState;

/// Routes mounted at `/rekognition`.
///
/// ```text
/// POST /createCollection      -> create_collection
/// POST /getCollectionStats    -> get_collection_stats
/// POST /resetCollection       -> reset_collection
/// POST /searchFacesInVideo    -> search_faces_in_video
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/createCollection", post(rekognition::create_collection))
        .route("/getCollectionStats", post(rekognition::get_collection_stats))
        .route("/resetCollection", post(rekognition::reset_collection))
        .route("/searchFacesInVideo", post(rekognition::search_faces_in_video))
}
