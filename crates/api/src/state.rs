use std::sync::Arc;

use mediatag_pipeline::MediaPipeline;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: the config is behind `Arc` and the pipeline only holds
/// `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The process-wide orchestration pipeline.
    pub pipeline: MediaPipeline,
}
