use std::sync::Arc;

use crate::services::recommendations::RecommendationPipeline;

/// Shared application state
///
/// Holds the per-process pipeline (catalog client, user store, ranking
/// policy); no per-user state lives here.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RecommendationPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<RecommendationPipeline>) -> Self {
        Self { pipeline }
    }
}
