use std::sync::Arc;

use crate::config::Config;
use crate::extraction::pipeline::ExtractionPipeline;
use crate::recommendation::ranker::CandidateRanker;
use crate::wardrobe::WardrobeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: ExtractionPipeline,
    pub ranker: Arc<CandidateRanker>,
    /// Live item pool; rankings and cache hits are resolved against it.
    pub wardrobe: Arc<WardrobeStore>,
}
