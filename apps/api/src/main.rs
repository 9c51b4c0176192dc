mod config;
mod errors;
mod extraction;
mod llm_client;
mod recommendation;
mod routes;
mod state;
mod wardrobe;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::pipeline::ExtractionPipeline;
use crate::llm_client::GeminiClient;
use crate::recommendation::cache::RankCache;
use crate::recommendation::ranker::CandidateRanker;
use crate::recommendation::reranker::LlmReranker;
use crate::routes::build_router;
use crate::state::AppState;
use crate::wardrobe::WardrobeStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Outfitter API v{}", env!("CARGO_PKG_VERSION"));

    // One client serves both the vision and the text model
    let gemini = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_vision_model.clone(),
    )?);
    info!(
        "Gemini client initialized (text: {}, vision: {})",
        gemini.text_model(),
        gemini.vision_model()
    );

    let pipeline = ExtractionPipeline::new(gemini.clone(), config.max_upload_bytes);

    let ranker = CandidateRanker::new(
        RankCache::new(config.rank_cache_capacity),
        Some(Arc::new(LlmReranker::new(gemini))),
        config.candidate_limit,
        Duration::from_secs(config.rerank_timeout_secs),
    );
    info!(
        "Ranker initialized (cache capacity: {}, candidate limit: {}, rerank timeout: {}s)",
        config.rank_cache_capacity, config.candidate_limit, config.rerank_timeout_secs
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        pipeline,
        ranker: Arc::new(ranker),
        wardrobe: Arc::new(WardrobeStore::new()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
