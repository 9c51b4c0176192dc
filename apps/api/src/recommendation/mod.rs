pub mod cache;
pub mod handlers;
pub mod prompts;
pub mod ranker;
pub mod reranker;
pub mod scoring;
