use std::str::FromStr;

use anyhow::{Context, Result};

use crate::recommendation::ranker::DEFAULT_CANDIDATE_LIMIT;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_vision_model: String,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    pub rank_cache_capacity: usize,
    pub rerank_timeout_secs: u64,
    pub candidate_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_MODEL),
            gemini_vision_model: env_or("GEMINI_VISION_MODEL", DEFAULT_MODEL),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 15 * 1024 * 1024)?,
            rank_cache_capacity: parse_env("RANK_CACHE_CAPACITY", 100)?,
            rerank_timeout_secs: parse_env("RERANK_TIMEOUT_SECS", 20)?,
            candidate_limit: parse_env("CANDIDATE_LIMIT", DEFAULT_CANDIDATE_LIMIT)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
