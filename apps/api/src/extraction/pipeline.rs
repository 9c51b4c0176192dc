//! Extraction Pipeline — one photo in, one schema-conformant record out.
//!
//! Explicit state machine:
//!
//! ```text
//! Preprocess → CallModel → Parse ─┬─ Validate ─┬─ Finalize
//!                           ▲     │            └─ Decide ─┬─ Finalize
//!                           │     └─ Decide ──────────────┤
//!                           └──────────────── Retry ◄─────┤
//!                                                         └─ DefaultFallback
//! ```
//!
//! Transport, parse and validation failures are recorded as strings and fed
//! to the same retry decision. At most one retry, so at most two model calls.
//! The only error a caller can see is `ExtractionError` (precondition misuse).

use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::extraction::models::AttributeRecord;
use crate::extraction::normalize::normalize;
use crate::extraction::prompts::{build_extraction_prompt, build_retry_prompt, EXTRACTION_SYSTEM};
use crate::extraction::schema::validate_schema;
use crate::extraction::vocab::default_record;
use crate::llm_client::response_parser::parse_dict;
use crate::llm_client::{preview, VisionModel, VisionRequest};

pub const INITIAL_TEMPERATURE: f32 = 0.3;
pub const RETRY_TEMPERATURE: f32 = 0.2;
pub const MAX_OUTPUT_TOKENS: u32 = 2000;
pub const MAX_RETRIES: u32 = 1;

/// Confidence of a record recovered from a schema-invalid response.
pub const REPAIRED_CONFIDENCE: f64 = 0.2;
/// Confidence of the default record returned after total failure.
pub const FAILED_CONFIDENCE: f64 = 0.1;

const FALLBACK_NOTES_MAX_CHARS: usize = 300;
const DEFAULT_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("image is empty")]
    EmptyImage,

    #[error("image is {size} bytes; the limit is {limit} bytes")]
    ImageTooLarge { size: usize, limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    CallModel,
    Parse,
    Validate,
    Decide,
    Retry,
    Finalize,
    DefaultFallback,
    Done,
}

/// Everything one extraction run knows about itself.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub image: Bytes,
    pub mime_type: &'static str,
    pub raw_response: Option<String>,
    pub parsed_json: Option<Map<String, Value>>,
    pub errors: Vec<String>,
    pub retry_count: u32,
    pub final_result: Option<AttributeRecord>,
    pub confidence: f64,
}

impl PipelineState {
    pub fn new(image: Bytes) -> Self {
        Self {
            image,
            mime_type: DEFAULT_MIME_TYPE,
            raw_response: None,
            parsed_json: None,
            errors: Vec::new(),
            retry_count: 0,
            final_result: None,
            confidence: 0.0,
        }
    }
}

/// The retry decision, taken after a failed parse or validation.
pub fn decide(state: &PipelineState, retry_enabled: bool) -> Stage {
    if state.final_result.is_some() {
        Stage::Finalize
    } else if !retry_enabled || state.retry_count >= MAX_RETRIES {
        Stage::DefaultFallback
    } else if !state.errors.is_empty() {
        Stage::Retry
    } else {
        Stage::DefaultFallback
    }
}

#[derive(Clone)]
pub struct ExtractionPipeline {
    model: Arc<dyn VisionModel>,
    max_image_bytes: usize,
}

impl ExtractionPipeline {
    pub fn new(model: Arc<dyn VisionModel>, max_image_bytes: usize) -> Self {
        Self {
            model,
            max_image_bytes,
        }
    }

    /// Extracts one record. Never fails once the image passes the
    /// precondition checks; `confidence` is the caller-facing trust signal.
    pub async fn extract(
        &self,
        image: Bytes,
        retry_on_schema_fail: bool,
    ) -> Result<AttributeRecord, ExtractionError> {
        self.run(image, retry_on_schema_fail)
            .await
            .map(|state| state.final_result.unwrap_or_else(default_record))
    }

    /// Extracts every image concurrently. Items are independent: one item's
    /// failure never affects another.
    pub async fn extract_batch(
        &self,
        images: Vec<Bytes>,
        retry_on_schema_fail: bool,
    ) -> Vec<Result<AttributeRecord, ExtractionError>> {
        join_all(
            images
                .into_iter()
                .map(|image| self.extract(image, retry_on_schema_fail)),
        )
        .await
    }

    /// Runs the state machine to completion and returns the terminal state.
    pub async fn run(
        &self,
        image: Bytes,
        retry_on_schema_fail: bool,
    ) -> Result<PipelineState, ExtractionError> {
        if image.is_empty() {
            return Err(ExtractionError::EmptyImage);
        }
        if image.len() > self.max_image_bytes {
            return Err(ExtractionError::ImageTooLarge {
                size: image.len(),
                limit: self.max_image_bytes,
            });
        }

        let mut state = PipelineState::new(image);
        let mut stage = Stage::Preprocess;
        while stage != Stage::Done {
            debug!("Extraction stage: {:?}", stage);
            stage = self.step(stage, &mut state, retry_on_schema_fail).await;
        }

        info!(
            "Extraction finished: confidence={}, retries={}",
            state.confidence, state.retry_count
        );
        Ok(state)
    }

    async fn step(&self, stage: Stage, state: &mut PipelineState, retry_enabled: bool) -> Stage {
        match stage {
            Stage::Preprocess => {
                state.mime_type = sniff_image_mime(&state.image);
                Stage::CallModel
            }
            Stage::CallModel => {
                info!(
                    "Calling vision model ({} bytes, {})",
                    state.image.len(),
                    state.mime_type
                );
                let prompt = build_extraction_prompt();
                self.invoke(state, &prompt, INITIAL_TEMPERATURE).await;
                Stage::Parse
            }
            Stage::Parse => {
                let Some(raw) = state.raw_response.as_deref() else {
                    return Stage::Decide;
                };
                let (parsed, repaired) = parse_dict(raw);
                match parsed {
                    Some(map) => {
                        state.parsed_json = Some(map);
                        Stage::Validate
                    }
                    None => {
                        warn!("JSON parsing failed; repaired head: {}", preview(&repaired));
                        state.errors.push(format!(
                            "JSON parsing failed or returned non-object. Response preview: {}",
                            preview(raw)
                        ));
                        state.parsed_json = None;
                        Stage::Decide
                    }
                }
            }
            Stage::Validate => {
                let Some(parsed) = state.parsed_json.as_ref() else {
                    return Stage::Decide;
                };
                let check = validate_schema(parsed);
                if check.valid {
                    info!("Schema validation passed");
                    Stage::Finalize
                } else {
                    warn!(
                        "Schema validation failed with {} errors: {:?}",
                        check.errors.len(),
                        &check.errors[..check.errors.len().min(3)]
                    );
                    state.errors = check.errors;
                    Stage::Decide
                }
            }
            Stage::Decide => decide(state, retry_enabled),
            Stage::Retry => {
                info!("Retrying with {} recorded errors", state.errors.len());
                let prompt = build_retry_prompt(&state.errors);
                state.errors.clear();
                state.retry_count += 1;
                self.invoke(state, &prompt, RETRY_TEMPERATURE).await;
                Stage::Parse
            }
            Stage::Finalize => {
                if state.final_result.is_none() {
                    if let Some(parsed) = state.parsed_json.as_ref() {
                        let record = normalize(&Value::Object(parsed.clone()));
                        state.confidence = record.confidence;
                        state.final_result = Some(record);
                    }
                }
                Stage::Done
            }
            Stage::DefaultFallback => {
                let record = match state.parsed_json.as_ref() {
                    Some(parsed) => {
                        warn!("Returning repaired record from schema-invalid response");
                        repaired_record(parsed, &state.errors)
                    }
                    None => {
                        error!(
                            "All extraction attempts failed (retries={}): {:?}",
                            state.retry_count, state.errors
                        );
                        failed_record(&state.errors)
                    }
                };
                state.confidence = record.confidence;
                state.final_result = Some(record);
                Stage::Done
            }
            Stage::Done => Stage::Done,
        }
    }

    /// One model call. Failures and empty text become recorded errors.
    async fn invoke(&self, state: &mut PipelineState, prompt: &str, temperature: f32) {
        state.raw_response = None;
        let request = VisionRequest {
            system: EXTRACTION_SYSTEM,
            prompt,
            image: &state.image,
            mime_type: state.mime_type,
            temperature,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        match self.model.generate(request).await {
            Ok(text) if text.trim().is_empty() => {
                warn!("Vision model returned an empty response");
                state.errors.push("Empty response from model".to_string());
            }
            Ok(text) => {
                debug!("Vision model response ({} chars): {}", text.len(), preview(&text));
                state.raw_response = Some(text);
            }
            Err(e) => {
                error!("Vision model call failed: {e}");
                state.errors.push(format!("Model call failed: {e}"));
            }
        }
    }
}

/// Magic-byte sniffing; anything unrecognised is sent as JPEG.
pub fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .unwrap_or(DEFAULT_MIME_TYPE)
}

fn repaired_record(parsed: &Map<String, Value>, errors: &[String]) -> AttributeRecord {
    let mut record = normalize(&Value::Object(parsed.clone()));
    if !errors.is_empty() {
        let summary = format!("SCHEMA_INVALID: {}", first_errors(errors).join(", "));
        let notes = match record.meta.notes.take() {
            Some(existing) => format!("{existing} | {summary}"),
            None => summary,
        };
        record.meta.notes = Some(notes.chars().take(FALLBACK_NOTES_MAX_CHARS).collect());
    }
    record.confidence = REPAIRED_CONFIDENCE;
    record
}

fn failed_record(errors: &[String]) -> AttributeRecord {
    let mut record = default_record();
    let summary = if errors.is_empty() {
        "Unknown error".to_string()
    } else {
        first_errors(errors).join("; ")
    };
    record.meta.notes = Some(format!("All extraction attempts failed: {summary}"));
    record.confidence = FAILED_CONFIDENCE;
    record
}

fn first_errors(errors: &[String]) -> &[String] {
    &errors[..errors.len().min(3)]
}
