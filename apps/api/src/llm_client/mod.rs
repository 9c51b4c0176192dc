/// LLM Client — the single point of entry for all generative-model calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// Callers depend on the `VisionModel` / `TextModel` traits so the pipeline
/// and re-ranker can be driven by scripted stubs in tests.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod response_parser;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Collaborator traits
// ────────────────────────────────────────────────────────────────────────────

/// One vision call: a prompt plus a single image.
#[derive(Debug, Clone, Copy)]
pub struct VisionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub image: &'a [u8],
    pub mime_type: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Vision-capable model. The returned text carries no structural guarantee
/// and may be empty.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(&self, request: VisionRequest<'_>) -> Result<String, LlmError>;
}

/// Text-only model used by the outfit re-ranker.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseCandidate {
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate; empty if none.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Wraps the Gemini `generateContent` REST API with retry on 429/5xx.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    text_model: String,
    vision_model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        text_model: String,
        vision_model: String,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key,
            text_model,
            vision_model,
        })
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn vision_model(&self) -> &str {
        &self.vision_model
    }

    /// Makes a raw `generateContent` call, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn call(
        &self,
        model: &str,
        body: &GenerateRequest<'_>,
    ) -> Result<GenerateResponse, LlmError> {
        let url = format!("{GEMINI_API_BASE}/{model}:generateContent");
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Gemini call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("content-type", "application/json")
                .json(body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Gemini API returned {}: {}", status, preview(&body));
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GeminiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: GenerateResponse = response.json().await?;

            if let Some(usage) = &parsed.usage_metadata {
                debug!(
                    "Gemini call succeeded: model={}, prompt_tokens={:?}, output_tokens={:?}",
                    model, usage.prompt_token_count, usage.candidates_token_count
                );
            }

            return Ok(parsed);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn generate(&self, request: VisionRequest<'_>) -> Result<String, LlmError> {
        let body = GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part::Text {
                    text: request.system,
                }],
            },
            contents: vec![RequestContent {
                role: "user",
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: request.mime_type,
                            data: BASE64.encode(request.image),
                        },
                    },
                    Part::Text {
                        text: request.prompt,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self.call(&self.vision_model, &body).await?;
        Ok(response.text())
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let body = GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part::Text { text: system }],
            },
            contents: vec![RequestContent {
                role: "user",
                parts: vec![Part::Text { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
            },
        };

        let response = self.call(&self.text_model, &body).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text)
    }
}

/// First 200 characters of model or API output, for logs.
pub fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}
