//! Optional external reasoning over the rule-based shortlist.
//!
//! `CandidateRanker` holds an `Arc<dyn Reranker>`; the production backend is
//! `LlmReranker` over any `TextModel`. Every failure here is absorbed by the
//! ranker, which falls back to its own ordering.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::response_parser::parse_any;
use crate::llm_client::{preview, LlmError, TextModel};
use crate::recommendation::prompts::{build_rerank_prompt, build_tpo_rerank_prompt};
use crate::wardrobe::WardrobeItem;

pub const RERANK_TEMPERATURE: f32 = 0.7;
pub const RERANK_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_PICK_SCORE: f64 = 0.5;

const MAX_SUMMARY_STYLES: usize = 3;

#[derive(Debug, Error)]
pub enum RerankError {
    #[error("re-ranking model failed: {0}")]
    Llm(#[from] LlmError),

    #[error("re-ranking response had no usable JSON")]
    Unparseable,

    #[error("re-ranking timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature: Option<f64>,
    pub condition: Option<String>,
    pub precipitation: Option<String>,
}

/// Optional request context forwarded to the re-ranker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankContext {
    pub user_request: Option<String>,
    pub weather: Option<Weather>,
}

impl RankContext {
    pub fn is_empty(&self) -> bool {
        self.user_request.as_deref().map_or(true, |r| r.trim().is_empty()) && self.weather.is_none()
    }

    /// Stable text form, folded into the rank cache key.
    pub fn fingerprint(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            serde_json::to_string(self).unwrap_or_default()
        }
    }
}

/// Compact per-item view sent to the model. `warm`, `thick`, `mat` and
/// `layer` feed the weather, material and layering rules of the context prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub id: Uuid,
    pub cat: String,
    pub col: String,
    pub style: Vec<String>,
    pub form: f64,
    pub warm: f64,
    pub thick: f64,
    pub mat: String,
    pub layer: u8,
}

impl ItemSummary {
    pub fn from_item(item: &WardrobeItem) -> Self {
        let attrs = &item.attributes;
        Self {
            id: item.id,
            cat: attrs.category.sub.clone(),
            col: attrs.color.primary.clone(),
            style: attrs
                .style_tags
                .iter()
                .take(MAX_SUMMARY_STYLES)
                .cloned()
                .collect(),
            form: round2(attrs.scores.formality),
            warm: round2(attrs.scores.warmth),
            thick: round2(attrs.scores.thickness),
            mat: attrs.material.guess.clone(),
            layer: attrs.meta.layering_rank,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct RerankRequest<'a> {
    pub tops: &'a [ItemSummary],
    pub bottoms: &'a [ItemSummary],
    pub outers: &'a [ItemSummary],
    pub count: usize,
    pub context: &'a RankContext,
}

/// One pick as returned by the model. Ids are unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankPick {
    pub top_id: String,
    pub bottom_id: String,
    pub outer_id: Option<String>,
    pub score: f64,
    pub reasoning: String,
    pub style_description: String,
}

#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, request: &RerankRequest<'_>) -> Result<Vec<RerankPick>, RerankError>;
}

pub struct LlmReranker {
    model: Arc<dyn TextModel>,
}

impl LlmReranker {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(&self, request: &RerankRequest<'_>) -> Result<Vec<RerankPick>, RerankError> {
        let prompt = if request.context.is_empty() {
            build_rerank_prompt(request.tops, request.bottoms, request.count)
        } else {
            build_tpo_rerank_prompt(
                request.tops,
                request.bottoms,
                request.outers,
                request.count,
                request.context,
            )
        };

        let text = self
            .model
            .complete(JSON_ONLY_SYSTEM, &prompt, RERANK_TEMPERATURE, RERANK_MAX_TOKENS)
            .await?;
        debug!("Re-ranker response: {}", preview(&text));

        let (parsed, repaired) = parse_any(&text);
        let items = match parsed {
            Some(Value::Array(items)) => items,
            Some(obj @ Value::Object(_)) => vec![obj],
            _ => {
                warn!("Re-ranker output unparseable: {}", preview(&repaired));
                return Err(RerankError::Unparseable);
            }
        };

        Ok(items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(pick_from_json)
            .collect())
    }
}

/// Accepts flat picks and TPO picks (`combination: {outer_id, top_id, bottom_id}`).
fn pick_from_json(obj: &Map<String, Value>) -> Option<RerankPick> {
    let ids = obj
        .get("combination")
        .and_then(Value::as_object)
        .unwrap_or(obj);

    let id = |key: &str| -> Option<String> {
        match ids.get(key).or_else(|| obj.get(key)) {
            Some(Value::String(s)) if !s.trim().is_empty() && s != "null" => {
                Some(s.trim().to_string())
            }
            _ => None,
        }
    };

    let score = match obj.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| s.is_finite())
    .unwrap_or(DEFAULT_PICK_SCORE)
    .clamp(0.0, 1.0);

    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Some(RerankPick {
        top_id: id("top_id")?,
        bottom_id: id("bottom_id")?,
        outer_id: id("outer_id"),
        score,
        reasoning: text("reasoning"),
        style_description: text("style_description"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::vocab::default_record;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedText {
        reply: Mutex<Option<Result<String, LlmError>>>,
        calls: AtomicUsize,
        last_prompt: Mutex<String>,
    }

    impl CannedText {
        fn new(reply: Result<String, LlmError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(String::new()),
            })
        }
    }

    #[async_trait]
    impl TextModel for CannedText {
        async fn complete(
            &self,
            _system: &str,
            prompt: &str,
            temperature: f32,
            max_tokens: u32,
        ) -> Result<String, LlmError> {
            assert_eq!(temperature, RERANK_TEMPERATURE);
            assert_eq!(max_tokens, RERANK_MAX_TOKENS);
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock() = prompt.to_string();
            self.reply
                .lock()
                .take()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    fn summaries() -> Vec<ItemSummary> {
        vec![ItemSummary::from_item(&WardrobeItem::new(default_record()))]
    }

    async fn run(
        reply: Result<String, LlmError>,
        context: RankContext,
    ) -> (Result<Vec<RerankPick>, RerankError>, String) {
        let model = CannedText::new(reply);
        let reranker = LlmReranker::new(model.clone());
        let items = summaries();
        let request = RerankRequest {
            tops: &items,
            bottoms: &items,
            outers: &[],
            count: 2,
            context: &context,
        };
        let result = reranker.rerank(&request).await;
        let prompt = model.last_prompt.lock().clone();
        (result, prompt)
    }

    #[tokio::test]
    async fn test_parses_fenced_array_with_defaults() {
        let reply = "```json\n[{\"top_id\": \"t1\", \"bottom_id\": \"b1\", \"score\": 1.7, \"reasoning\": \"crisp\"},\
                     {\"top_id\": \"t2\", \"bottom_id\": \"b2\"},\
                     {\"top_id\": \"t3\"}]\n```";
        let (result, prompt) = run(Ok(reply.to_string()), RankContext::default()).await;
        let picks = result.unwrap();

        assert!(prompt.starts_with("Recommend 2 best outfit(s)"));
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].score, 1.0);
        assert_eq!(picks[0].reasoning, "crisp");
        assert_eq!(picks[1].score, DEFAULT_PICK_SCORE);
        assert_eq!(picks[1].style_description, "");
    }

    #[tokio::test]
    async fn test_single_object_and_combination_shape() {
        let reply = json!({
            "outfit_id": "outfit_1",
            "combination": {"outer_id": "o1", "top_id": "t1", "bottom_id": "b1"},
            "score": "0.8",
            "reasoning": "warm layers for a cold day",
            "style_description": "layered smart casual"
        })
        .to_string();
        let context = RankContext {
            user_request: Some("dinner".to_string()),
            weather: None,
        };
        let (result, prompt) = run(Ok(reply), context).await;
        let picks = result.unwrap();

        assert!(prompt.starts_with("Recommend 2 outfit(s) based on the context."));
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].outer_id.as_deref(), Some("o1"));
        assert_eq!(picks[0].top_id, "t1");
        assert_eq!(picks[0].score, 0.8);
    }

    #[tokio::test]
    async fn test_unparseable_and_model_errors() {
        let (result, _) = run(
            Ok("I'd pick the navy one.".to_string()),
            RankContext::default(),
        )
        .await;
        assert!(matches!(result, Err(RerankError::Unparseable)));

        let (result, _) = run(Err(LlmError::EmptyContent), RankContext::default()).await;
        assert!(matches!(result, Err(RerankError::Llm(LlmError::EmptyContent))));
    }

    #[test]
    fn test_summary_is_compact() {
        let mut attrs = default_record();
        attrs.category.sub = "shirt".to_string();
        attrs.style_tags = ["classic", "business", "minimal", "chic"].map(String::from).to_vec();
        attrs.scores.formality = 0.666;
        attrs.scores.warmth = 0.8;
        attrs.material.guess = "wool".to_string();
        attrs.meta.layering_rank = 3;
        let summary = ItemSummary::from_item(&WardrobeItem::new(attrs));

        assert_eq!(summary.cat, "shirt");
        assert_eq!(summary.style.len(), 3);
        assert_eq!(summary.form, 0.67);
        assert_eq!(summary.warm, 0.8);
        assert_eq!(summary.mat, "wool");
        assert_eq!(summary.layer, 3);
    }

    #[test]
    fn test_context_fingerprint() {
        assert_eq!(RankContext::default().fingerprint(), "");
        let blank = RankContext {
            user_request: Some("  ".to_string()),
            weather: None,
        };
        assert!(blank.is_empty());
        let rainy = RankContext {
            user_request: None,
            weather: Some(Weather {
                precipitation: Some("rain".to_string()),
                ..Weather::default()
            }),
        };
        assert!(!rainy.fingerprint().is_empty());
    }
}
