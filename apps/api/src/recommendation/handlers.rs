use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::vocab::{Field, UNKNOWN};
use crate::recommendation::ranker::{Candidate, RankMethod};
use crate::recommendation::reranker::{RankContext, Weather};
use crate::recommendation::scoring::{score_outfit, ScoreBreakdown};
use crate::state::AppState;
use crate::wardrobe::WardrobeItem;

pub const MAX_RECOMMEND_COUNT: usize = 10;
pub const FORMALITY_TOLERANCE: f64 = 0.3;

const NOT_ENOUGH_ITEMS: &str =
    "Not enough items in wardrobe (need at least one top and one bottom)";
const NO_MATCHES: &str = "No items match the filters";

fn default_count() -> usize {
    1
}

fn default_use_llm() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default = "default_count")]
    pub count: usize,
    pub season: Option<String>,
    pub formality: Option<f64>,
    #[serde(default = "default_use_llm")]
    pub use_llm: bool,
    pub user_request: Option<String>,
    pub weather: Option<Weather>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub outfits: Vec<Candidate>,
    pub count: usize,
    pub method: RankMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecommendResponse {
    fn empty(message: &str) -> Self {
        Self {
            outfits: Vec::new(),
            count: 0,
            method: RankMethod::Empty,
            message: Some(message.to_string()),
        }
    }
}

/// POST /api/v1/recommend
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, AppError> {
    if !(1..=MAX_RECOMMEND_COUNT).contains(&req.count) {
        return Err(AppError::Validation(format!(
            "count must be between 1 and {MAX_RECOMMEND_COUNT}"
        )));
    }
    if let Some(f) = req.formality {
        if !(0.0..=1.0).contains(&f) {
            return Err(AppError::Validation(
                "formality must be a number in [0,1]".to_string(),
            ));
        }
    }

    let mut tops = state.wardrobe.by_category("top");
    let mut bottoms = state.wardrobe.by_category("bottom");
    let mut outers = state.wardrobe.by_category("outer");

    if tops.is_empty() || bottoms.is_empty() {
        return Ok(Json(RecommendResponse::empty(NOT_ENOUGH_ITEMS)));
    }

    let filter = PoolFilter::new(req.season.as_deref(), req.formality);
    for pool in [&mut tops, &mut bottoms, &mut outers] {
        pool.retain(|item| filter.keeps(item));
    }

    if tops.is_empty() || bottoms.is_empty() {
        return Ok(Json(RecommendResponse::empty(NO_MATCHES)));
    }

    let context = RankContext {
        user_request: req.user_request,
        weather: req.weather,
    };

    info!(
        "Recommending {} outfit(s) from {} tops, {} bottoms, {} outers",
        req.count,
        tops.len(),
        bottoms.len(),
        outers.len()
    );

    let outcome = state
        .ranker
        .rank(&tops, &bottoms, &outers, req.count, &context, req.use_llm)
        .await;

    Ok(Json(RecommendResponse {
        count: outcome.candidates.len(),
        outfits: outcome.candidates,
        method: outcome.method,
        message: None,
    }))
}

/// Season and formality filters applied to every pool.
struct PoolFilter {
    season: Option<String>,
    formality: Option<f64>,
}

impl PoolFilter {
    fn new(season: Option<&str>, formality: Option<f64>) -> Self {
        let season = season
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| match Field::Season.resolve(s) {
                UNKNOWN => s.to_lowercase(),
                canonical => canonical.to_string(),
            });
        Self { season, formality }
    }

    fn keeps(&self, item: &WardrobeItem) -> bool {
        let scores = &item.attributes.scores;
        let season_ok = self
            .season
            .as_ref()
            .map_or(true, |s| scores.season.iter().any(|have| have == s));
        let formality_ok = self
            .formality
            .map_or(true, |f| (scores.formality - f).abs() <= FORMALITY_TOLERANCE);
        season_ok && formality_ok
    }
}

#[derive(Deserialize)]
pub struct ScoreQuery {
    pub top_id: Uuid,
    pub bottom_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub score: f64,
    pub score_percent: u32,
    pub reasons: Vec<String>,
    pub breakdown: ScoreBreakdown,
    pub top: WardrobeItem,
    pub bottom: WardrobeItem,
}

/// GET /api/v1/outfit/score
pub async fn handle_outfit_score(
    State(state): State<AppState>,
    Query(params): Query<ScoreQuery>,
) -> Result<Json<ScoreResponse>, AppError> {
    let (top, bottom) = match (
        state.wardrobe.get(params.top_id),
        state.wardrobe.get(params.bottom_id),
    ) {
        (Some(top), Some(bottom)) => (top, bottom),
        _ => return Err(AppError::NotFound("Items not found".to_string())),
    };

    let result = score_outfit(&top.attributes, &bottom.attributes);
    let score = (result.total * 1000.0).round() / 1000.0;
    Ok(Json(ScoreResponse {
        score,
        score_percent: (score * 100.0).round() as u32,
        reasons: result.reasons,
        breakdown: result.breakdown,
        top,
        bottom,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::vocab::default_record;

    fn item(season: &[&str], formality: f64) -> WardrobeItem {
        let mut attrs = default_record();
        attrs.scores.season = season.iter().map(|s| s.to_string()).collect();
        attrs.scores.formality = formality;
        WardrobeItem::new(attrs)
    }

    #[test]
    fn test_season_filter_resolves_aliases() {
        let filter = PoolFilter::new(Some("Autumn"), None);
        assert!(filter.keeps(&item(&["fall", "winter"], 0.5)));
        assert!(!filter.keeps(&item(&["summer"], 0.5)));

        let nonsense = PoolFilter::new(Some("monsoon"), None);
        assert!(!nonsense.keeps(&item(&["fall"], 0.5)));

        let blank = PoolFilter::new(Some("  "), None);
        assert!(blank.keeps(&item(&[], 0.5)));
    }

    #[test]
    fn test_formality_window() {
        let filter = PoolFilter::new(None, Some(0.6));
        assert!(filter.keeps(&item(&[], 0.35)));
        assert!(filter.keeps(&item(&[], 0.85)));
        assert!(!filter.keeps(&item(&[], 0.2)));
        assert!(!filter.keeps(&item(&[], 0.95)));
    }

    #[test]
    fn test_request_defaults() {
        let req: RecommendRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.count, 1);
        assert!(req.use_llm);
        assert!(req.season.is_none() && req.weather.is_none());
    }
}
