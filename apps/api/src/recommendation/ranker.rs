//! Candidate Ranker — turns item pools into ranked outfit suggestions.
//!
//! 1. Score the full top × bottom cross-product; stable sort, best first.
//! 2. With re-ranking enabled: answer from the rank cache (rejoined against
//!    the live pools), else send the top `candidate_limit` pairs to the
//!    re-ranker under a timeout and cache what it returns.
//! 3. Anything else falls back to the rule-based order, unmodified.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::recommendation::cache::{cache_key, CachedPick, RankCache};
use crate::recommendation::reranker::{
    ItemSummary, RankContext, RerankError, RerankPick, RerankRequest, Reranker,
};
use crate::recommendation::scoring::{score_outfit, OutfitScore};
use crate::wardrobe::WardrobeItem;

pub const DEFAULT_CANDIDATE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub top: WardrobeItem,
    pub bottom: WardrobeItem,
    pub outer: Option<WardrobeItem>,
    pub score: f64,
    pub reasons: Vec<String>,
    pub reasoning: String,
    pub style_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankMethod {
    Llm,
    Cache,
    RuleBased,
    /// Nothing to pair: a pool was empty.
    #[serde(rename = "none")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankOutcome {
    pub candidates: Vec<Candidate>,
    pub method: RankMethod,
}

/// One scored pairing, borrowed from the pools.
#[derive(Debug, Clone)]
pub struct ScoredPair<'a> {
    pub top: &'a WardrobeItem,
    pub bottom: &'a WardrobeItem,
    pub score: OutfitScore,
}

pub struct CandidateRanker {
    cache: RankCache,
    reranker: Option<Arc<dyn Reranker>>,
    candidate_limit: usize,
    rerank_timeout: Duration,
}

impl CandidateRanker {
    pub fn new(
        cache: RankCache,
        reranker: Option<Arc<dyn Reranker>>,
        candidate_limit: usize,
        rerank_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            reranker,
            candidate_limit: candidate_limit.max(1),
            rerank_timeout,
        }
    }

    /// Full cross-product, best first. Ties keep enumeration order
    /// (top-major), since `sort_by` is stable.
    pub fn score_pairs<'a>(
        &self,
        tops: &'a [WardrobeItem],
        bottoms: &'a [WardrobeItem],
    ) -> Vec<ScoredPair<'a>> {
        let mut pairs: Vec<ScoredPair<'a>> = tops
            .iter()
            .flat_map(move |top| {
                bottoms.iter().map(move |bottom| ScoredPair {
                    top,
                    bottom,
                    score: score_outfit(&top.attributes, &bottom.attributes),
                })
            })
            .collect();
        pairs.sort_by(|a, b| {
            b.score
                .total
                .partial_cmp(&a.score.total)
                .unwrap_or(Ordering::Equal)
        });
        pairs
    }

    /// The deterministic ranking on its own.
    pub fn rank_rule_based(
        &self,
        tops: &[WardrobeItem],
        bottoms: &[WardrobeItem],
        count: usize,
    ) -> Vec<Candidate> {
        self.score_pairs(tops, bottoms)
            .into_iter()
            .take(count)
            .map(rule_based_candidate)
            .collect()
    }

    pub async fn rank(
        &self,
        tops: &[WardrobeItem],
        bottoms: &[WardrobeItem],
        outers: &[WardrobeItem],
        count: usize,
        context: &RankContext,
        use_llm: bool,
    ) -> RankOutcome {
        let count = count.max(1);

        if tops.is_empty() || bottoms.is_empty() {
            return RankOutcome {
                candidates: Vec::new(),
                method: RankMethod::Empty,
            };
        }

        if let (true, Some(reranker)) = (use_llm, self.reranker.as_ref()) {
            let key = cache_key(
                &ids(tops),
                &ids(bottoms),
                &ids(outers),
                count,
                &context.fingerprint(),
            );

            if let Some(picks) = self.cache.get(&key) {
                let candidates = rejoin(&picks, tops, bottoms, outers);
                if !candidates.is_empty() {
                    info!("Rank cache hit ({} candidates)", candidates.len());
                    return RankOutcome {
                        candidates: candidates.into_iter().take(count).collect(),
                        method: RankMethod::Cache,
                    };
                }
            }

            let scored = self.score_pairs(tops, bottoms);
            match self
                .rerank(reranker.as_ref(), &scored, outers, count, context)
                .await
            {
                Ok(picks) => {
                    let candidates = resolve_picks(&picks, tops, bottoms, outers);
                    if !candidates.is_empty() {
                        self.cache.insert(key, candidates.iter().map(to_cached).collect());
                        return RankOutcome {
                            candidates: candidates.into_iter().take(count).collect(),
                            method: RankMethod::Llm,
                        };
                    }
                    warn!(
                        "Re-ranker picks did not resolve against the pools; \
                         using rule-based order"
                    );
                }
                Err(e) => warn!("Re-ranking failed, using rule-based order: {e}"),
            }
        }

        RankOutcome {
            candidates: self.rank_rule_based(tops, bottoms, count),
            method: RankMethod::RuleBased,
        }
    }

    async fn rerank(
        &self,
        reranker: &dyn Reranker,
        scored: &[ScoredPair<'_>],
        outers: &[WardrobeItem],
        count: usize,
        context: &RankContext,
    ) -> Result<Vec<RerankPick>, RerankError> {
        let shortlist = &scored[..scored.len().min(self.candidate_limit)];

        let mut seen = HashSet::new();
        let tops: Vec<ItemSummary> = shortlist
            .iter()
            .filter(|p| seen.insert(p.top.id))
            .map(|p| ItemSummary::from_item(p.top))
            .collect();
        let mut seen = HashSet::new();
        let bottoms: Vec<ItemSummary> = shortlist
            .iter()
            .filter(|p| seen.insert(p.bottom.id))
            .map(|p| ItemSummary::from_item(p.bottom))
            .collect();
        let outers: Vec<ItemSummary> = outers
            .iter()
            .take(self.candidate_limit)
            .map(ItemSummary::from_item)
            .collect();

        let request = RerankRequest {
            tops: &tops,
            bottoms: &bottoms,
            outers: &outers,
            count,
            context,
        };

        info!(
            "Re-ranking {} pairs ({} tops, {} bottoms, {} outers)",
            shortlist.len(),
            tops.len(),
            bottoms.len(),
            outers.len()
        );

        tokio::time::timeout(self.rerank_timeout, reranker.rerank(&request))
            .await
            .map_err(|_| RerankError::Timeout(self.rerank_timeout.as_secs()))?
    }
}

fn ids(items: &[WardrobeItem]) -> Vec<Uuid> {
    items.iter().map(|i| i.id).collect()
}

fn find<'a>(pool: &'a [WardrobeItem], id: &str) -> Option<&'a WardrobeItem> {
    let id = Uuid::parse_str(id).ok()?;
    pool.iter().find(|item| item.id == id)
}

fn round3(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

fn rule_based_candidate(pair: ScoredPair<'_>) -> Candidate {
    Candidate {
        top: pair.top.clone(),
        bottom: pair.bottom.clone(),
        outer: None,
        score: round3(pair.score.total),
        reasoning: pair.score.reasons.join(", "),
        style_description: style_description(pair.top, pair.bottom),
        reasons: pair.score.reasons,
    }
}

fn style_description(top: &WardrobeItem, bottom: &WardrobeItem) -> String {
    format!(
        "{} & {}",
        top.attributes.display_category("Top"),
        bottom.attributes.display_category("Bottom")
    )
}

/// Maps model picks onto live items. Unresolvable and duplicate picks drop.
fn resolve_picks(
    picks: &[RerankPick],
    tops: &[WardrobeItem],
    bottoms: &[WardrobeItem],
    outers: &[WardrobeItem],
) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    picks
        .iter()
        .filter_map(|pick| {
            let top = find(tops, &pick.top_id)?;
            let bottom = find(bottoms, &pick.bottom_id)?;
            let outer = pick.outer_id.as_deref().and_then(|id| find(outers, id));
            seen.insert((top.id, bottom.id, outer.map(|o| o.id))).then(|| {
                candidate(
                    top,
                    bottom,
                    outer,
                    pick.score,
                    &pick.reasoning,
                    &pick.style_description,
                )
            })
        })
        .collect()
}

/// Rebuilds cached picks against the current pools; picks whose items are
/// gone are silently dropped.
pub fn rejoin(
    picks: &[CachedPick],
    tops: &[WardrobeItem],
    bottoms: &[WardrobeItem],
    outers: &[WardrobeItem],
) -> Vec<Candidate> {
    let by_id = |pool: &'_ [WardrobeItem], id: Uuid| pool.iter().find(|i| i.id == id).cloned();
    picks
        .iter()
        .filter_map(|pick| {
            let top = by_id(tops, pick.top_id)?;
            let bottom = by_id(bottoms, pick.bottom_id)?;
            let outer = pick.outer_id.and_then(|id| by_id(outers, id));
            Some(candidate(
                &top,
                &bottom,
                outer.as_ref(),
                pick.score,
                &pick.reasoning,
                &pick.style_description,
            ))
        })
        .collect()
}

fn candidate(
    top: &WardrobeItem,
    bottom: &WardrobeItem,
    outer: Option<&WardrobeItem>,
    score: f64,
    reasoning: &str,
    description: &str,
) -> Candidate {
    Candidate {
        top: top.clone(),
        bottom: bottom.clone(),
        outer: outer.cloned(),
        score: score.clamp(0.0, 1.0),
        reasons: score_outfit(&top.attributes, &bottom.attributes).reasons,
        reasoning: reasoning.to_string(),
        style_description: if description.is_empty() {
            style_description(top, bottom)
        } else {
            description.to_string()
        },
    }
}

fn to_cached(candidate: &Candidate) -> CachedPick {
    CachedPick {
        top_id: candidate.top.id,
        bottom_id: candidate.bottom.id,
        outer_id: candidate.outer.as_ref().map(|o| o.id),
        score: candidate.score,
        reasoning: candidate.reasoning.clone(),
        style_description: candidate.style_description.clone(),
    }
}
