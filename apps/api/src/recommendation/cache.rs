//! Bounded memo of re-ranked outfit picks.
//!
//! Entries store ids, never items: a hit is rejoined against the live pool by
//! the ranker, so deleted items drop out instead of resurfacing. FIFO
//! eviction at capacity; lookup and insert each take the lock once.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPick {
    pub top_id: Uuid,
    pub bottom_id: Uuid,
    pub outer_id: Option<Uuid>,
    pub score: f64,
    pub reasoning: String,
    pub style_description: String,
}

/// Key over the sorted id sets, the requested count, and a fingerprint of
/// any request context (user request, weather).
pub fn cache_key(
    top_ids: &[Uuid],
    bottom_ids: &[Uuid],
    outer_ids: &[Uuid],
    count: usize,
    context: &str,
) -> String {
    let mut hasher = Sha256::new();
    for (label, ids) in [("tops", top_ids), ("bottoms", bottom_ids), ("outers", outer_ids)] {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        hasher.update(label.as_bytes());
        for id in sorted {
            hasher.update(id.as_bytes());
        }
    }
    hasher.update(count.to_le_bytes());
    hasher.update(context.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Vec<CachedPick>>,
    order: VecDeque<String>,
}

pub struct RankCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl RankCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<CachedPick>> {
        self.inner.lock().entries.get(key).cloned()
    }

    /// Inserts or replaces `key`, evicting the oldest entries when full.
    pub fn insert(&self, key: String, picks: Vec<CachedPick>) {
        if self.capacity == 0 || picks.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.entries.contains_key(&key) {
            inner.entries.insert(key, picks);
            return;
        }
        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(key, picks);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick() -> CachedPick {
        CachedPick {
            top_id: Uuid::new_v4(),
            bottom_id: Uuid::new_v4(),
            outer_id: None,
            score: 0.9,
            reasoning: "navy and white".to_string(),
            style_description: "clean".to_string(),
        }
    }

    #[test]
    fn test_key_ignores_id_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(
            cache_key(&[a, b], &[c], &[], 2, ""),
            cache_key(&[b, a], &[c], &[], 2, "")
        );
    }

    #[test]
    fn test_key_distinguishes_count_role_and_context() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let base = cache_key(&[a], &[b], &[], 1, "");
        assert_ne!(base, cache_key(&[a], &[b], &[], 2, ""));
        assert_ne!(base, cache_key(&[b], &[a], &[], 1, ""));
        assert_ne!(base, cache_key(&[a], &[b], &[], 1, "rainy day"));
        assert_eq!(base.len(), 64);
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let cache = RankCache::new(2);
        cache.insert("a".to_string(), vec![pick()]);
        cache.insert("b".to_string(), vec![pick()]);
        cache.insert("c".to_string(), vec![pick()]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_replacing_a_key_does_not_evict() {
        let cache = RankCache::new(2);
        cache.insert("a".to_string(), vec![pick()]);
        cache.insert("b".to_string(), vec![pick()]);
        let replacement = vec![pick(), pick()];
        cache.insert("a".to_string(), replacement.clone());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(replacement));
    }

    #[test]
    fn test_empty_picks_and_zero_capacity_are_not_cached() {
        let cache = RankCache::new(2);
        cache.insert("a".to_string(), vec![]);
        assert!(cache.get("a").is_none());

        let disabled = RankCache::new(0);
        disabled.insert("a".to_string(), vec![pick()]);
        assert_eq!(disabled.len(), 0);
    }
}
