//! The live item pool.
//!
//! Process-wide and in-memory. Ranking reads its pools from here, and cached
//! rankings are rejoined against it, so removing an item here is enough to
//! drop it from every later recommendation.

pub mod handlers;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extraction::models::AttributeRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardrobeItem {
    pub id: Uuid,
    pub attributes: AttributeRecord,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WardrobeItem {
    pub fn new(attributes: AttributeRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            attributes,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn category(&self) -> &str {
        &self.attributes.category.main
    }
}

#[derive(Default)]
struct Inner {
    items: HashMap<Uuid, (u64, WardrobeItem)>,
    next_seq: u64,
}

#[derive(Default)]
pub struct WardrobeStore {
    inner: RwLock<Inner>,
}

impl WardrobeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: WardrobeItem) {
        let mut inner = self.inner.write();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.items.insert(item.id, (seq, item));
    }

    pub fn get(&self, id: Uuid) -> Option<WardrobeItem> {
        self.inner.read().items.get(&id).map(|(_, item)| item.clone())
    }

    /// All items, oldest first.
    pub fn list(&self) -> Vec<WardrobeItem> {
        self.filtered(|_| true)
    }

    /// Items whose `category.main` equals `main`, oldest first.
    pub fn by_category(&self, main: &str) -> Vec<WardrobeItem> {
        self.filtered(|item| item.category() == main)
    }

    pub fn remove(&self, id: Uuid) -> Option<WardrobeItem> {
        self.inner.write().items.remove(&id).map(|(_, item)| item)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    fn filtered(&self, keep: impl Fn(&WardrobeItem) -> bool) -> Vec<WardrobeItem> {
        let inner = self.inner.read();
        let mut items: Vec<&(u64, WardrobeItem)> =
            inner.items.values().filter(|(_, item)| keep(item)).collect();
        items.sort_by_key(|(seq, _)| *seq);
        items.into_iter().map(|(_, item)| item.clone()).collect()
    }
}
