//! In-process implementation of all three store surfaces.
//!
//! Keeps storage order the way a table scan would: items, embeddings and
//! scores are held in insertion order and upserts replace in place.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::Error;
use crate::traits::{EmbeddingStore, ItemStore, ScoreStore};
use crate::types::{EmbeddingRecord, Item, ItemFilter, ItemId, NormalizedUpdate, ScoreRecord};

#[derive(Default)]
struct Inner {
    items: Vec<Item>,
    item_index: HashMap<ItemId, usize>,
    embeddings: Vec<EmbeddingRecord>,
    embedding_index: HashMap<String, usize>,
    scores: Vec<ScoreRecord>,
    score_index: HashMap<ItemId, usize>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| Error::StoreUnavailable("memory store lock poisoned".into()).into())
    }

    /// Snapshot of one item, mainly for inspection in tests.
    pub fn item(&self, id: &str) -> Option<Item> {
        let inner = self.inner.lock().ok()?;
        inner.item_index.get(id).map(|&i| inner.items[i].clone())
    }

    pub fn score(&self, id: &str) -> Option<ScoreRecord> {
        let inner = self.inner.lock().ok()?;
        inner.score_index.get(id).map(|&i| inner.scores[i].clone())
    }
}

fn set_flag(inner: &mut Inner, ids: &[ItemId], apply: impl Fn(&mut Item)) {
    for id in ids {
        if let Some(&i) = inner.item_index.get(id) {
            apply(&mut inner.items[i]);
        }
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn upsert_items(&self, items: &[Item]) -> anyhow::Result<usize> {
        let mut inner = self.lock()?;
        let mut written = HashSet::new();
        for item in items {
            written.insert(item.id.as_str());
            match inner.item_index.get(&item.id).copied() {
                Some(i) => {
                    let existing = &mut inner.items[i];
                    existing.text = item.text.clone();
                    existing.created_at = item.created_at;
                }
                None => {
                    let pos = inner.items.len();
                    inner.item_index.insert(item.id.clone(), pos);
                    inner.items.push(Item { embedded: false, scored: false, ..item.clone() });
                }
            }
        }
        Ok(written.len())
    }

    async fn find_items(&self, filter: ItemFilter, offset: usize, limit: usize) -> anyhow::Result<Vec<Item>> {
        let inner = self.lock()?;
        Ok(inner.items.iter().filter(|i| filter.matches(i)).skip(offset).take(limit).cloned().collect())
    }

    async fn count_items(&self, filter: ItemFilter) -> anyhow::Result<usize> {
        let inner = self.lock()?;
        Ok(inner.items.iter().filter(|i| filter.matches(i)).count())
    }

    async fn mark_embedded(&self, ids: &[ItemId]) -> anyhow::Result<()> {
        let mut inner = self.lock()?;
        set_flag(&mut inner, ids, |item| item.embedded = true);
        Ok(())
    }

    async fn mark_scored(&self, ids: &[ItemId]) -> anyhow::Result<()> {
        let mut inner = self.lock()?;
        set_flag(&mut inner, ids, |item| item.scored = true);
        Ok(())
    }
}

#[async_trait]
impl EmbeddingStore for MemoryStore {
    async fn upsert_embeddings(&self, records: &[EmbeddingRecord]) -> anyhow::Result<()> {
        let mut inner = self.lock()?;
        for record in records {
            match inner.embedding_index.get(&record.id).copied() {
                Some(i) => inner.embeddings[i] = record.clone(),
                None => {
                    let pos = inner.embeddings.len();
                    inner.embedding_index.insert(record.id.clone(), pos);
                    inner.embeddings.push(record.clone());
                }
            }
        }
        Ok(())
    }

    async fn find_embeddings(&self, ids: &[ItemId]) -> anyhow::Result<HashMap<ItemId, Vec<f32>>> {
        let inner = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.embedding_index.get(id).map(|&i| (id.clone(), inner.embeddings[i].vector.clone())))
            .collect())
    }

    async fn anchor_embeddings(&self) -> anyhow::Result<Vec<EmbeddingRecord>> {
        let inner = self.lock()?;
        Ok(inner.embeddings.iter().filter(|e| e.is_anchor()).cloned().collect())
    }

    async fn count_anchor_embeddings(&self) -> anyhow::Result<usize> {
        let inner = self.lock()?;
        Ok(inner.embeddings.iter().filter(|e| e.is_anchor()).count())
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn upsert_scores(&self, scores: &[ScoreRecord]) -> anyhow::Result<()> {
        let mut inner = self.lock()?;
        for score in scores {
            match inner.score_index.get(&score.item_id).copied() {
                Some(i) => inner.scores[i] = score.clone(),
                None => {
                    let pos = inner.scores.len();
                    inner.score_index.insert(score.item_id.clone(), pos);
                    inner.scores.push(score.clone());
                }
            }
        }
        Ok(())
    }

    async fn all_scores(&self) -> anyhow::Result<Vec<ScoreRecord>> {
        Ok(self.lock()?.scores.clone())
    }

    async fn count_scores(&self) -> anyhow::Result<usize> {
        Ok(self.lock()?.scores.len())
    }

    async fn update_normalized(&self, updates: &[NormalizedUpdate]) -> anyhow::Result<()> {
        let mut inner = self.lock()?;
        for update in updates {
            if let Some(&i) = inner.score_index.get(&update.item_id) {
                let score = &mut inner.scores[i];
                score.z_scores = update.z_scores.clone();
                score.percentiles = update.percentiles.clone();
            }
        }
        Ok(())
    }
}
