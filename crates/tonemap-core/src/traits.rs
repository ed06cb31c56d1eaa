use async_trait::async_trait;
use std::collections::HashMap;

use crate::types::{EmbeddingRecord, Item, ItemFilter, ItemId, NormalizedUpdate, ScoreRecord};

/// Text → unit vector. Implementations must return L2-normalized vectors of
/// length `dim()` for every input.
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert new items and refresh text/timestamp of existing ones,
    /// preserving their lifecycle flags. Returns the number of items written.
    async fn upsert_items(&self, items: &[Item]) -> anyhow::Result<usize>;
    /// Items matching `filter` in storage order, skipping the first `offset`.
    async fn find_items(&self, filter: ItemFilter, offset: usize, limit: usize) -> anyhow::Result<Vec<Item>>;
    async fn count_items(&self, filter: ItemFilter) -> anyhow::Result<usize>;
    async fn mark_embedded(&self, ids: &[ItemId]) -> anyhow::Result<()>;
    async fn mark_scored(&self, ids: &[ItemId]) -> anyhow::Result<()>;
}

#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    async fn upsert_embeddings(&self, records: &[EmbeddingRecord]) -> anyhow::Result<()>;
    /// Vectors for the given ids; ids without a vector are absent from the map.
    async fn find_embeddings(&self, ids: &[ItemId]) -> anyhow::Result<HashMap<ItemId, Vec<f32>>>;
    async fn anchor_embeddings(&self) -> anyhow::Result<Vec<EmbeddingRecord>>;
    async fn count_anchor_embeddings(&self) -> anyhow::Result<usize>;
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Insert or replace scores by item id.
    async fn upsert_scores(&self, scores: &[ScoreRecord]) -> anyhow::Result<()>;
    async fn all_scores(&self) -> anyhow::Result<Vec<ScoreRecord>>;
    async fn count_scores(&self) -> anyhow::Result<usize>;
    /// Overwrite `z_scores` and `percentiles` of existing scores; unknown ids are ignored.
    async fn update_normalized(&self, updates: &[NormalizedUpdate]) -> anyhow::Result<()>;
}

/// Everything the scoring pipeline needs from persistence.
pub trait CorpusStore: ItemStore + EmbeddingStore + ScoreStore {}

impl<T: ItemStore + EmbeddingStore + ScoreStore> CorpusStore for T {}
