//! LanceDB persistence for items, embeddings and scores.
//!
//! One database directory holds three tables. Item lifecycle flags are plain
//! boolean columns flipped with SQL updates; embeddings and scores are upserted
//! with `merge_insert` keyed by id so every write is idempotent.

use anyhow::Result;
use arrow_array::{BooleanArray, FixedSizeListArray, Float64Array, RecordBatch, StringArray, TimestampMillisecondArray};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use tonemap_core::config::StoreSettings;
use tonemap_core::error::Error;
use tonemap_core::traits::{EmbeddingStore, ItemStore, ScoreStore};
use tonemap_core::types::{CategoryScores, EmbeddingRecord, Item, ItemFilter, ItemId, NormalizedUpdate, ScoreRecord, ANCHOR_PREFIX};

pub mod schema;
pub mod table;

use schema::{build_embeddings_schema, build_items_schema, build_scores_schema};
use table::{
    bool_col, datetime_at, ensure_table, f64_col, in_filter, open_db, single_batch_reader, string_col, timestamp_col, vector_at,
    vector_col,
};

/// Ids per `IN (...)` lookup.
const LOOKUP_CHUNK: usize = 500;

pub struct LanceStore {
    conn: Connection,
    items_table: String,
    embeddings_table: String,
    scores_table: String,
    dim: usize,
}

impl LanceStore {
    /// Connect and create any missing table.
    pub async fn open(settings: &StoreSettings, dim: usize) -> Result<Self> {
        let uri = settings.resolved_uri();
        let uri = uri.to_string_lossy();
        let conn = open_db(&uri).await.map_err(|e| Error::StoreUnavailable(format!("{uri}: {e}")))?;
        let store = Self {
            conn,
            items_table: settings.items_table.clone(),
            embeddings_table: settings.embeddings_table.clone(),
            scores_table: settings.scores_table.clone(),
            dim,
        };
        ensure_table(&store.conn, &store.items_table, build_items_schema()).await?;
        ensure_table(&store.conn, &store.embeddings_table, build_embeddings_schema(store.dim_i32()?)).await?;
        ensure_table(&store.conn, &store.scores_table, build_scores_schema()).await?;
        info!(uri = %uri, dim, "lance store ready");
        Ok(store)
    }

    pub fn dim(&self) -> usize { self.dim }

    fn dim_i32(&self) -> Result<i32> {
        i32::try_from(self.dim).map_err(|_| Error::InvalidConfig(format!("embedding dim {} too large", self.dim)).into())
    }

    async fn table(&self, name: &str) -> Result<Table> {
        Ok(self.conn.open_table(name).execute().await?)
    }

    async fn scan(&self, table: &str, filter: Option<String>, offset: usize, limit: Option<usize>) -> Result<Vec<RecordBatch>> {
        let t = self.table(table).await?;
        let mut query = t.query();
        if let Some(filter) = filter {
            query = query.only_if(filter);
        }
        if offset > 0 {
            query = query.offset(offset);
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let stream = query.execute().await?;
        Ok(stream.try_collect::<Vec<_>>().await?)
    }

    async fn scan_ids(&self, table: &str, column: &str, ids: &[ItemId]) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        for chunk in ids.chunks(LOOKUP_CHUNK) {
            batches.extend(self.scan(table, Some(in_filter(column, chunk)), 0, None).await?);
        }
        Ok(batches)
    }

    async fn set_flag(&self, column: &str, ids: &[ItemId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let t = self.table(&self.items_table).await?;
        for chunk in ids.chunks(LOOKUP_CHUNK) {
            t.update().only_if(in_filter("id", chunk)).column(column, "true").execute().await?;
        }
        debug!(column, n = ids.len(), "item flags set");
        Ok(())
    }

    async fn merge_by(&self, table: &str, key: &str, batch: RecordBatch, insert_new: bool) -> Result<()> {
        let t = self.table(table).await?;
        let mut mi = t.merge_insert(&[key]);
        mi.when_matched_update_all(None);
        if insert_new {
            mi.when_not_matched_insert_all();
        }
        mi.execute(single_batch_reader(batch)).await?;
        Ok(())
    }
}

fn item_filter_sql(filter: ItemFilter) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(embedded) = filter.embedded {
        parts.push(format!("embedded = {embedded}"));
    }
    if let Some(scored) = filter.scored {
        parts.push(format!("scored = {scored}"));
    }
    if parts.is_empty() { None } else { Some(parts.join(" AND ")) }
}

fn anchor_filter() -> String {
    format!("id LIKE '{ANCHOR_PREFIX}%'")
}

fn items_to_batch(items: &[Item]) -> Result<RecordBatch> {
    Ok(RecordBatch::try_new(
        build_items_schema(),
        vec![
            Arc::new(StringArray::from(items.iter().map(|i| i.id.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(items.iter().map(|i| i.text.clone()).collect::<Vec<_>>())),
            Arc::new(TimestampMillisecondArray::from(items.iter().map(|i| i.created_at.timestamp_millis()).collect::<Vec<_>>())),
            Arc::new(BooleanArray::from(items.iter().map(|i| i.embedded).collect::<Vec<_>>())),
            Arc::new(BooleanArray::from(items.iter().map(|i| i.scored).collect::<Vec<_>>())),
        ],
    )?)
}

fn batch_to_items(batch: &RecordBatch, out: &mut Vec<Item>) -> Result<()> {
    let ids = string_col(batch, "id")?;
    let texts = string_col(batch, "text")?;
    let created = timestamp_col(batch, "created_at")?;
    let embedded = bool_col(batch, "embedded")?;
    let scored = bool_col(batch, "scored")?;
    for i in 0..batch.num_rows() {
        out.push(Item {
            id: ids.value(i).to_string(),
            text: texts.value(i).to_string(),
            created_at: datetime_at(created, i)?,
            embedded: embedded.value(i),
            scored: scored.value(i),
        });
    }
    Ok(())
}

fn json_column<'a>(maps: impl Iterator<Item = &'a CategoryScores>) -> Result<StringArray> {
    let values = maps.map(serde_json::to_string).collect::<Result<Vec<_>, _>>()?;
    Ok(StringArray::from(values))
}

fn scores_to_batch(scores: &[ScoreRecord]) -> Result<RecordBatch> {
    Ok(RecordBatch::try_new(
        build_scores_schema(),
        vec![
            Arc::new(StringArray::from(scores.iter().map(|s| s.item_id.clone()).collect::<Vec<_>>())),
            Arc::new(TimestampMillisecondArray::from(scores.iter().map(|s| s.created_at.timestamp_millis()).collect::<Vec<_>>())),
            Arc::new(json_column(scores.iter().map(|s| &s.raw_scores))?),
            Arc::new(StringArray::from(scores.iter().map(|s| s.dominant.clone()).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(scores.iter().map(|s| s.sentiment).collect::<Vec<_>>())),
            Arc::new(json_column(scores.iter().map(|s| &s.z_scores))?),
            Arc::new(json_column(scores.iter().map(|s| &s.percentiles))?),
            Arc::new(TimestampMillisecondArray::from(scores.iter().map(|s| s.scored_at.timestamp_millis()).collect::<Vec<_>>())),
        ],
    )?)
}

fn batch_to_scores(batch: &RecordBatch, out: &mut Vec<ScoreRecord>) -> Result<()> {
    let ids = string_col(batch, "item_id")?;
    let created = timestamp_col(batch, "created_at")?;
    let raw = string_col(batch, "raw_scores")?;
    let dominant = string_col(batch, "dominant")?;
    let sentiment = f64_col(batch, "sentiment")?;
    let z = string_col(batch, "z_scores")?;
    let pct = string_col(batch, "percentiles")?;
    let scored_at = timestamp_col(batch, "scored_at")?;
    for i in 0..batch.num_rows() {
        out.push(ScoreRecord {
            item_id: ids.value(i).to_string(),
            created_at: datetime_at(created, i)?,
            raw_scores: serde_json::from_str(raw.value(i))?,
            dominant: dominant.value(i).to_string(),
            sentiment: sentiment.value(i),
            z_scores: serde_json::from_str(z.value(i))?,
            percentiles: serde_json::from_str(pct.value(i))?,
            scored_at: datetime_at(scored_at, i)?,
        });
    }
    Ok(())
}

fn batch_to_embeddings(batch: &RecordBatch, out: &mut Vec<EmbeddingRecord>) -> Result<()> {
    let ids = string_col(batch, "id")?;
    let models = string_col(batch, "model")?;
    let vectors = vector_col(batch, "vector")?;
    for i in 0..batch.num_rows() {
        out.push(EmbeddingRecord { id: ids.value(i).to_string(), model: models.value(i).to_string(), vector: vector_at(vectors, i) });
    }
    Ok(())
}

#[async_trait]
impl ItemStore for LanceStore {
    async fn upsert_items(&self, items: &[Item]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        // Last occurrence wins when the input repeats an id.
        let mut latest: HashMap<&str, &Item> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for item in items {
            if latest.insert(item.id.as_str(), item).is_none() {
                order.push(item.id.as_str());
            }
        }
        let ids: Vec<ItemId> = order.iter().map(|id| id.to_string()).collect();

        let mut existing = Vec::new();
        for batch in self.scan_ids(&self.items_table, "id", &ids).await? {
            batch_to_items(&batch, &mut existing)?;
        }
        let flags: HashMap<String, (bool, bool)> = existing.into_iter().map(|i| (i.id, (i.embedded, i.scored))).collect();

        let rows: Vec<Item> = order
            .iter()
            .filter_map(|id| latest.get(id).copied())
            .map(|item| {
                let (embedded, scored) = flags.get(&item.id).copied().unwrap_or((false, false));
                Item { embedded, scored, ..item.clone() }
            })
            .collect();
        self.merge_by(&self.items_table, "id", items_to_batch(&rows)?, true).await?;
        debug!(n = rows.len(), refreshed = flags.len(), "items upserted");
        Ok(rows.len())
    }

    async fn find_items(&self, filter: ItemFilter, offset: usize, limit: usize) -> Result<Vec<Item>> {
        let mut out = Vec::new();
        for batch in self.scan(&self.items_table, item_filter_sql(filter), offset, Some(limit)).await? {
            batch_to_items(&batch, &mut out)?;
        }
        Ok(out)
    }

    async fn count_items(&self, filter: ItemFilter) -> Result<usize> {
        let t = self.table(&self.items_table).await?;
        Ok(t.count_rows(item_filter_sql(filter)).await?)
    }

    async fn mark_embedded(&self, ids: &[ItemId]) -> Result<()> {
        self.set_flag("embedded", ids).await
    }

    async fn mark_scored(&self, ids: &[ItemId]) -> Result<()> {
        self.set_flag("scored", ids).await
    }
}

#[async_trait]
impl EmbeddingStore for LanceStore {
    async fn upsert_embeddings(&self, records: &[EmbeddingRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if let Some(bad) = records.iter().find(|r| r.vector.len() != self.dim) {
            return Err(Error::DimensionMismatch { expected: self.dim, got: bad.vector.len() }.into());
        }
        let now = Utc::now().timestamp_millis();
        let vectors: Vec<Option<Vec<Option<f32>>>> = records.iter().map(|r| Some(r.vector.iter().map(|&x| Some(x)).collect())).collect();
        let batch = RecordBatch::try_new(
            build_embeddings_schema(self.dim_i32()?),
            vec![
                Arc::new(StringArray::from(records.iter().map(|r| r.id.clone()).collect::<Vec<_>>())),
                Arc::new(StringArray::from(records.iter().map(|r| r.model.clone()).collect::<Vec<_>>())),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), self.dim_i32()?)),
                Arc::new(TimestampMillisecondArray::from(vec![now; records.len()])),
            ],
        )?;
        self.merge_by(&self.embeddings_table, "id", batch, true).await
    }

    async fn find_embeddings(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, Vec<f32>>> {
        let mut records = Vec::new();
        for batch in self.scan_ids(&self.embeddings_table, "id", ids).await? {
            batch_to_embeddings(&batch, &mut records)?;
        }
        Ok(records.into_iter().filter(|r| !r.vector.is_empty()).map(|r| (r.id, r.vector)).collect())
    }

    async fn anchor_embeddings(&self) -> Result<Vec<EmbeddingRecord>> {
        let mut records = Vec::new();
        for batch in self.scan(&self.embeddings_table, Some(anchor_filter()), 0, None).await? {
            batch_to_embeddings(&batch, &mut records)?;
        }
        Ok(records)
    }

    async fn count_anchor_embeddings(&self) -> Result<usize> {
        let t = self.table(&self.embeddings_table).await?;
        Ok(t.count_rows(Some(anchor_filter())).await?)
    }
}

#[async_trait]
impl ScoreStore for LanceStore {
    async fn upsert_scores(&self, scores: &[ScoreRecord]) -> Result<()> {
        if scores.is_empty() {
            return Ok(());
        }
        self.merge_by(&self.scores_table, "item_id", scores_to_batch(scores)?, true).await
    }

    async fn all_scores(&self) -> Result<Vec<ScoreRecord>> {
        let mut out = Vec::new();
        for batch in self.scan(&self.scores_table, None, 0, None).await? {
            batch_to_scores(&batch, &mut out)?;
        }
        Ok(out)
    }

    async fn count_scores(&self) -> Result<usize> {
        let t = self.table(&self.scores_table).await?;
        Ok(t.count_rows(None).await?)
    }

    async fn update_normalized(&self, updates: &[NormalizedUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let ids: Vec<ItemId> = updates.iter().map(|u| u.item_id.clone()).collect();
        let mut current = Vec::new();
        for batch in self.scan_ids(&self.scores_table, "item_id", &ids).await? {
            batch_to_scores(&batch, &mut current)?;
        }
        let by_id: HashMap<&str, &NormalizedUpdate> = updates.iter().map(|u| (u.item_id.as_str(), u)).collect();
        for score in &mut current {
            if let Some(update) = by_id.get(score.item_id.as_str()) {
                score.z_scores = update.z_scores.clone();
                score.percentiles = update.percentiles.clone();
            }
        }
        if current.is_empty() {
            return Ok(());
        }
        // Matched rows only: ids without a stored score are dropped.
        self.merge_by(&self.scores_table, "item_id", scores_to_batch(&current)?, false).await
    }
}
