use anyhow::Result;
use tracing::{debug, info};

use tonemap_core::error::Error;
use tonemap_core::traits::{EmbeddingStore, Embedder, ItemStore};
use tonemap_core::types::{EmbeddingRecord, ItemFilter, ItemId};
use tonemap_core::Taxonomy;

use crate::progress::pass_bar;

/// Embed every anchor phrase under `anchor:<category>:<ordinal>`.
///
/// Only phrases of `taxonomy` whose key has no stored vector are embedded, so
/// switching taxonomies embeds the new set even when old anchors remain.
/// Returns the number of anchors written (0 when all are present).
pub async fn embed_anchors<S>(embedder: &dyn Embedder, store: &S, taxonomy: &Taxonomy, batch_size: usize) -> Result<usize>
where
    S: EmbeddingStore + ?Sized,
{
    let all = taxonomy.phrases();
    let keys: Vec<ItemId> = all.iter().map(|p| p.key.clone()).collect();
    let existing = store.find_embeddings(&keys).await?;
    let phrases: Vec<_> = all.into_iter().filter(|p| !existing.contains_key(&p.key)).collect();
    if phrases.is_empty() {
        info!(existing = existing.len(), "anchors already embedded");
        return Ok(0);
    }
    debug!(missing = phrases.len(), existing = existing.len(), "embedding anchor phrases");

    let pb = pass_bar(phrases.len(), "anchors");
    let mut written = 0usize;
    for chunk in phrases.chunks(batch_size.max(1)) {
        let texts: Vec<String> = chunk.iter().map(|p| p.text.to_string()).collect();
        let vectors = embed_checked(embedder, &texts)?;
        let records: Vec<EmbeddingRecord> = chunk
            .iter()
            .zip(vectors)
            .map(|(p, vector)| EmbeddingRecord { id: p.key.clone(), model: embedder.model_id().to_string(), vector })
            .collect();
        store.upsert_embeddings(&records).await?;
        written += records.len();
        pb.inc(records.len() as u64);
    }
    pb.finish_and_clear();
    info!(anchors = written, categories = taxonomy.len(), "anchor phrases embedded");
    Ok(written)
}

/// Embed every item whose `embedded` flag is false, one batch at a time.
/// Each batch's vectors are written before the items are flagged, so an
/// interrupted run resumes at the first unflagged item.
pub async fn embed_items<S>(embedder: &dyn Embedder, store: &S, batch_size: usize) -> Result<usize>
where
    S: ItemStore + EmbeddingStore + ?Sized,
{
    let batch_size = batch_size.max(1);
    let total = store.count_items(ItemFilter::unembedded()).await?;
    info!(total, batch_size, "embedding items");
    let pb = pass_bar(total, "items");
    let mut embedded = 0usize;
    loop {
        let batch = store.find_items(ItemFilter::unembedded(), 0, batch_size).await?;
        if batch.is_empty() {
            break;
        }
        let texts: Vec<String> = batch.iter().map(|i| i.text.clone()).collect();
        let vectors = embed_checked(embedder, &texts)?;
        let records: Vec<EmbeddingRecord> = batch
            .iter()
            .zip(vectors)
            .map(|(item, vector)| EmbeddingRecord { id: item.id.clone(), model: embedder.model_id().to_string(), vector })
            .collect();
        store.upsert_embeddings(&records).await?;
        let ids: Vec<ItemId> = batch.iter().map(|i| i.id.clone()).collect();
        store.mark_embedded(&ids).await?;
        embedded += ids.len();
        pb.inc(ids.len() as u64);
        debug!(embedded, total, "item batch embedded");
    }
    pb.finish_and_clear();
    info!(embedded, "item embedding done");
    Ok(embedded)
}

fn embed_checked(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let vectors = embedder.embed_batch(texts)?;
    if vectors.len() != texts.len() {
        anyhow::bail!("embedder returned {} vectors for {} texts", vectors.len(), texts.len());
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dim()) {
        return Err(Error::DimensionMismatch { expected: embedder.dim(), got: bad.len() }.into());
    }
    Ok(vectors)
}
