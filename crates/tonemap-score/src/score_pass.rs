use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use tonemap_core::error::Error;
use tonemap_core::traits::{EmbeddingStore, ItemStore, ScoreStore};
use tonemap_core::types::{ItemFilter, ItemId, ScoreRecord};

use crate::anchor_set::AnchorSet;
use crate::progress::pass_bar;
use crate::scorer::score_item;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreReport {
    pub scored: usize,
    /// Items left unscored because their vector was missing; retried next run.
    pub skipped_missing_embedding: usize,
    pub batches: usize,
}

/// Score every embedded, unscored item against `anchors`.
///
/// Each batch is persisted and its items flagged before the next batch is
/// read, so a crash loses at most one batch of work. Items with no stored
/// vector keep `scored = false`; the read offset moves past them so the
/// pass still terminates. Fails with [`Error::NoAnchorVectors`] before
/// reading any item when `anchors` is empty.
pub async fn score_items<S>(store: &S, anchors: &AnchorSet, batch_size: usize) -> Result<ScoreReport>
where
    S: ItemStore + EmbeddingStore + ScoreStore + ?Sized,
{
    if anchors.total() == 0 {
        return Err(Error::NoAnchorVectors.into());
    }
    let batch_size = batch_size.max(1);
    let total = store.count_items(ItemFilter::ready_to_score()).await?;
    info!(total, batch_size, anchors = anchors.total(), "scoring items");
    let pb = pass_bar(total, "items");
    let mut report = ScoreReport::default();

    loop {
        let batch = store.find_items(ItemFilter::ready_to_score(), report.skipped_missing_embedding, batch_size).await?;
        if batch.is_empty() {
            break;
        }
        let ids: Vec<ItemId> = batch.iter().map(|i| i.id.clone()).collect();
        let vectors = store.find_embeddings(&ids).await?;

        let scored_at = Utc::now();
        let mut scores: Vec<ScoreRecord> = Vec::with_capacity(batch.len());
        for item in &batch {
            let Some(vector) = vectors.get(&item.id) else {
                warn!(error = %Error::MissingEmbedding(item.id.clone()), "skipping item");
                report.skipped_missing_embedding += 1;
                continue;
            };
            if let Some(dim) = anchors.dim() {
                if vector.len() != dim {
                    return Err(Error::DimensionMismatch { expected: dim, got: vector.len() }.into());
                }
            }
            scores.push(score_item(vector, anchors).into_record(item, scored_at));
        }

        if !scores.is_empty() {
            store.upsert_scores(&scores).await?;
            let done: Vec<ItemId> = scores.iter().map(|s| s.item_id.clone()).collect();
            store.mark_scored(&done).await?;
        }
        report.scored += scores.len();
        report.batches += 1;
        pb.inc(batch.len() as u64);
        debug!(scored = report.scored, skipped = report.skipped_missing_embedding, total, "score batch written");
    }

    pb.finish_and_clear();
    info!(scored = report.scored, skipped = report.skipped_missing_embedding, "scoring done");
    Ok(report)
}
