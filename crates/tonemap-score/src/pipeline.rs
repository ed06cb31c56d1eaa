use anyhow::Result;
use tracing::info;

use tonemap_core::config::Settings;
use tonemap_core::traits::{CorpusStore, Embedder};
use tonemap_core::Taxonomy;

use crate::anchor_set::load_anchor_set;
use crate::embed_pass::{embed_anchors, embed_items};
use crate::score_pass::{score_items, ScoreReport};
use crate::stats_pass::{compute_stats, StatsReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub embed_batch_size: usize,
    pub score_batch_size: usize,
    pub stats_write_batch_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self { Self { embed_batch_size: 32, score_batch_size: 200, stats_write_batch_size: 500 } }
}

impl From<&Settings> for PipelineOptions {
    fn from(s: &Settings) -> Self {
        Self {
            embed_batch_size: s.embedding.batch_size,
            score_batch_size: s.scoring.batch_size,
            stats_write_batch_size: s.stats.write_batch_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub anchors_embedded: usize,
    pub items_embedded: usize,
    pub scoring: ScoreReport,
    pub stats: StatsReport,
}

/// anchors → item vectors → scores → corpus normalization, in that order.
pub async fn run_pipeline<S>(embedder: &dyn Embedder, store: &S, taxonomy: &Taxonomy, opts: PipelineOptions) -> Result<PipelineReport>
where
    S: CorpusStore + ?Sized,
{
    let anchors_embedded = embed_anchors(embedder, store, taxonomy, opts.embed_batch_size).await?;
    let items_embedded = embed_items(embedder, store, opts.embed_batch_size).await?;
    let anchors = load_anchor_set(store, taxonomy.clone()).await?;
    let scoring = score_items(store, &anchors, opts.score_batch_size).await?;
    let stats = compute_stats(store, taxonomy, opts.stats_write_batch_size).await?;
    info!(
        anchors_embedded,
        items_embedded,
        scored = scoring.scored,
        skipped = scoring.skipped_missing_embedding,
        normalized = stats.updated,
        "pipeline finished"
    );
    Ok(PipelineReport { anchors_embedded, items_embedded, scoring, stats })
}
