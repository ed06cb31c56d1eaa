use anyhow::Result;
use tracing::{debug, info};

use tonemap_core::traits::ScoreStore;
use tonemap_core::types::NormalizedUpdate;
use tonemap_core::Taxonomy;

use crate::normalizer::CorpusStats;
use crate::progress::pass_bar;

#[derive(Debug, Clone)]
pub struct StatsReport {
    pub updated: usize,
    pub stats: CorpusStats,
}

/// Recompute corpus statistics from every stored score and rewrite each
/// score's z-scores and percentiles, `write_batch_size` records per write.
/// Nothing is incremental: a rerun over an unchanged corpus writes the same values.
pub async fn compute_stats<S>(store: &S, taxonomy: &Taxonomy, write_batch_size: usize) -> Result<StatsReport>
where
    S: ScoreStore + ?Sized,
{
    let scores = store.all_scores().await?;
    info!(scores = scores.len(), categories = taxonomy.len(), "computing corpus statistics");
    let stats = CorpusStats::compute(&scores, taxonomy);
    for (name, s) in stats.iter() {
        debug!(category = name, mean = s.mean, stddev = s.stddev, "category stats");
    }

    let pb = pass_bar(scores.len(), "scores");
    let mut updated = 0usize;
    for chunk in scores.chunks(write_batch_size.max(1)) {
        let updates: Vec<NormalizedUpdate> = chunk.iter().map(|s| stats.normalize(s)).collect();
        store.update_normalized(&updates).await?;
        updated += updates.len();
        pb.inc(updates.len() as u64);
        debug!(updated, total = scores.len(), "normalized scores written");
    }
    pb.finish_and_clear();
    info!(updated, "corpus statistics written");
    Ok(StatsReport { updated, stats })
}
