use std::fmt;

use anyhow::Result;

use tonemap_core::traits::{EmbeddingStore, ItemStore, ScoreStore};
use tonemap_core::types::ItemFilter;
use tonemap_core::Taxonomy;

/// Snapshot of corpus progress through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSummary {
    pub items: usize,
    pub embedded: usize,
    pub scored: usize,
    pub anchors: usize,
    pub anchor_phrases: usize,
    pub scores: usize,
    pub mean_sentiment: f64,
    /// Items per dominant category, in taxonomy order; zero counts included.
    pub dominant: Vec<(String, usize)>,
}

pub async fn summarize<S>(store: &S, taxonomy: &Taxonomy) -> Result<CorpusSummary>
where
    S: ItemStore + EmbeddingStore + ScoreStore + ?Sized,
{
    let items = store.count_items(ItemFilter::all()).await?;
    let embedded = store.count_items(ItemFilter { embedded: Some(true), scored: None }).await?;
    let scored = store.count_items(ItemFilter::scored()).await?;
    let anchors = store.count_anchor_embeddings().await?;
    let scores = store.all_scores().await?;

    let mut dominant: Vec<(String, usize)> = taxonomy.names().map(|n| (n.to_string(), 0)).collect();
    let mut sentiment_sum = 0.0;
    for score in &scores {
        sentiment_sum += score.sentiment;
        if let Some(pos) = taxonomy.position(&score.dominant) {
            dominant[pos].1 += 1;
        }
    }
    let mean_sentiment = if scores.is_empty() { 0.0 } else { sentiment_sum / scores.len() as f64 };

    Ok(CorpusSummary {
        items,
        embedded,
        scored,
        anchors,
        anchor_phrases: taxonomy.phrase_count(),
        scores: scores.len(),
        mean_sentiment,
        dominant,
    })
}

impl fmt::Display for CorpusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "items:     {} ({} embedded, {} scored)", self.items, self.embedded, self.scored)?;
        writeln!(f, "anchors:   {}/{} phrases embedded", self.anchors, self.anchor_phrases)?;
        writeln!(f, "scores:    {} (mean sentiment {:+.4})", self.scores, self.mean_sentiment)?;
        writeln!(f, "dominant:")?;
        for (name, count) in &self.dominant {
            let share = if self.scores == 0 { 0.0 } else { 100.0 * *count as f64 / self.scores as f64 };
            writeln!(f, "  {name:<14} {count:>7}  {share:5.1}%")?;
        }
        Ok(())
    }
}
