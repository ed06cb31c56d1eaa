//! Anchor-similarity scoring and corpus normalization, plus the resumable
//! batch passes that drive them over a [`tonemap_core::traits::CorpusStore`].

pub mod anchor_set;
pub mod cosine;
pub mod embed_pass;
pub mod normalizer;
pub mod pipeline;
mod progress;
pub mod score_pass;
pub mod scorer;
pub mod stats;
pub mod stats_pass;
pub mod summary;

pub use anchor_set::{load_anchor_set, AnchorSet};
pub use embed_pass::{embed_anchors, embed_items};
pub use normalizer::{normalize_corpus, CategoryStats, CorpusStats};
pub use pipeline::{run_pipeline, PipelineOptions, PipelineReport};
pub use score_pass::{score_items, ScoreReport};
pub use scorer::{score_item, ItemScores};
pub use stats_pass::{compute_stats, StatsReport};
pub use summary::{summarize, CorpusSummary};
