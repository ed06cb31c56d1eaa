use tonemap_core::types::{CategoryScores, NormalizedUpdate, ScoreRecord};
use tonemap_core::Taxonomy;

use crate::stats::{mean, percentile_rank, sorted_ascending, stddev, z_score};

/// Corpus-wide distribution of one category's raw scores.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub mean: f64,
    pub stddev: f64,
    sorted: Vec<f64>,
}

impl CategoryStats {
    pub fn from_values(values: &[f64]) -> Self {
        Self { mean: mean(values), stddev: stddev(values), sorted: sorted_ascending(values) }
    }

    pub fn count(&self) -> usize { self.sorted.len() }

    pub fn z_score(&self, value: f64) -> f64 { z_score(value, self.mean, self.stddev) }

    pub fn percentile(&self, value: f64) -> f64 { percentile_rank(value, &self.sorted) }
}

/// Per-category statistics over the whole scored corpus, in taxonomy order.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusStats {
    categories: Vec<(String, CategoryStats)>,
}

impl CorpusStats {
    /// First phase: gather every score's raw value per category (absent
    /// categories count as 0.0) and summarize.
    pub fn compute(scores: &[ScoreRecord], taxonomy: &Taxonomy) -> Self {
        let categories = taxonomy
            .names()
            .map(|name| {
                let values: Vec<f64> = scores.iter().map(|s| s.raw(name)).collect();
                (name.to_string(), CategoryStats::from_values(&values))
            })
            .collect();
        Self { categories }
    }

    pub fn get(&self, category: &str) -> Option<&CategoryStats> {
        self.categories.iter().find(|(name, _)| name == category).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryStats)> {
        self.categories.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Second phase for one record.
    pub fn normalize(&self, score: &ScoreRecord) -> NormalizedUpdate {
        let mut z_scores = CategoryScores::new();
        let mut percentiles = CategoryScores::new();
        for (name, stats) in &self.categories {
            let raw = score.raw(name);
            z_scores.insert(name.clone(), stats.z_score(raw));
            percentiles.insert(name.clone(), stats.percentile(raw));
        }
        NormalizedUpdate { item_id: score.item_id.clone(), z_scores, percentiles }
    }
}

/// Rewrite every record's z-scores and percentiles against the full corpus.
/// Recomputes from scratch each call, so repeated runs give identical output.
pub fn normalize_corpus(scores: &mut [ScoreRecord], taxonomy: &Taxonomy) -> CorpusStats {
    let stats = CorpusStats::compute(scores, taxonomy);
    for score in scores.iter_mut() {
        let update = stats.normalize(score);
        score.z_scores = update.z_scores;
        score.percentiles = update.percentiles;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tonemap_core::AnchorCategory;

    fn taxonomy() -> Taxonomy {
        Taxonomy::new(vec![AnchorCategory::new("a", 1.0, &["x"]), AnchorCategory::new("b", 0.0, &["y"])]).expect("valid")
    }

    fn record(id: &str, a: Option<f64>, b: f64) -> ScoreRecord {
        let mut raw = CategoryScores::new();
        if let Some(a) = a { raw.insert("a".into(), a); }
        raw.insert("b".into(), b);
        ScoreRecord {
            item_id: id.into(),
            created_at: Utc::now(),
            raw_scores: raw,
            dominant: "a".into(),
            sentiment: 0.0,
            z_scores: CategoryScores::new(),
            percentiles: CategoryScores::new(),
            scored_at: Utc::now(),
        }
    }

    #[test]
    fn z_scores_and_percentiles_match_hand_computation() {
        let mut scores: Vec<ScoreRecord> =
            [1.0, 2.0, 3.0, 4.0, 5.0].iter().enumerate().map(|(i, &v)| record(&i.to_string(), Some(v), 0.5)).collect();
        let stats = normalize_corpus(&mut scores, &taxonomy());

        let a = stats.get("a").expect("a");
        assert_eq!(a.mean, 3.0);
        assert!((a.stddev - 1.581_138_8).abs() < 1e-6);
        assert!((scores[4].z_scores["a"] - 1.264_911_1).abs() < 1e-6);
        assert_eq!(scores[0].percentiles["a"], 0.0);
        assert_eq!(scores[4].percentiles["a"], 0.8);

        // Flat category: z-score defined as 0, everyone ranks at 0.
        assert_eq!(stats.get("b").map(|b| b.stddev), Some(0.0));
        assert!(scores.iter().all(|s| s.z_scores["b"] == 0.0 && s.percentiles["b"] == 0.0));
    }

    #[test]
    fn missing_categories_count_as_zero() {
        let mut scores = vec![record("x", None, 0.1), record("y", Some(1.0), 0.2)];
        let stats = normalize_corpus(&mut scores, &taxonomy());
        let a = stats.get("a").expect("a");
        assert_eq!(a.count(), 2);
        assert_eq!(a.mean, 0.5);
        assert_eq!(scores[1].percentiles["a"], 0.5);
        assert!(scores[0].z_scores["a"] < 0.0);
    }

    #[test]
    fn ties_share_the_lower_rank() {
        let mut scores: Vec<ScoreRecord> =
            [1.0, 2.0, 2.0, 3.0, 5.0].iter().enumerate().map(|(i, &v)| record(&i.to_string(), Some(v), 0.0)).collect();
        normalize_corpus(&mut scores, &taxonomy());
        assert_eq!(scores[1].percentiles["a"], 0.2);
        assert_eq!(scores[2].percentiles["a"], 0.2);
    }

    #[test]
    fn renormalizing_is_idempotent() {
        let mut scores = vec![record("x", Some(0.31), 0.1), record("y", Some(0.12), 0.7), record("z", None, 0.4)];
        normalize_corpus(&mut scores, &taxonomy());
        let first = scores.clone();
        normalize_corpus(&mut scores, &taxonomy());
        for (a, b) in first.iter().zip(&scores) {
            for (k, v) in &a.z_scores { assert_eq!(v.to_bits(), b.z_scores[k].to_bits()); }
            for (k, v) in &a.percentiles { assert_eq!(v.to_bits(), b.percentiles[k].to_bits()); }
        }
    }

    #[test]
    fn single_record_corpus_is_degenerate_not_an_error() {
        let mut scores = vec![record("only", Some(0.9), 0.9)];
        let stats = normalize_corpus(&mut scores, &taxonomy());
        assert_eq!(stats.get("a").map(|a| a.stddev), Some(0.0));
        assert_eq!(scores[0].z_scores["a"], 0.0);
        assert_eq!(scores[0].percentiles["a"], 0.0);
    }
}
