use chrono::{DateTime, Utc};

use tonemap_core::types::{CategoryScores, Item, ScoreRecord};

use crate::anchor_set::AnchorSet;
use crate::cosine::cosine;

/// Per-item output of the similarity scorer, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemScores {
    pub raw_scores: CategoryScores,
    pub dominant: String,
    pub sentiment: f64,
}

impl ItemScores {
    pub fn into_record(self, item: &Item, scored_at: DateTime<Utc>) -> ScoreRecord {
        ScoreRecord {
            item_id: item.id.clone(),
            created_at: item.created_at,
            raw_scores: self.raw_scores,
            dominant: self.dominant,
            sentiment: self.sentiment,
            z_scores: CategoryScores::new(),
            percentiles: CategoryScores::new(),
            scored_at,
        }
    }
}

/// Score one item vector against every anchor category.
///
/// - raw score = mean dot product with each of the category's anchor vectors;
///   categories without anchors get no raw score.
/// - dominant = highest raw score scanning in taxonomy order, first one wins
///   exact ties; the first taxonomy category when nothing was scored.
/// - sentiment = Σ raw × valence divided by the full category count,
///   including categories that had no anchors.
pub fn score_item(item_vector: &[f32], anchors: &AnchorSet) -> ItemScores {
    let taxonomy = anchors.taxonomy();
    let mut raw_scores = CategoryScores::new();
    let mut sentiment_sum = 0.0;
    let mut best: Option<(&str, f64)> = None;

    for (index, category) in taxonomy.categories.iter().enumerate() {
        let vectors = anchors.anchors(index);
        if vectors.is_empty() {
            continue;
        }
        let total: f64 = vectors.iter().map(|a| cosine(item_vector, a)).sum();
        let avg = total / vectors.len() as f64;
        raw_scores.insert(category.name.clone(), avg);
        sentiment_sum += avg * category.valence;
        if best.map_or(true, |(_, top)| avg > top) {
            best = Some((category.name.as_str(), avg));
        }
    }

    let dominant = best
        .map(|(name, _)| name)
        .or_else(|| taxonomy.names().next())
        .unwrap_or_default()
        .to_string();
    let sentiment = if taxonomy.is_empty() { 0.0 } else { sentiment_sum / taxonomy.len() as f64 };

    ItemScores { raw_scores, dominant, sentiment }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonemap_core::types::AnchorVector;
    use tonemap_core::{AnchorCategory, Taxonomy};

    fn taxonomy3() -> Taxonomy {
        Taxonomy::new(vec![
            AnchorCategory::new("calm", 1.0, &["p"]),
            AnchorCategory::new("tense", -1.0, &["q"]),
            AnchorCategory::new("wry", 0.5, &["r"]),
        ])
        .expect("valid")
    }

    fn anchor(category: &str, ordinal: usize, vector: &[f32]) -> AnchorVector {
        AnchorVector { category: category.into(), ordinal, vector: vector.to_vec() }
    }

    #[test]
    fn raw_score_is_mean_similarity_over_all_anchors() {
        let set = AnchorSet::from_vectors(
            taxonomy3(),
            vec![
                anchor("calm", 0, &[1.0, 0.0, 0.0]),
                anchor("calm", 1, &[0.0, 1.0, 0.0]),
                anchor("tense", 2, &[0.0, 0.0, 1.0]),
                anchor("wry", 3, &[0.0, -1.0, 0.0]),
            ],
        )
        .expect("set");
        let s = score_item(&[0.6, 0.8, 0.0], &set);
        assert!((s.raw_scores["calm"] - 0.7).abs() < 1e-6);
        assert!(s.raw_scores["tense"].abs() < 1e-9);
        assert!((s.raw_scores["wry"] + 0.8).abs() < 1e-6);
        assert_eq!(s.dominant, "calm");
        let expected = (0.7 * 1.0 + 0.0 * -1.0 + -0.8 * 0.5) / 3.0;
        assert!((s.sentiment - expected).abs() < 1e-6);
    }

    #[test]
    fn exact_ties_go_to_the_first_category_in_taxonomy_order() {
        let set = AnchorSet::from_vectors(
            taxonomy3(),
            vec![anchor("calm", 0, &[0.0, 1.0]), anchor("tense", 1, &[1.0, 0.0]), anchor("wry", 2, &[1.0, 0.0])],
        )
        .expect("set");
        let s = score_item(&[1.0, 0.0], &set);
        assert_eq!(s.raw_scores["tense"], s.raw_scores["wry"]);
        assert_eq!(s.dominant, "tense");
    }

    #[test]
    fn sentiment_divides_by_full_category_count() {
        let set = AnchorSet::from_vectors(taxonomy3(), vec![anchor("calm", 0, &[1.0, 0.0]), anchor("wry", 2, &[0.0, 1.0])])
            .expect("set");
        let s = score_item(&[0.8, 0.6], &set);
        assert!(!s.raw_scores.contains_key("tense"), "anchorless category gets no raw score");
        let expected = (0.8 * 1.0 + 0.6 * 0.5) / 3.0;
        assert!((s.sentiment - expected).abs() < 1e-6, "got {}", s.sentiment);
    }

    #[test]
    fn empty_anchor_set_falls_back_to_first_category() {
        let set = AnchorSet::from_vectors(taxonomy3(), Vec::new()).expect("set");
        let s = score_item(&[1.0, 0.0], &set);
        assert!(s.raw_scores.is_empty());
        assert_eq!(s.dominant, "calm");
        assert_eq!(s.sentiment, 0.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let set = AnchorSet::from_vectors(
            taxonomy3(),
            vec![anchor("calm", 0, &[0.6, 0.8]), anchor("tense", 1, &[0.8, -0.6]), anchor("wry", 2, &[-1.0, 0.0])],
        )
        .expect("set");
        let v = [0.28, 0.96];
        assert_eq!(score_item(&v, &set), score_item(&v, &set));
    }
}
