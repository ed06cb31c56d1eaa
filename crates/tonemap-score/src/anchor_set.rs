use std::collections::BTreeMap;
use tracing::{debug, warn};

use tonemap_core::error::Error;
use tonemap_core::traits::EmbeddingStore;
use tonemap_core::types::{parse_anchor_key, AnchorVector, EmbeddingRecord};
use tonemap_core::Taxonomy;

/// Anchor vectors grouped by category, aligned with taxonomy order.
///
/// Every phrase vector is kept individually; categories are never collapsed
/// into a centroid.
#[derive(Debug, Clone)]
pub struct AnchorSet {
    taxonomy: Taxonomy,
    vectors: Vec<Vec<Vec<f32>>>,
    dim: Option<usize>,
}

impl AnchorSet {
    pub fn from_vectors(taxonomy: Taxonomy, anchors: Vec<AnchorVector>) -> Result<Self, Error> {
        let mut grouped: Vec<BTreeMap<usize, Vec<f32>>> = vec![BTreeMap::new(); taxonomy.len()];
        let mut dim = None;
        for anchor in anchors {
            let Some(pos) = taxonomy.position(&anchor.category) else {
                debug!(category = %anchor.category, "ignoring anchor for unknown category");
                continue;
            };
            match dim {
                None => dim = Some(anchor.vector.len()),
                Some(d) if d != anchor.vector.len() => {
                    return Err(Error::DimensionMismatch { expected: d, got: anchor.vector.len() });
                }
                Some(_) => {}
            }
            grouped[pos].insert(anchor.ordinal, anchor.vector);
        }
        let vectors = grouped.into_iter().map(|by_ordinal| by_ordinal.into_values().collect()).collect();
        Ok(Self { taxonomy, vectors, dim })
    }

    /// Build from stored `anchor:<category>:<ordinal>` records; other keys are ignored.
    pub fn from_records(taxonomy: Taxonomy, records: Vec<EmbeddingRecord>) -> Result<Self, Error> {
        let anchors = records
            .into_iter()
            .filter_map(|r| {
                let (category, ordinal) = parse_anchor_key(&r.id)?;
                Some(AnchorVector { category: category.to_string(), ordinal, vector: r.vector })
            })
            .collect();
        Self::from_vectors(taxonomy, anchors)
    }

    pub fn taxonomy(&self) -> &Taxonomy { &self.taxonomy }

    /// Vector length shared by every anchor, `None` when there are no anchors.
    pub fn dim(&self) -> Option<usize> { self.dim }

    /// Anchor vectors of the category at taxonomy position `index`.
    pub fn anchors(&self, index: usize) -> &[Vec<f32>] {
        self.vectors.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total(&self) -> usize { self.vectors.iter().map(Vec::len).sum() }

    pub fn empty_categories(&self) -> Vec<&str> {
        self.taxonomy.names().zip(&self.vectors).filter(|(_, v)| v.is_empty()).map(|(n, _)| n).collect()
    }
}

/// Load all anchor vectors from the store. Categories without vectors are
/// reported and left empty; scoring skips them.
pub async fn load_anchor_set<S>(store: &S, taxonomy: Taxonomy) -> anyhow::Result<AnchorSet>
where
    S: EmbeddingStore + ?Sized,
{
    let records = store.anchor_embeddings().await?;
    let set = AnchorSet::from_records(taxonomy, records)?;
    for category in set.empty_categories() {
        warn!(error = %Error::EmptyAnchorCategory(category.to_string()), "category skipped during scoring");
    }
    debug!(anchors = set.total(), dim = ?set.dim(), "anchor set loaded");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonemap_core::AnchorCategory;

    fn taxonomy() -> Taxonomy {
        Taxonomy::new(vec![AnchorCategory::new("a", 1.0, &["x", "y"]), AnchorCategory::new("b", -1.0, &["z"])]).expect("valid")
    }

    #[test]
    fn groups_records_by_category_in_ordinal_order() {
        let records = vec![
            EmbeddingRecord { id: "anchor:a:1".into(), model: "m".into(), vector: vec![0.0, 1.0] },
            EmbeddingRecord { id: "anchor:a:0".into(), model: "m".into(), vector: vec![1.0, 0.0] },
            EmbeddingRecord { id: "anchor:other:5".into(), model: "m".into(), vector: vec![1.0, 0.0] },
            EmbeddingRecord { id: "item-17".into(), model: "m".into(), vector: vec![1.0, 0.0] },
        ];
        let set = AnchorSet::from_records(taxonomy(), records).expect("set");
        assert_eq!(set.anchors(0), &[vec![1.0f32, 0.0], vec![0.0f32, 1.0]][..]);
        assert!(set.anchors(1).is_empty());
        assert_eq!(set.empty_categories(), vec!["b"]);
        assert_eq!(set.total(), 2);
        assert_eq!(set.dim(), Some(2));
    }

    #[test]
    fn rejects_mixed_dimensions() {
        let anchors = vec![
            AnchorVector { category: "a".into(), ordinal: 0, vector: vec![1.0, 0.0] },
            AnchorVector { category: "b".into(), ordinal: 2, vector: vec![1.0, 0.0, 0.0] },
        ];
        let err = AnchorSet::from_vectors(taxonomy(), anchors).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, got: 3 }));
    }
}
