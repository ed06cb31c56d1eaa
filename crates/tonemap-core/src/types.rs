//! Domain records shared by the scoring passes and the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub type ItemId = String;

/// Per-category values keyed by category name.
///
/// Raw scores, z-scores and percentiles all use this one representation.
/// Iteration order is alphabetical; taxonomy order lives in
/// [`crate::anchors::Taxonomy`] and is never derived from map order.
pub type CategoryScores = BTreeMap<String, f64>;

/// Key prefix separating anchor vectors from item vectors in the embedding store.
pub const ANCHOR_PREFIX: &str = "anchor:";

/// A post supplied by the ingestion layer.
///
/// `embedded` and `scored` are lifecycle flags owned by the scoring passes;
/// ingestion leaves them untouched on existing items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(alias = "tweetId")]
    pub id: ItemId,
    #[serde(default)]
    pub text: String,
    #[serde(deserialize_with = "deserialize_created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub embedded: bool,
    #[serde(default)]
    pub scored: bool,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self { id: id.into(), text: text.into(), created_at, embedded: false, scored: false }
    }
}

/// Accepts RFC 3339 timestamps and the legacy `Wed Oct 10 20:19:24 +0000 2018` layout.
fn deserialize_created_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp '{raw}'")))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y").ok().map(|ts| ts.with_timezone(&Utc))
}

/// Flag predicate for item queries. `None` means "either value".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub embedded: Option<bool>,
    pub scored: Option<bool>,
}

impl ItemFilter {
    pub fn all() -> Self { Self::default() }

    pub fn unembedded() -> Self { Self { embedded: Some(false), scored: None } }

    /// Items with a vector that have not been scored yet.
    pub fn ready_to_score() -> Self { Self { embedded: Some(true), scored: Some(false) } }

    pub fn scored() -> Self { Self { embedded: None, scored: Some(true) } }

    pub fn matches(&self, item: &Item) -> bool {
        self.embedded.map_or(true, |e| item.embedded == e) && self.scored.map_or(true, |s| item.scored == s)
    }
}

/// A stored vector. Item vectors are keyed by item id, anchor vectors by
/// `anchor:<category>:<ordinal>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub model: String,
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    pub fn is_anchor(&self) -> bool { self.id.starts_with(ANCHOR_PREFIX) }
}

/// One embedded anchor phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorVector {
    pub category: String,
    pub ordinal: usize,
    pub vector: Vec<f32>,
}

pub fn anchor_key(category: &str, ordinal: usize) -> String {
    format!("{ANCHOR_PREFIX}{category}:{ordinal}")
}

/// Splits `anchor:<category>:<ordinal>` into its parts.
pub fn parse_anchor_key(key: &str) -> Option<(&str, usize)> {
    let rest = key.strip_prefix(ANCHOR_PREFIX)?;
    let (category, ordinal) = rest.rsplit_once(':')?;
    if category.is_empty() {
        return None;
    }
    Some((category, ordinal.parse().ok()?))
}

/// Emotion profile of one item, keyed by item id.
///
/// Created by the scoring pass with empty `z_scores`/`percentiles`, then
/// rewritten in place by the corpus normalizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub item_id: ItemId,
    pub created_at: DateTime<Utc>,
    pub raw_scores: CategoryScores,
    pub dominant: String,
    pub sentiment: f64,
    #[serde(default)]
    pub z_scores: CategoryScores,
    #[serde(default)]
    pub percentiles: CategoryScores,
    /// When the scoring pass last wrote this record.
    pub scored_at: DateTime<Utc>,
}

impl ScoreRecord {
    /// Raw score for `category`, with categories absent from the map counting as 0.0.
    pub fn raw(&self, category: &str) -> f64 {
        self.raw_scores.get(category).copied().unwrap_or(0.0)
    }
}

/// Normalization fields for one score, addressed by item id.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedUpdate {
    pub item_id: ItemId,
    pub z_scores: CategoryScores,
    pub percentiles: CategoryScores,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_keys_round_trip_through_parse() {
        let key = anchor_key("sarcasm", 57);
        assert_eq!(key, "anchor:sarcasm:57");
        assert_eq!(parse_anchor_key(&key), Some(("sarcasm", 57)));
        assert_eq!(parse_anchor_key("1234567890"), None);
        assert_eq!(parse_anchor_key("anchor::3"), None);
        assert_eq!(parse_anchor_key("anchor:joy:x"), None);
    }

    #[test]
    fn item_accepts_legacy_field_names_and_timestamps() {
        let json = r#"{"tweetId":"42","text":"hi","createdAt":"Wed Oct 10 20:19:24 +0000 2018"}"#;
        let item: Item = serde_json::from_str(json).expect("parse");
        assert_eq!(item.id, "42");
        assert!(!item.embedded && !item.scored);
        assert_eq!(item.created_at.to_rfc3339(), "2018-10-10T20:19:24+00:00");

        let iso: Item = serde_json::from_str(r#"{"id":"7","createdAt":"2024-01-02T03:04:05.000Z"}"#).expect("parse");
        assert_eq!(iso.text, "");
    }

    #[test]
    fn filter_matches_flags() {
        let mut item = Item::new("a", "t", Utc::now());
        assert!(ItemFilter::unembedded().matches(&item));
        assert!(!ItemFilter::ready_to_score().matches(&item));
        item.embedded = true;
        assert!(ItemFilter::ready_to_score().matches(&item));
        item.scored = true;
        assert!(!ItemFilter::ready_to_score().matches(&item));
        assert!(ItemFilter::all().matches(&item));
    }
}
