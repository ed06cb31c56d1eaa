//! Emotion anchor taxonomy.
//!
//! Categories are an explicit ordered list. That order drives dominance
//! tie-breaks and anchor key ordinals, so it must stay stable between the
//! anchor embedding pass and every scoring run.

use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::Error;

/// One emotion category: a signed valence and its exemplar phrases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnchorCategory {
    pub name: String,
    pub valence: f64,
    pub phrases: Vec<String>,
}

impl AnchorCategory {
    pub fn new(name: &str, valence: f64, phrases: &[&str]) -> Self {
        Self { name: name.to_string(), valence, phrases: phrases.iter().map(|p| p.to_string()).collect() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Taxonomy {
    pub categories: Vec<AnchorCategory>,
}

/// A phrase scheduled for embedding, with its store key.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorPhrase<'a> {
    pub key: String,
    pub category: &'a str,
    pub text: &'a str,
}

impl Taxonomy {
    pub fn new(categories: Vec<AnchorCategory>) -> Result<Self, Error> {
        let taxonomy = Self { categories };
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    /// The built-in 20-category taxonomy (Plutchik's eight plus twelve social/affective tones).
    pub fn emotions() -> Self {
        let categories = EMOTIONS
            .iter()
            .map(|(name, valence, phrases)| AnchorCategory::new(name, *valence, phrases))
            .collect();
        Self { categories }
    }

    /// Load a taxonomy from a TOML file of `[[categories]]` tables.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!("taxonomy file {}", path.display())).into());
        }
        let taxonomy: Taxonomy = Figment::new()
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| Error::InvalidTaxonomy(format!("{}: {}", path.display(), e)))?;
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.categories.is_empty() {
            return Err(Error::InvalidTaxonomy("no categories defined".into()));
        }
        let mut seen = HashSet::new();
        for c in &self.categories {
            if c.name.is_empty() || c.name.contains(':') {
                return Err(Error::InvalidTaxonomy(format!("invalid category name '{}'", c.name)));
            }
            if !seen.insert(c.name.as_str()) {
                return Err(Error::InvalidTaxonomy(format!("duplicate category '{}'", c.name)));
            }
            if !(-1.0..=1.0).contains(&c.valence) {
                return Err(Error::InvalidTaxonomy(format!("valence {} of '{}' is outside [-1, 1]", c.valence, c.name)));
            }
            if c.phrases.is_empty() {
                return Err(Error::InvalidTaxonomy(format!("category '{}' has no phrases", c.name)));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize { self.categories.len() }

    pub fn is_empty(&self) -> bool { self.categories.is_empty() }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.categories.iter().map(|c| c.name.as_str()) }

    pub fn position(&self, name: &str) -> Option<usize> { self.categories.iter().position(|c| c.name == name) }

    pub fn get(&self, name: &str) -> Option<&AnchorCategory> { self.categories.iter().find(|c| c.name == name) }

    pub fn phrase_count(&self) -> usize { self.categories.iter().map(|c| c.phrases.len()).sum() }

    /// Every phrase in taxonomy order. The key ordinal is the phrase's running
    /// position across the whole taxonomy, not within its category.
    pub fn phrases(&self) -> Vec<AnchorPhrase<'_>> {
        self.categories
            .iter()
            .flat_map(|c| c.phrases.iter().map(move |p| (c.name.as_str(), p.as_str())))
            .enumerate()
            .map(|(ordinal, (category, text))| AnchorPhrase { key: crate::types::anchor_key(category, ordinal), category, text })
            .collect()
    }
}

impl Default for Taxonomy {
    fn default() -> Self { Self::emotions() }
}

type CategoryDef = (&'static str, f64, &'static [&'static str]);

const EMOTIONS: &[CategoryDef] = &[
    ("joy", 1.0, &[
        "I am so happy and delighted",
        "This fills me with pure joy",
        "I feel wonderful and ecstatic",
        "What a great and amazing feeling",
    ]),
    ("trust", 1.0, &[
        "I completely trust and believe in this",
        "I have full confidence and faith",
        "This is reliable and dependable",
        "I feel safe and secure about this",
    ]),
    ("fear", -1.0, &[
        "I am terrified and scared",
        "This is frightening and alarming",
        "I feel anxious and worried about this",
        "This fills me with dread and panic",
    ]),
    ("surprise", 0.0, &[
        "I am completely shocked and surprised",
        "I did not expect this at all",
        "This is astonishing and unexpected",
        "What a sudden and startling revelation",
    ]),
    ("sadness", -1.0, &[
        "I feel so sad and heartbroken",
        "This is deeply depressing and sorrowful",
        "I am grieving and in pain",
        "Overwhelming melancholy and despair",
    ]),
    ("disgust", -1.0, &[
        "This is absolutely disgusting and revolting",
        "I feel repulsed and nauseated",
        "How vile and offensive",
        "This is morally repugnant",
    ]),
    ("anger", -1.0, &[
        "I am furious and outraged",
        "This makes me incredibly angry",
        "I am seething with rage",
        "How infuriating and maddening",
    ]),
    ("anticipation", 1.0, &[
        "Eagerly looking forward to this",
        "I cannot wait for what comes next",
        "Building excitement for the future",
        "Full of expectation and readiness",
    ]),
    ("love", 1.0, &[
        "Deep affection and care",
        "I love this with all my heart",
        "Warmth and tenderness",
        "Devoted and passionate feelings",
    ]),
    ("optimism", 1.0, &[
        "Things are looking up and getting better",
        "I am hopeful about the future",
        "Everything will work out well",
        "Bright outlook and positive expectations",
    ]),
    ("pessimism", -1.0, &[
        "Nothing good will come of this",
        "Things are only going to get worse",
        "I have no hope for improvement",
        "The outlook is bleak and dire",
    ]),
    ("contempt", -1.0, &[
        "Pure disdain and scorn",
        "I look down on this completely",
        "Utter disrespect and condescension",
        "This deserves nothing but mockery",
    ]),
    ("awe", 0.0, &[
        "Breathtakingly overwhelming",
        "I am in complete awe and wonder",
        "This is magnificent and sublime",
        "Speechless at the grandeur",
    ]),
    ("remorse", -1.0, &[
        "I deeply regret this",
        "I feel guilty and ashamed",
        "I wish I had done things differently",
        "Filled with remorse and self-blame",
    ]),
    ("sarcasm", -0.3, &[
        "Oh sure, that is definitely going to work",
        "What a brilliant and genius idea, obviously",
        "Yeah right, because that always ends well",
        "Wow so impressive, I am totally blown away",
    ]),
    ("analytical", 0.0, &[
        "Let me break down the data and evidence",
        "Analyzing the facts and information objectively",
        "Looking at this from a logical perspective",
        "The key factors and metrics to consider",
    ]),
    ("humor", 0.5, &[
        "This is hilarious and so funny",
        "I cannot stop laughing at this",
        "What a great joke and punchline",
        "Comedy gold and pure entertainment",
    ]),
    ("frustration", -0.7, &[
        "This is so frustrating and annoying",
        "Why does nothing work the way it should",
        "I am fed up and exasperated",
        "Stuck and unable to make progress",
    ]),
    ("pride", 1.0, &[
        "I am so proud of this achievement",
        "What an accomplishment to celebrate",
        "Feeling confident and self-assured",
        "Standing tall with dignity and honor",
    ]),
    ("curiosity", 0.3, &[
        "I am fascinated and want to know more",
        "This is intriguing and thought-provoking",
        "Exploring new ideas and possibilities",
        "Driven by wonder and inquiry",
    ]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_taxonomy_is_valid_and_ordered() {
        let t = Taxonomy::emotions();
        t.validate().expect("valid");
        assert_eq!(t.len(), 20);
        assert_eq!(t.phrase_count(), 80);
        assert_eq!(t.names().next(), Some("joy"));
        assert_eq!(t.names().last(), Some("curiosity"));
        assert_eq!(t.get("sarcasm").map(|c| c.valence), Some(-0.3));
        assert_eq!(t.get("humor").map(|c| c.valence), Some(0.5));
    }

    #[test]
    fn phrase_ordinals_run_across_categories() {
        let t = Taxonomy::emotions();
        let phrases = t.phrases();
        assert_eq!(phrases.len(), 80);
        assert_eq!(phrases[0].key, "anchor:joy:0");
        assert_eq!(phrases[4].key, "anchor:trust:4");
        assert_eq!(phrases[79].key, "anchor:curiosity:79");
        assert_eq!(phrases[4].text, "I completely trust and believe in this");
    }

    #[test]
    fn rejects_duplicates_and_out_of_range_valence() {
        let dup = Taxonomy::new(vec![AnchorCategory::new("a", 0.0, &["x"]), AnchorCategory::new("a", 0.0, &["y"])]);
        assert!(matches!(dup, Err(Error::InvalidTaxonomy(_))));
        let hot = Taxonomy::new(vec![AnchorCategory::new("a", 1.5, &["x"])]);
        assert!(matches!(hot, Err(Error::InvalidTaxonomy(_))));
        let bare = Taxonomy::new(vec![AnchorCategory::new("a", 0.5, &[])]);
        assert!(matches!(bare, Err(Error::InvalidTaxonomy(_))));
    }
}
