//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys separated by `__`). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::anchors::Taxonomy;
use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()).into())
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        settings.validate()?;
        match env {
            "prod" | "production" if settings.embedding.use_fake => {
                Err(Error::InvalidConfig("fake embeddings are not allowed in production".into()).into())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
    pub scoring: ScoringSettings,
    pub stats: StatsSettings,
    pub anchors: AnchorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    pub uri: String,
    pub items_table: String,
    pub embeddings_table: String,
    pub scores_table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            uri: "data/lancedb".into(),
            items_table: "items".into(),
            embeddings_table: "embeddings".into(),
            scores_table: "scores".into(),
        }
    }
}

impl StoreSettings {
    pub fn resolved_uri(&self) -> PathBuf { expand_path(&self.uri) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub model_id: String,
    pub dim: usize,
    pub max_len: usize,
    pub batch_size: usize,
    pub use_fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, model_id: "all-MiniLM-L6-v2".into(), dim: 384, max_len: 256, batch_size: 32, use_fake: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringSettings {
    pub batch_size: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self { Self { batch_size: 200 } }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatsSettings {
    pub write_batch_size: usize,
}

impl Default for StatsSettings {
    fn default() -> Self { Self { write_batch_size: 500 } }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnchorSettings {
    pub taxonomy_path: Option<String>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        let positive = [
            ("embedding.dim", self.embedding.dim),
            ("embedding.max_len", self.embedding.max_len),
            ("embedding.batch_size", self.embedding.batch_size),
            ("scoring.batch_size", self.scoring.batch_size),
            ("stats.write_batch_size", self.stats.write_batch_size),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{key} must be greater than zero")));
            }
        }
        if self.store.uri.trim().is_empty() {
            return Err(Error::InvalidConfig("store.uri must not be empty".into()));
        }
        Ok(())
    }

    /// The configured taxonomy file, or the built-in emotion taxonomy.
    pub fn taxonomy(&self) -> anyhow::Result<Taxonomy> {
        match &self.anchors.taxonomy_path {
            Some(p) => Taxonomy::from_toml_file(&expand_path(p)),
            None => Ok(Taxonomy::emotions()),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
