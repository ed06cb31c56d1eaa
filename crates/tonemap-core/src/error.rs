use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid taxonomy: {0}")]
    InvalidTaxonomy(String),

    #[error("Missing embedding for item {0}")]
    MissingEmbedding(String),

    #[error("Anchor category '{0}' has no anchor vectors")]
    EmptyAnchorCategory(String),

    #[error("No anchor vectors stored for any category; embed anchors first")]
    NoAnchorVectors,

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
