//! Domain model for anchor-based emotion scoring: items, embeddings, scores,
//! the anchor taxonomy, store/embedder seams, configuration and errors.

pub mod anchors;
pub mod config;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use anchors::{AnchorCategory, Taxonomy};
pub use error::Error;
pub use memory::MemoryStore;
