//! Loading of pre-parsed post exports.
//!
//! Each file holds a JSON array of `{ "id" | "tweetId", "text", "createdAt" }`
//! objects. A directory is walked recursively and its `*.json` files are read
//! in path order.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use tonemap_core::types::Item;

pub fn json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|x| x.to_str()).map(|x| x.eq_ignore_ascii_case("json")).unwrap_or(false))
        .collect();
    files.sort();
    files
}

pub fn load_file(path: &Path) -> Result<Vec<Item>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let items: Vec<Item> = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    debug!(file = %path.display(), n = items.len(), "loaded items");
    Ok(items)
}

/// Items from a single export file or every export under a directory.
/// Ingested items always start with both lifecycle flags cleared.
pub fn load_items(path: &Path) -> Result<Vec<Item>> {
    let files = if path.is_dir() { json_files(path) } else { vec![path.to_path_buf()] };
    let mut items = Vec::new();
    for file in &files {
        items.extend(load_file(file)?.into_iter().map(|i| Item { embedded: false, scored: false, ..i }));
    }
    info!(files = files.len(), items = items.len(), "items loaded");
    Ok(items)
}
