//! Arrow schemas for the three corpus tables.
//!
//! Per-category maps are stored as JSON object strings so the category set can
//! change without a schema migration.
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

fn timestamp(name: &str) -> Field {
    Field::new(name, DataType::Timestamp(TimeUnit::Millisecond, None), false)
}

pub fn build_items_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        timestamp("created_at"),
        Field::new("embedded", DataType::Boolean, false),
        Field::new("scored", DataType::Boolean, false),
    ]))
}

pub fn build_embeddings_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("model", DataType::Utf8, false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
        timestamp("created_at"),
    ]))
}

pub fn build_scores_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("item_id", DataType::Utf8, false),
        timestamp("created_at"),
        Field::new("raw_scores", DataType::Utf8, false),
        Field::new("dominant", DataType::Utf8, false),
        Field::new("sentiment", DataType::Float64, false),
        Field::new("z_scores", DataType::Utf8, false),
        Field::new("percentiles", DataType::Utf8, false),
        timestamp("scored_at"),
    ]))
}
