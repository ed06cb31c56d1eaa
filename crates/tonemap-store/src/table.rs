//! LanceDB connection and table helpers shared by the stores.
use anyhow::{anyhow, Result};
use arrow_array::{Array, BooleanArray, FixedSizeListArray, Float64Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use arrow_array::cast::AsArray;
use chrono::{DateTime, Utc};
use lancedb::{connect, Connection};
use std::sync::Arc;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<()> {
    let names = conn.table_names().execute().await?;
    if names.contains(&name.to_string()) {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    conn.create_table(name, Box::new(iter)).execute().await?;
    Ok(())
}

/// `<column> IN ('a','b')` with single quotes escaped.
pub fn in_filter<S: AsRef<str>>(column: &str, ids: &[S]) -> String {
    let list = ids.iter().map(|id| format!("'{}'", id.as_ref().replace('\'', "''"))).collect::<Vec<_>>().join(",");
    format!("{column} IN ({list})")
}

pub fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("missing {name} column"))
}

pub fn bool_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a BooleanArray> {
    batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<BooleanArray>()).ok_or_else(|| anyhow!("missing {name} column"))
}

pub fn f64_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<Float64Array>()).ok_or_else(|| anyhow!("missing {name} column"))
}

pub fn timestamp_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a TimestampMillisecondArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<TimestampMillisecondArray>())
        .ok_or_else(|| anyhow!("missing {name} column"))
}

pub fn vector_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a FixedSizeListArray> {
    batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>()).ok_or_else(|| anyhow!("missing {name} column"))
}

pub fn vector_at(col: &FixedSizeListArray, i: usize) -> Vec<f32> {
    if col.is_null(i) {
        return Vec::new();
    }
    col.value(i).as_primitive::<arrow_array::types::Float32Type>().values().iter().copied().collect()
}

pub fn datetime_at(col: &TimestampMillisecondArray, i: usize) -> Result<DateTime<Utc>> {
    let ms = col.value(i);
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("timestamp {ms} out of range"))
}

pub fn single_batch_reader(batch: RecordBatch) -> Box<RecordBatchIterator<std::vec::IntoIter<Result<RecordBatch, arrow_schema::ArrowError>>>> {
    let schema = batch.schema();
    Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema))
}
