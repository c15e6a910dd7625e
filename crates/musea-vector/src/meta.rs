//! Key/value metadata for a LanceDB database.
//!
//! Stores collection-level pointers. The only key the engine writes today is
//! [`SPACE_KEY`], which pins the embedding space a collection was indexed
//! with.

use anyhow::{anyhow, Result};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Connection;
use std::sync::Arc;

use crate::schema::build_meta_schema;

pub const SPACE_KEY: &str = "embedding_space";

async fn ensure_meta_table(conn: &Connection, table: &str) -> Result<()> {
    let names = conn.table_names().execute().await?;
    if names.contains(&table.to_string()) {
        return Ok(());
    }
    let iter = RecordBatchIterator::new(vec![].into_iter(), build_meta_schema());
    conn.create_table(table, Box::new(iter)).execute().await?;
    Ok(())
}

pub async fn set_meta(conn: &Connection, table: &str, key: &str, value: &str) -> Result<()> {
    ensure_meta_table(conn, table).await?;
    let t = conn.open_table(table).execute().await?;
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![
            Arc::new(StringArray::from(vec![key.to_string()])),
            Arc::new(StringArray::from(vec![value.to_string()])),
            Arc::new(TimestampMillisecondArray::from(vec![
                Utc::now().timestamp_millis(),
            ])),
        ],
    )?;
    let reader = Box::new(RecordBatchIterator::new(
        vec![Ok(rb)].into_iter(),
        build_meta_schema(),
    ));
    // Upsert behavior via merge_insert: key is unique.
    let mut mi = t.merge_insert(&["key"]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    let _ = mi.execute(reader).await?;
    Ok(())
}

pub async fn get_meta(conn: &Connection, table: &str, key: &str) -> Result<Option<String>> {
    let names = conn.table_names().execute().await?;
    if !names.contains(&table.to_string()) {
        return Ok(None);
    }
    let t = conn.open_table(table).execute().await?;
    let mut stream = t
        .query()
        .only_if(format!("key = '{}'", key.replace('\'', "''")))
        .execute()
        .await?;
    while let Some(batch) = stream.try_next().await? {
        if batch.num_rows() == 0 {
            continue;
        }
        let val = batch
            .column_by_name("value")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow!("meta.value column missing"))?;
        return Ok(Some(val.value(0).to_string()));
    }
    Ok(None)
}
