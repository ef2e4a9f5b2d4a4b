//! LanceDB connection and housekeeping helpers.
use std::sync::Arc;

use anyhow::Result;
use arrow_array::RecordBatchIterator;
use lancedb::{connect, Connection, Table};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

/// Opens `name`, creating it empty with `schema` when absent.
pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<Table> {
    if table_exists(conn, name).await? {
        return Ok(conn.open_table(name).execute().await?);
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    Ok(conn.create_table(name, Box::new(iter)).execute().await?)
}
