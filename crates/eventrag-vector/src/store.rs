use std::path::{Path, PathBuf};

use anyhow::Result;
use arrow_array::RecordBatchIterator;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use tracing::{debug, info};

use eventrag_core::error::Error;
use eventrag_core::traits::VectorStore;
use eventrag_core::types::{Chunk, ScoredChunk};

use crate::schema::{build_chunk_schema, vector_dim};
use crate::search::batch_to_scored;
use crate::table::{ensure_table, open_db, table_exists};
use crate::writer::chunks_to_record_batch;

/// Persisted chunk index: one LanceDB table under a directory.
#[derive(Clone)]
pub struct LanceStore {
    table: Table,
    path: PathBuf,
    dim: usize,
}

impl LanceStore {
    /// Opens an existing index. A missing directory or table is `NotFound`.
    pub async fn open(path: &Path, table: &str) -> eventrag_core::error::Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!("index directory {}", path.display())));
        }
        let conn = open_db(&path.to_string_lossy()).await.map_err(|e| Error::collaborator("opening index", e))?;
        if !table_exists(&conn, table).await.map_err(|e| Error::collaborator("opening index", e))? {
            return Err(Error::NotFound(format!("table '{}' in index {}", table, path.display())));
        }
        let handle = conn.open_table(table).execute().await.map_err(|e| Error::collaborator("opening index", e.into()))?;
        let schema = handle.schema().await.map_err(|e| Error::collaborator("opening index", e.into()))?;
        let dim = vector_dim(&schema)
            .ok_or_else(|| Error::Operation(format!("table '{}' has no fixed-size vector column", table)))?;
        info!(path = %path.display(), table, dim, "index opened");
        Ok(Self { table: handle, path: path.to_path_buf(), dim })
    }

    /// Creates (or reopens) an index table for `dim`-wide vectors.
    pub async fn create(path: &Path, table: &str, dim: usize) -> eventrag_core::error::Result<Self> {
        std::fs::create_dir_all(path)?;
        let width = i32::try_from(dim).map_err(|_| Error::InvalidInput(format!("vector dimension {dim} too large")))?;
        let conn = open_db(&path.to_string_lossy()).await.map_err(|e| Error::collaborator("creating index", e))?;
        let handle = ensure_table(&conn, table, build_chunk_schema(width))
            .await
            .map_err(|e| Error::collaborator("creating index", e))?;
        Ok(Self { table: handle, path: path.to_path_buf(), dim })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }
}

#[async_trait]
impl VectorStore for LanceStore {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        anyhow::ensure!(query.len() == self.dim, "query has {} dims, index expects {}", query.len(), self.dim);
        if k == 0 || self.table.count_rows(None).await? == 0 {
            return Ok(Vec::new());
        }
        let mut stream = self
            .table
            .vector_search(query.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            hits.extend(batch_to_scored(&batch)?);
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!(k, hits = hits.len(), "vector search");
        Ok(hits)
    }

    async fn add(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let record_batch = chunks_to_record_batch(chunks, vectors, self.dim)?;
        let schema = record_batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
        self.table.add(reader).execute().await?;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.table.count_rows(None).await?)
    }
}
