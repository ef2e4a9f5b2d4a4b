use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use eventrag_core::traits::VectorStore;
use eventrag_core::types::{Chunk, ScoredChunk};

/// Brute-force cosine store kept in memory. Nothing is persisted.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<(Chunk, Vec<f32>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = self.rows.read().map_err(|_| anyhow!("memory store lock poisoned"))?;
        let mut hits: Vec<ScoredChunk> = rows
            .iter()
            .map(|(chunk, vector)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query, vector),
                vector: vector.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn add(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        anyhow::ensure!(chunks.len() == vectors.len(), "{} chunks but {} vectors", chunks.len(), vectors.len());
        let mut rows = self.rows.write().map_err(|_| anyhow!("memory store lock poisoned"))?;
        rows.extend(chunks.iter().cloned().zip(vectors.iter().cloned()));
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.rows.read().map_err(|_| anyhow!("memory store lock poisoned"))?.len())
    }
}
