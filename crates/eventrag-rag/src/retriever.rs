//! Diversity-aware retrieval (maximal marginal relevance).
//!
//! MMR = λ × sim(query, doc) - (1-λ) × max(sim(doc, selected))
//!
//! λ = 1.0 is plain similarity ranking, λ = 0.0 pure diversity.
use tracing::debug;

use eventrag_core::config::RagConfig;
use eventrag_core::error::{Error, Result};
use eventrag_core::traits::{Embedder, VectorStore};
use eventrag_core::types::ScoredChunk;

#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    k: usize,
    fetch_k: usize,
    lambda: f32,
}

impl Retriever {
    pub fn new(k: usize, fetch_multiplier: usize, lambda: f32) -> Self {
        Self { k, fetch_k: k * fetch_multiplier.max(1), lambda: lambda.clamp(0.0, 1.0) }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.top_k, config.fetch_multiplier, config.mmr_lambda)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Embeds `question`, pulls `fetch_k` neighbours and keeps `k` of them.
    pub async fn fetch(&self, question: &str, embedder: &dyn Embedder, store: &dyn VectorStore) -> Result<Vec<ScoredChunk>> {
        let query = embedder.embed_query(question).await.map_err(|e| Error::collaborator("embedding", e))?;
        let pool = store.search(&query, self.fetch_k).await.map_err(|e| Error::collaborator("vector search", e))?;
        let pool_len = pool.len();
        let selected = mmr_select(&query, pool, self.k, self.lambda);
        debug!(pool = pool_len, selected = selected.len(), "retrieved candidates");
        Ok(selected)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Greedy MMR selection of `k` candidates. Candidates without a stored vector
/// fall back to their store score for relevance and count as dissimilar.
pub fn mmr_select(query: &[f32], candidates: Vec<ScoredChunk>, k: usize, lambda: f32) -> Vec<ScoredChunk> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(candidates.len());
    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| if c.vector.is_empty() { c.score } else { cosine(query, &c.vector) })
        .collect();

    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    let mut picked: Vec<usize> = Vec::with_capacity(k);
    while picked.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_mmr = f32::NEG_INFINITY;
        for (pos, &idx) in remaining.iter().enumerate() {
            let max_similarity = picked
                .iter()
                .map(|&s| {
                    let (a, b) = (&candidates[idx].vector, &candidates[s].vector);
                    if a.is_empty() || b.is_empty() { 0.0 } else { cosine(a, b) }
                })
                .fold(0.0f32, f32::max);
            let mmr = lambda * relevance[idx] - (1.0 - lambda) * max_similarity;
            if mmr > best_mmr {
                best_mmr = mmr;
                best_pos = pos;
            }
        }
        picked.push(remaining.remove(best_pos));
    }

    let mut slots: Vec<Option<ScoredChunk>> = candidates.into_iter().map(Some).collect();
    picked.into_iter().filter_map(|i| slots[i].take()).collect()
}
