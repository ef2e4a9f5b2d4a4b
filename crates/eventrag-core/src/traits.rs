//! Seams to the external collaborators of the pipeline.
use async_trait::async_trait;

use crate::types::{Chunk, ScoredChunk};

/// Turns text into fixed-length vectors. The same model must be used for
/// indexing and querying; nothing checks this.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    /// Identifier of the underlying model, for logs.
    fn model_id(&self) -> &str;
    /// Whether calls leave the machine (and may be billed).
    fn is_remote(&self) -> bool {
        false
    }
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        out.pop().ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))
    }
}

/// Nearest-neighbour index over chunks. Append-only through this contract.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Best `k` chunks for `query`, most similar first.
    async fn search(&self, query: &[f32], k: usize) -> anyhow::Result<Vec<ScoredChunk>>;
    async fn add(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> anyhow::Result<()>;
    async fn len(&self) -> anyhow::Result<usize>;
}

/// Single-shot text completion.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Pairwise (question, passage) relevance model. Higher is more relevant.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, question: &str, passages: &[&str]) -> anyhow::Result<Vec<f32>>;
}
