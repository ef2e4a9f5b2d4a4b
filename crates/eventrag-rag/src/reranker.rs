use std::sync::Arc;

use tracing::debug;

use eventrag_core::error::{Error, Result};
use eventrag_core::traits::RelevanceScorer;
use eventrag_core::types::Chunk;

/// Second-pass ordering of retrieved chunks. Without a scorer it is the
/// identity; it never drops candidates.
#[derive(Default)]
pub struct Reranker {
    scorer: Option<Arc<dyn RelevanceScorer>>,
}

impl Reranker {
    pub fn identity() -> Self {
        Self { scorer: None }
    }

    pub fn with_scorer(scorer: Box<dyn RelevanceScorer>) -> Self {
        Self { scorer: Some(Arc::from(scorer)) }
    }

    pub fn is_active(&self) -> bool {
        self.scorer.is_some()
    }

    /// Orders `candidates` by pairwise relevance to `question`, best first.
    /// Equal scores keep their retrieval order. Scoring runs on the blocking
    /// pool.
    pub async fn rerank(&self, question: &str, candidates: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let Some(scorer) = &self.scorer else {
            return Ok(candidates);
        };
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let scorer = Arc::clone(scorer);
        let question = question.to_string();
        let passages: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let scores = tokio::task::spawn_blocking(move || {
            let passages: Vec<&str> = passages.iter().map(String::as_str).collect();
            scorer.score(&question, &passages)
        })
        .await
        .map_err(|e| Error::collaborator("reranking", e.into()))?
        .map_err(|e| Error::collaborator("reranking", e))?;
        if scores.len() != candidates.len() {
            return Err(Error::collaborator(
                "reranking",
                anyhow::anyhow!("scorer returned {} scores for {} passages", scores.len(), candidates.len()),
            ));
        }
        let mut scored: Vec<(f32, Chunk)> = scores.into_iter().zip(candidates).collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        debug!(top = scored.first().map(|(s, _)| *s), "reranked candidates");
        Ok(scored.into_iter().map(|(_, c)| c).collect())
    }
}
