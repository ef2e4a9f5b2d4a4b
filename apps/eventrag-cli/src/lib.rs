//! Wiring shared by the command-line tools: configuration, collaborators and
//! pipeline setup.
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use eventrag_core::config::{resolve_with_base, AppConfig};
use eventrag_core::error::{Error, Result};
use eventrag_core::traits::{Embedder, RelevanceScorer};
use eventrag_embed::EmbeddingProvider;
use eventrag_rag::{CrossEncoderScorer, MistralChat, RagPipeline};

pub fn load_config(dir: &Path, env_name: &str) -> Result<AppConfig> {
    AppConfig::load_from(dir, env_name)
}

pub fn embedder(config: &AppConfig, base: &Path) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(EmbeddingProvider::from_config(&config.embedding, &config.mistral, base)?))
}

/// Cross-encoder when reranking is enabled and its weights load; `None` otherwise.
pub fn relevance_scorer(config: &AppConfig, base: &Path) -> Option<Box<dyn RelevanceScorer>> {
    if !config.rag.enable_reranking {
        return None;
    }
    let dir = resolve_with_base(base, &config.rag.reranker_model_dir);
    match CrossEncoderScorer::load(&dir) {
        Ok(scorer) => Some(Box::new(scorer)),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "cross-encoder unavailable");
            None
        }
    }
}

/// Pipeline with the index loaded. Enough for additive updates and status.
pub async fn open_pipeline(config: &AppConfig, base: &Path) -> Result<RagPipeline> {
    let mut pipeline = RagPipeline::new(config.rag.clone(), embedder(config, base)?, config.embedding.batch_size);
    pipeline.load_index(&config.index_path(base), &config.index.table).await?;
    Ok(pipeline)
}

/// Pipeline ready to answer questions.
pub async fn answering_pipeline(config: &AppConfig, base: &Path) -> Result<RagPipeline> {
    let mut pipeline = open_pipeline(config, base).await?;
    let chat = MistralChat::from_config(&config.mistral).map_err(|e| Error::InvalidConfig(format!("{e:#}")))?;
    pipeline.initialize_llm(Arc::new(chat)).await?;
    pipeline.initialize_reranker(relevance_scorer(config, base));
    pipeline.configure_chain().await?;
    Ok(pipeline)
}

/// Hint printed next to errors a user can fix.
pub fn remediation(err: &Error) -> Option<&'static str> {
    match err {
        Error::NotFound(_) => Some("build the index first: eventrag-indexer <events.json|dir>"),
        Error::InvalidConfig(_) => Some("check config.toml or the APP_* environment variables"),
        _ => None,
    }
}
