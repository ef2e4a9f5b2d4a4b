//! Question answering over the event index.
//!
//! A pipeline moves through `Uninitialized -> IndexLoaded -> LlmReady ->
//! ChainConfigured` as its collaborators are attached, and only answers in the
//! last state. Reranker setup is independent of the state machine.
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use eventrag_core::config::RagConfig;
use eventrag_core::error::{Error, Result};
use eventrag_core::traits::{CompletionModel, Embedder, RelevanceScorer, VectorStore};
use eventrag_core::types::{AnswerResult, Chunk, EventRecord, RebuildStats, Source};
use eventrag_vector::{IndexBuilder, LanceStore};

use crate::reranker::Reranker;
use crate::retriever::Retriever;
use crate::synthesizer::Synthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Uninitialized,
    IndexLoaded,
    LlmReady,
    ChainConfigured,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Uninitialized => "UNINITIALIZED",
            PipelineState::IndexLoaded => "INDEX_LOADED",
            PipelineState::LlmReady => "LLM_READY",
            PipelineState::ChainConfigured => "CHAIN_CONFIGURED",
        };
        f.write_str(s)
    }
}

/// Health snapshot of a pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub index_loaded: bool,
    pub vectors: Option<usize>,
    pub reranking: bool,
}

pub struct RagPipeline {
    config: RagConfig,
    embedder: Arc<dyn Embedder>,
    // writers (rebuild) exclude readers (answer) for the whole operation
    store: RwLock<Option<Arc<dyn VectorStore>>>,
    completion: Option<Arc<dyn CompletionModel>>,
    chain_configured: bool,
    retriever: Retriever,
    reranker: Reranker,
    synthesizer: Synthesizer,
    builder: IndexBuilder,
}

impl RagPipeline {
    pub fn new(config: RagConfig, embedder: Arc<dyn Embedder>, embed_batch_size: usize) -> Self {
        let builder = IndexBuilder::new(config.chunking(), embedder.clone(), embed_batch_size, "");
        Self {
            retriever: Retriever::from_config(&config),
            synthesizer: Synthesizer::new(&config.no_info_phrases),
            reranker: Reranker::identity(),
            store: RwLock::new(None),
            completion: None,
            chain_configured: false,
            embedder,
            builder,
            config,
        }
    }

    pub async fn state(&self) -> PipelineState {
        let index_loaded = self.store.read().await.is_some();
        self.state_with(index_loaded)
    }

    fn state_with(&self, index_loaded: bool) -> PipelineState {
        match (index_loaded, self.completion.is_some(), self.chain_configured) {
            (false, _, _) => PipelineState::Uninitialized,
            (true, false, _) => PipelineState::IndexLoaded,
            (true, true, false) => PipelineState::LlmReady,
            (true, true, true) => PipelineState::ChainConfigured,
        }
    }

    /// Opens the persisted index at `path`. Missing index is `NotFound`.
    pub async fn load_index(&mut self, path: &Path, table: &str) -> Result<()> {
        let store = LanceStore::open(path, table).await?;
        if store.dim() != self.embedder.dim() {
            warn!(index_dim = store.dim(), embedder_dim = self.embedder.dim(), "index and embedder dimensions differ");
        }
        self.attach_index(Arc::new(store)).await;
        Ok(())
    }

    /// Uses an already opened store as the index.
    pub async fn attach_index(&mut self, store: Arc<dyn VectorStore>) {
        *self.store.write().await = Some(store);
        info!(state = %self.state().await, "index loaded");
    }

    pub async fn initialize_llm(&mut self, model: Arc<dyn CompletionModel>) -> Result<()> {
        let state = self.state().await;
        if state == PipelineState::Uninitialized {
            return Err(Error::NotReady("load the index before initializing the LLM".into()));
        }
        self.completion = Some(model);
        info!(state = %self.state().await, "LLM initialized");
        Ok(())
    }

    /// Installs the cross-encoder when reranking is enabled. A missing scorer
    /// leaves the identity reranker in place.
    pub fn initialize_reranker(&mut self, scorer: Option<Box<dyn RelevanceScorer>>) {
        self.reranker = match (self.config.enable_reranking, scorer) {
            (false, _) => {
                info!("reranking disabled");
                Reranker::identity()
            }
            (true, None) => {
                warn!("reranker unavailable, keeping retrieval order");
                Reranker::identity()
            }
            (true, Some(scorer)) => {
                info!("reranker initialized");
                Reranker::with_scorer(scorer)
            }
        };
    }

    pub async fn configure_chain(&mut self) -> Result<()> {
        let state = self.state().await;
        match state {
            PipelineState::Uninitialized => Err(Error::NotReady("index not loaded".into())),
            PipelineState::IndexLoaded => Err(Error::NotReady("LLM not initialized".into())),
            PipelineState::LlmReady | PipelineState::ChainConfigured => {
                self.chain_configured = true;
                info!(state = %PipelineState::ChainConfigured, "chain configured");
                Ok(())
            }
        }
    }

    pub async fn answer(&self, question: &str, return_sources: bool) -> Result<AnswerResult> {
        let guard = self.store.read().await;
        let state = self.state_with(guard.is_some());
        let (Some(store), Some(completion), PipelineState::ChainConfigured) = (guard.as_ref(), self.completion.as_ref(), state) else {
            return Err(Error::NotReady(format!("pipeline is {state}, chain not configured")));
        };
        info!(question_chars = question.chars().count(), return_sources, "answering question");

        let top_n = self.config.rerank_top_n;
        let context: Vec<Chunk> = self.ranked_chunks(question, store.as_ref()).await?.into_iter().take(top_n).collect();
        let answer = self.synthesizer.answer(completion.as_ref(), question, &context).await?;

        let sources = if return_sources && self.synthesizer.should_attach_sources(&answer) {
            let ranked = self.ranked_chunks(question, store.as_ref()).await?;
            Some(ranked.iter().take(top_n).map(Source::from).collect::<Vec<_>>())
        } else {
            None
        };
        info!(answer_chars = answer.chars().count(), sources = sources.as_ref().map_or(0, Vec::len), "answered");
        Ok(AnswerResult { question: question.to_string(), answer, sources })
    }

    async fn ranked_chunks(&self, question: &str, store: &dyn VectorStore) -> Result<Vec<Chunk>> {
        let candidates = self.retriever.fetch(question, self.embedder.as_ref(), store).await?;
        let chunks = candidates.into_iter().map(|c| c.chunk).collect();
        self.reranker.rerank(question, chunks).await
    }

    /// Appends `events` to the loaded index. Queries wait until it finishes.
    pub async fn rebuild(&self, events: &[EventRecord]) -> Result<RebuildStats> {
        if events.is_empty() {
            return Err(Error::InvalidInput("no events provided".into()));
        }
        let guard = self.store.write().await;
        let Some(store) = guard.as_ref() else {
            return Err(Error::NotFound("no index loaded; build the index first".into()));
        };
        let stats = self.builder.add(store.as_ref(), events).await?;
        info!(events = stats.events_processed, chunks = stats.chunks_created, "index updated");
        Ok(stats)
    }

    pub async fn status(&self) -> PipelineStatus {
        let guard = self.store.read().await;
        let vectors = match guard.as_ref() {
            Some(store) => match store.len().await {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(error = %e, "could not count index rows");
                    None
                }
            },
            None => None,
        };
        PipelineStatus {
            state: self.state_with(guard.is_some()),
            index_loaded: guard.is_some(),
            vectors,
            reranking: self.reranker.is_active(),
        }
    }
}
