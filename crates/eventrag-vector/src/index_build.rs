//! Turns event records into a persisted chunk index.
//!
//! The same builder serves the offline full build and the online additive
//! rebuild, so chunks look identical whichever way they entered the index.
//!
//! Full build flow:
//! 1) Build into a sibling staging directory
//! 2) Replace the target directory with the staging one
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use eventrag_core::chunker::{ChunkingConfig, EventChunker};
use eventrag_core::error::{Error, Result};
use eventrag_core::traits::{Embedder, VectorStore};
use eventrag_core::types::{Chunk, EventRecord, RebuildStats};

use crate::store::LanceStore;

/// Rough characters-per-token ratio used for the embedding cost estimate.
const CHARS_PER_TOKEN: usize = 4;

pub struct IndexBuilder {
    chunker: EventChunker,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    table: String,
    show_progress: bool,
}

impl IndexBuilder {
    pub fn new(chunking: ChunkingConfig, embedder: Arc<dyn Embedder>, batch_size: usize, table: impl Into<String>) -> Self {
        Self { chunker: EventChunker::new(chunking), embedder, batch_size: batch_size.max(1), table: table.into(), show_progress: false }
    }

    /// Draw a terminal progress bar while embedding.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn chunking(&self) -> ChunkingConfig {
        self.chunker.config()
    }

    /// Chunks `events`, embeds them batch by batch and appends them to `store`.
    /// Existing entries are left untouched. Nothing is written unless every
    /// batch embeds successfully.
    pub async fn add(&self, store: &dyn VectorStore, events: &[EventRecord]) -> Result<RebuildStats> {
        let chunks = self.chunker.create_chunks(events);
        info!(events = events.len(), chunks = chunks.len(), "chunked events");
        self.log_cost_estimate(&chunks);

        let pb = self.progress_bar(chunks.len());
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedded = self.embedder.embed_batch(&texts).await.map_err(|e| Error::collaborator("embedding", e))?;
            if embedded.len() != batch.len() {
                return Err(Error::collaborator(
                    "embedding",
                    anyhow::anyhow!("expected {} vectors, got {}", batch.len(), embedded.len()),
                ));
            }
            vectors.extend(embedded);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        store.add(&chunks, &vectors).await.map_err(|e| Error::collaborator("index write", e))?;
        Ok(RebuildStats { events_processed: events.len(), chunks_created: chunks.len() })
    }

    /// Builds a fresh index at `dir`, which must not already hold one.
    pub async fn build(&self, events: &[EventRecord], dir: &Path) -> Result<(LanceStore, RebuildStats)> {
        if dir.exists() {
            return Err(Error::InvalidInput(format!("build target {} already exists", dir.display())));
        }
        let store = LanceStore::create(dir, &self.table, self.embedder.dim()).await?;
        let stats = self.add(&store, events).await?;
        Ok((store, stats))
    }

    /// Moves a built index to `path`, replacing whatever was there.
    pub async fn save(&self, store: LanceStore, path: &Path) -> Result<LanceStore> {
        if store.path() == path {
            return Ok(store);
        }
        let from = store.path().to_path_buf();
        drop(store);
        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&from, path)?;
        info!(path = %path.display(), "index saved");
        LanceStore::open(path, &self.table).await
    }

    /// Offline entry point: build everything into a staging directory, then
    /// swap it in place of `path`. A failed build leaves `path` untouched.
    pub async fn build_from_scratch(&self, events: &[EventRecord], path: &Path) -> Result<RebuildStats> {
        if events.is_empty() {
            warn!("building an index with no events");
        }
        let staging = staging_dir(path);
        if staging.exists() {
            warn!(path = %staging.display(), "removing leftover staging directory");
            std::fs::remove_dir_all(&staging)?;
        }
        let (store, stats) = self.build(events, &staging).await?;
        self.save(store, path).await?;
        info!(events = stats.events_processed, chunks = stats.chunks_created, "index built");
        Ok(stats)
    }

    fn log_cost_estimate(&self, chunks: &[Chunk]) {
        let chars: usize = chunks.iter().map(|c| c.content.chars().count()).sum();
        let tokens = chars / CHARS_PER_TOKEN;
        if self.embedder.is_remote() {
            warn!(model = self.embedder.model_id(), chunks = chunks.len(), estimated_tokens = tokens, "remote embedding calls are billed");
        } else {
            info!(model = self.embedder.model_id(), estimated_tokens = tokens, "embedding locally");
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

fn staging_dir(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".staging");
    path.with_file_name(name)
}
