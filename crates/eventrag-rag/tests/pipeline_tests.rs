use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

use async_trait::async_trait;
use eventrag_core::chunker::EventChunker;
use eventrag_core::config::RagConfig;
use eventrag_core::error::Error;
use eventrag_core::traits::{CompletionModel, Embedder, RelevanceScorer, VectorStore};
use eventrag_core::types::{Chunk, EventRecord};
use eventrag_embed::HashingEmbedder;
use eventrag_rag::{PipelineState, RagPipeline, Reranker};
use eventrag_vector::{IndexBuilder, MemoryStore};
use tempfile::TempDir;
use tokio::sync::Notify;

const DIM: usize = 64;

struct MockLlm {
    answer: String,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    fn new(answer: &str) -> Arc<Self> {
        Arc::new(Self { answer: answer.to_string(), prompts: Mutex::new(Vec::new()) })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CompletionModel for MockLlm {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        Ok(self.answer.clone())
    }
}

struct FailingLlm;

#[async_trait]
impl CompletionModel for FailingLlm {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("upstream timeout")
    }
}

/// Scores passages by looking up their content.
struct TableScorer(HashMap<String, f32>);

impl RelevanceScorer for TableScorer {
    fn score(&self, _question: &str, passages: &[&str]) -> anyhow::Result<Vec<f32>> {
        Ok(passages.iter().map(|p| self.0.get(*p).copied().unwrap_or(0.0)).collect())
    }
}

/// Records which thread scoring ran on.
struct ThreadScorer(Arc<Mutex<Vec<ThreadId>>>);

impl RelevanceScorer for ThreadScorer {
    fn score(&self, _question: &str, passages: &[&str]) -> anyhow::Result<Vec<f32>> {
        self.0.lock().expect("lock").push(std::thread::current().id());
        Ok(vec![0.0; passages.len()])
    }
}

/// Hashing embedder whose next batch, once armed, parks until released.
struct GatedEmbedder {
    inner: HashingEmbedder,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Embedder for GatedEmbedder {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn model_id(&self) -> &str {
        "gated"
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.embed_batch(texts).await
    }
}

fn jazz_event() -> EventRecord {
    EventRecord {
        uid: Some("jazz-1".to_string()),
        title_fr: Some("Concert de Jazz Test".to_string()),
        description_fr: Some("Un concert de jazz intimiste avec un trio.".to_string()),
        location_city: Some("Paris".to_string()),
        firstdate_begin: Some("2026-03-15T20:00:00".to_string()),
        ..Default::default()
    }
}

fn other_events() -> Vec<EventRecord> {
    vec![
        EventRecord {
            uid: Some("expo-1".to_string()),
            title_fr: Some("Exposition Monet".to_string()),
            location_city: Some("Giverny".to_string()),
            ..Default::default()
        },
        EventRecord {
            uid: Some("atelier-1".to_string()),
            title_fr: Some("Atelier poterie".to_string()),
            location_city: Some("Versailles".to_string()),
            ..Default::default()
        },
    ]
}

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashingEmbedder::new(DIM))
}

async fn memory_index(events: &[EventRecord]) -> Arc<dyn VectorStore> {
    let store = Arc::new(MemoryStore::new());
    IndexBuilder::new(RagConfig::default().chunking(), embedder(), 8, "events")
        .add(store.as_ref(), events)
        .await
        .expect("index events");
    store
}

async fn ready_pipeline(llm: Arc<dyn CompletionModel>) -> RagPipeline {
    let mut pipeline = RagPipeline::new(RagConfig::default(), embedder(), 8);
    let mut events = vec![jazz_event()];
    events.extend(other_events());
    pipeline.attach_index(memory_index(&events).await).await;
    pipeline.initialize_llm(llm).await.expect("llm");
    pipeline.initialize_reranker(None);
    pipeline.configure_chain().await.expect("chain");
    pipeline
}

fn assert_not_ready(result: Result<eventrag_core::types::AnswerResult, Error>) {
    match result {
        Err(Error::NotReady(_)) => {}
        other => panic!("expected NotReady, got {other:?}"),
    }
}

#[tokio::test]
async fn answering_requires_configured_chain_in_every_earlier_state() {
    let mut pipeline = RagPipeline::new(RagConfig::default(), embedder(), 8);
    assert_eq!(pipeline.state().await, PipelineState::Uninitialized);
    assert_not_ready(pipeline.answer("Concert ?", false).await);

    pipeline.attach_index(memory_index(&[jazz_event()]).await).await;
    assert_eq!(pipeline.state().await, PipelineState::IndexLoaded);
    assert_not_ready(pipeline.answer("Concert ?", false).await);

    pipeline.initialize_llm(MockLlm::new("ok")).await.expect("llm");
    assert_eq!(pipeline.state().await, PipelineState::LlmReady);
    assert_not_ready(pipeline.answer("Concert ?", false).await);

    pipeline.configure_chain().await.expect("chain");
    assert_eq!(pipeline.state().await, PipelineState::ChainConfigured);
    assert!(pipeline.answer("Concert ?", false).await.is_ok());
}

#[tokio::test]
async fn setup_steps_must_happen_in_order() {
    let mut pipeline = RagPipeline::new(RagConfig::default(), embedder(), 8);
    assert!(matches!(pipeline.initialize_llm(MockLlm::new("ok")).await, Err(Error::NotReady(_))));
    assert!(matches!(pipeline.configure_chain().await, Err(Error::NotReady(_))));

    pipeline.attach_index(memory_index(&[jazz_event()]).await).await;
    assert!(matches!(pipeline.configure_chain().await, Err(Error::NotReady(_))));
}

#[tokio::test]
async fn end_to_end_answer_with_sources() {
    let chunks = EventChunker::new(RagConfig::default().chunking()).create_chunks(&[jazz_event()]);
    assert_eq!(chunks.len(), 2);

    let llm = MockLlm::new("Le Concert de Jazz Test a lieu à Paris le 15/03/2026 à 20:00.");
    let pipeline = ready_pipeline(llm.clone()).await;
    let result = pipeline.answer("Concert de Jazz Test", true).await.expect("answer");

    assert_eq!(result.question, "Concert de Jazz Test");
    assert!(result.answer.contains("Paris"));
    for phrase in &RagConfig::default().no_info_phrases {
        assert!(!result.answer.to_lowercase().contains(phrase.as_str()));
    }
    let sources = result.sources.expect("sources attached");
    assert!(!sources.is_empty());
    assert!(sources.len() <= RagConfig::default().rerank_top_n);
    assert_eq!(sources[0].title.as_deref(), Some("Concert de Jazz Test"));
    assert_eq!(sources[0].location.as_deref(), Some("Paris"));

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1, "model is called exactly once");
    assert!(prompts[0].contains("Lieu: Paris"));
    assert!(prompts[0].contains("QUESTION: Concert de Jazz Test"));
}

#[tokio::test]
async fn no_info_answer_suppresses_sources() {
    let pipeline = ready_pipeline(MockLlm::new("Je N'AI PAS TROUVÉ de concert à Lyon.")).await;
    let result = pipeline.answer("Concert à Lyon ?", true).await.expect("answer");
    assert!(result.sources.is_none());

    let json = serde_json::to_value(&result).expect("json");
    assert!(json.get("sources").is_none());
}

#[tokio::test]
async fn sources_only_when_requested() {
    let pipeline = ready_pipeline(MockLlm::new("Le Concert de Jazz Test a lieu à Paris.")).await;
    let result = pipeline.answer("Concert de Jazz Test", false).await.expect("answer");
    assert!(result.sources.is_none());
}

#[tokio::test]
async fn completion_failure_is_reported_with_its_stage() {
    let pipeline = ready_pipeline(Arc::new(FailingLlm)).await;
    match pipeline.answer("Concert de Jazz Test", true).await {
        Err(Error::Collaborator { stage, cause }) => {
            assert_eq!(stage, "completion");
            assert!(cause.to_string().contains("upstream timeout"));
        }
        other => panic!("expected collaborator error, got {other:?}"),
    }
}

fn chunk_with(content: &str) -> Chunk {
    let mut chunk = EventChunker::default().create_chunks(&[EventRecord::default()]).remove(0);
    chunk.content = content.to_string();
    chunk
}

#[tokio::test]
async fn disabled_reranker_is_identity() {
    let candidates = vec![chunk_with("a"), chunk_with("b"), chunk_with("c")];
    let out = Reranker::identity().rerank("question", candidates.clone()).await.expect("rerank");
    assert_eq!(out, candidates);
}

#[tokio::test]
async fn reranker_orders_by_score_descending() {
    let scores = HashMap::from([("low".to_string(), 0.2), ("high".to_string(), 0.9), ("mid".to_string(), 0.5)]);
    let reranker = Reranker::with_scorer(Box::new(TableScorer(scores)));
    let candidates = vec![chunk_with("low"), chunk_with("high"), chunk_with("mid")];

    let out = reranker.rerank("question", candidates).await.expect("rerank");
    let order: Vec<&str> = out.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(order, vec!["high", "mid", "low"]);
}

#[tokio::test]
async fn scoring_runs_off_the_async_thread() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let reranker = Reranker::with_scorer(Box::new(ThreadScorer(seen.clone())));
    let out = reranker.rerank("question", vec![chunk_with("a"), chunk_with("b")]).await.expect("rerank");
    assert_eq!(out.len(), 2);

    let seen = seen.lock().expect("lock").clone();
    assert_eq!(seen.len(), 1);
    assert_ne!(seen[0], std::thread::current().id());
}

#[tokio::test]
async fn reranker_respects_configuration_switch() {
    let scorer = || -> Option<Box<dyn RelevanceScorer>> { Some(Box::new(TableScorer(HashMap::new())) as Box<dyn RelevanceScorer>) };

    let mut enabled = RagPipeline::new(RagConfig::default(), embedder(), 8);
    enabled.initialize_reranker(scorer());
    assert!(enabled.status().await.reranking);

    let config = RagConfig { enable_reranking: false, ..Default::default() };
    let mut disabled = RagPipeline::new(config, embedder(), 8);
    disabled.initialize_reranker(scorer());
    assert!(!disabled.status().await.reranking);
}

#[tokio::test]
async fn unavailable_reranker_falls_back_to_identity() {
    let mut pipeline = RagPipeline::new(RagConfig::default(), embedder(), 8);
    assert!(RagConfig::default().enable_reranking);
    pipeline.initialize_reranker(None);
    assert!(!pipeline.status().await.reranking);

    let pipeline = ready_pipeline(MockLlm::new("Le Concert de Jazz Test a lieu à Paris.")).await;
    let result = pipeline.answer("Concert de Jazz Test", true).await.expect("answer without reranker");
    assert!(result.sources.is_some());
}

#[tokio::test]
async fn rebuild_validates_input_and_index() {
    let empty = RagPipeline::new(RagConfig::default(), embedder(), 8);
    assert!(matches!(empty.rebuild(&[jazz_event()]).await, Err(Error::NotFound(_))));

    let pipeline = ready_pipeline(MockLlm::new("ok")).await;
    assert!(matches!(pipeline.rebuild(&[]).await, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn rebuild_appends_to_persisted_index() {
    let tmp = TempDir::new().expect("tmp");
    let index_path = tmp.path().join("lancedb");
    let builder = IndexBuilder::new(RagConfig::default().chunking(), embedder(), 8, "events");
    let built = builder.build_from_scratch(&other_events(), &index_path).await.expect("build");

    let mut pipeline = RagPipeline::new(RagConfig::default(), embedder(), 8);
    let missing = pipeline.load_index(&tmp.path().join("missing"), "events").await;
    assert!(matches!(missing, Err(Error::NotFound(_))));

    pipeline.load_index(&index_path, "events").await.expect("load");
    pipeline.initialize_llm(MockLlm::new("Le Concert de Jazz Test a lieu à Paris.")).await.expect("llm");
    pipeline.configure_chain().await.expect("chain");

    let stats = pipeline.rebuild(&[jazz_event()]).await.expect("rebuild");
    assert_eq!(stats.events_processed, 1);
    assert_eq!(stats.chunks_created, 2);

    let status = pipeline.status().await;
    assert_eq!(status.state, PipelineState::ChainConfigured);
    assert!(status.index_loaded);
    assert_eq!(status.vectors, Some(built.chunks_created + 2));

    let result = pipeline.answer("Concert de Jazz Test", true).await.expect("answer");
    let sources = result.sources.expect("sources");
    assert_eq!(sources[0].title.as_deref(), Some("Concert de Jazz Test"));
}

#[tokio::test]
async fn answers_wait_for_a_running_rebuild() {
    let gated = Arc::new(GatedEmbedder {
        inner: HashingEmbedder::new(DIM),
        armed: AtomicBool::new(false),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let llm = MockLlm::new("Le Concert de Jazz Test a lieu à Paris.");
    let mut pipeline = RagPipeline::new(RagConfig::default(), gated.clone(), 8);
    pipeline.attach_index(memory_index(&other_events()).await).await;
    pipeline.initialize_llm(llm.clone()).await.expect("llm");
    pipeline.configure_chain().await.expect("chain");
    let pipeline = Arc::new(pipeline);

    gated.armed.store(true, Ordering::SeqCst);
    let rebuilding = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.rebuild(&[jazz_event()]).await }
    });
    gated.entered.notified().await;

    let answering = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.answer("Concert de Jazz Test", false).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!answering.is_finished(), "answer must wait for the rebuild");
    assert!(llm.prompts().is_empty());

    gated.release.notify_one();
    let stats = rebuilding.await.expect("join").expect("rebuild");
    assert_eq!(stats.chunks_created, 2);
    answering.await.expect("join").expect("answer");

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Lieu: Paris"), "answer sees the rebuilt index");
}
