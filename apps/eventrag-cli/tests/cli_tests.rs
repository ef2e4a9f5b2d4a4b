use std::fs;

use eventrag_cli::{answering_pipeline, embedder, load_config, open_pipeline, relevance_scorer, remediation};
use eventrag_core::error::Error;
use eventrag_core::events::load_events;
use eventrag_rag::PipelineState;
use eventrag_vector::IndexBuilder;
use tempfile::TempDir;

const CONFIG: &str = r#"
[embedding]
provider = "hashing"
dimension = 32

[index]
path = "data/lancedb"

[rag]
reranker_model_dir = "models/missing-cross-encoder"
"#;

const EVENTS: &str = r#"[
  {"uid": "jazz-1", "title_fr": "Concert de Jazz Test", "location_city": "Paris",
   "firstdate_begin": "2026-03-15T20:00:00", "description_fr": "Un trio de jazz."},
  {"uid": "expo-1", "title_fr": "Exposition Monet", "location_city": "Giverny", "free": "true"}
]"#;

fn workspace() -> TempDir {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join("config.toml"), CONFIG).expect("config");
    fs::write(tmp.path().join("events.json"), EVENTS).expect("events");
    tmp
}

#[tokio::test]
async fn missing_index_points_to_the_indexer() {
    let tmp = workspace();
    let config = load_config(tmp.path(), "test").expect("config");

    let err = open_pipeline(&config, tmp.path()).await.err().expect("no index yet");
    assert!(err.is_not_found());
    assert!(remediation(&err).is_some_and(|hint| hint.contains("eventrag-indexer")));
}

#[tokio::test]
async fn build_then_add_through_the_pipeline() {
    let tmp = workspace();
    let config = load_config(tmp.path(), "test").expect("config");
    let events = load_events(&tmp.path().join("events.json")).expect("events");

    let builder = IndexBuilder::new(
        config.rag.chunking(),
        embedder(&config, tmp.path()).expect("embedder"),
        config.embedding.batch_size,
        config.index.table.clone(),
    );
    let built = builder.build_from_scratch(&events[..1], &config.index_path(tmp.path())).await.expect("build");
    assert_eq!(built.chunks_created, 2);

    let pipeline = open_pipeline(&config, tmp.path()).await.expect("open");
    assert_eq!(pipeline.state().await, PipelineState::IndexLoaded);
    let stats = pipeline.rebuild(&events[1..]).await.expect("add");
    assert_eq!(stats.chunks_created, 2);
    assert_eq!(pipeline.status().await.vectors, Some(4));
}

#[tokio::test]
async fn answering_without_api_key_is_a_config_error() {
    let tmp = workspace();
    let config = load_config(tmp.path(), "test").expect("config");
    let builder = IndexBuilder::new(config.rag.chunking(), embedder(&config, tmp.path()).expect("embedder"), 8, "events");
    builder.build_from_scratch(&[], &config.index_path(tmp.path())).await.expect("empty build");

    match answering_pipeline(&config, tmp.path()).await {
        Err(err @ Error::InvalidConfig(_)) => assert!(remediation(&err).is_some()),
        Err(other) => panic!("expected InvalidConfig, got {other}"),
        Ok(_) => panic!("expected InvalidConfig"),
    }
}

#[test]
fn unavailable_cross_encoder_falls_back() {
    let tmp = workspace();
    let config = load_config(tmp.path(), "test").expect("config");
    assert!(relevance_scorer(&config, tmp.path()).is_none());
}
