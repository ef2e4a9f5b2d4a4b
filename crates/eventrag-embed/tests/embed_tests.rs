use std::path::Path;

use candle_core::{Device, Tensor};
use eventrag_core::config::{EmbeddingConfig, EmbeddingProviderKind, MistralConfig};
use eventrag_core::traits::Embedder;
use eventrag_embed::pool::masked_mean_l2;
use eventrag_embed::{EmbeddingProvider, HashingEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[tokio::test]
async fn hashing_embedder_is_deterministic_and_normalised() {
    let embedder = HashingEmbedder::new(64);
    let texts = vec!["Concert de jazz à Paris".to_string(), "Concert de jazz à Paris".to_string()];
    let vectors = embedder.embed_batch(&texts).await.expect("embed");

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].len(), 64);
    assert_eq!(vectors[0], vectors[1]);
    let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn shared_words_score_higher_than_disjoint_ones() {
    let embedder = HashingEmbedder::new(256);
    let query = embedder.embed_query("concert jazz paris").await.expect("query");
    let close = embedder.embed_query("Concert de jazz à Paris ce soir").await.expect("close");
    let far = embedder.embed_query("atelier poterie enfants Versailles").await.expect("far");

    assert!(cosine(&query, &close) > cosine(&query, &far));
}

#[test]
fn mistral_provider_requires_api_key() {
    let embedding = EmbeddingConfig { provider: EmbeddingProviderKind::Mistral, ..Default::default() };
    let mistral = MistralConfig { api_key: "  ".to_string(), ..Default::default() };

    let err = EmbeddingProvider::from_config(&embedding, &mistral, Path::new(".")).err().expect("should fail");
    assert!(err.to_string().contains("api_key"));
}

#[test]
fn local_provider_requires_model_files() {
    let tmp = tempfile::TempDir::new().expect("tmp");
    let embedding = EmbeddingConfig {
        provider: EmbeddingProviderKind::Local,
        local_model_dir: "no-such-model".to_string(),
        ..Default::default()
    };

    let err = EmbeddingProvider::from_config(&embedding, &MistralConfig::default(), tmp.path()).err().expect("should fail");
    assert!(err.is_not_found());
}

#[test]
fn hashing_provider_uses_configured_dimension() {
    let embedding = EmbeddingConfig { provider: EmbeddingProviderKind::Hashing, dimension: 48, ..Default::default() };
    let provider = EmbeddingProvider::from_config(&embedding, &MistralConfig::default(), Path::new(".")).expect("hashing");
    assert_eq!(provider.dim(), 48);
    assert_eq!(provider.model_id(), "hashing");
}

#[test]
fn masked_mean_ignores_padding() {
    let device = Device::Cpu;
    // one sequence, three tokens, two dims; the last token is padding
    let hidden = Tensor::new(&[[[3f32, 0.0], [3.0, 0.0], [0.0, 100.0]]], &device).expect("hidden");
    let mask = Tensor::new(&[[1u32, 1, 0]], &device).expect("mask");

    let pooled = masked_mean_l2(&hidden, &mask).expect("pool");
    let values: Vec<Vec<f32>> = pooled.to_vec2().expect("vec");
    assert!((values[0][0] - 1.0).abs() < 1e-5);
    assert!(values[0][1].abs() < 1e-5);
}
