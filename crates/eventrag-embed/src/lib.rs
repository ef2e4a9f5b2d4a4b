pub mod device;
pub mod hashing;
pub mod local;
pub mod mistral;
pub mod pool;
pub mod tokenize;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use eventrag_core::config::{resolve_with_base, EmbeddingConfig, EmbeddingProviderKind, MistralConfig};
use eventrag_core::error::{Error, Result};
use eventrag_core::traits::Embedder;

pub use hashing::HashingEmbedder;
pub use local::LocalEmbedder;
pub use mistral::{MistralEmbedder, MISTRAL_EMBED_DIM};

/// The embedding backends this crate can drive, chosen from configuration.
pub enum EmbeddingProvider {
    Mistral(MistralEmbedder),
    Local(LocalEmbedder),
    Hashing(HashingEmbedder),
}

impl EmbeddingProvider {
    /// Builds the configured provider after checking it can actually run:
    /// a remote provider needs credentials, a local one needs its model files.
    pub fn from_config(embedding: &EmbeddingConfig, mistral: &MistralConfig, base: &Path) -> Result<Self> {
        let provider = match embedding.provider {
            EmbeddingProviderKind::Mistral => {
                if mistral.api_key.trim().is_empty() {
                    return Err(Error::InvalidConfig(
                        "embedding.provider is \"mistral\" but mistral.api_key is empty (set APP_MISTRAL__API_KEY)".into(),
                    ));
                }
                let client = MistralEmbedder::new(
                    &mistral.api_key,
                    &mistral.base_url,
                    embedding.mistral_model.clone(),
                    MISTRAL_EMBED_DIM,
                    embedding.batch_size,
                    Duration::from_secs(mistral.timeout_secs),
                )
                .map_err(|e| Error::InvalidConfig(format!("{e:#}")))?;
                EmbeddingProvider::Mistral(client)
            }
            EmbeddingProviderKind::Local => {
                let dir = resolve_with_base(base, &embedding.local_model_dir);
                if let Some(missing) = local::REQUIRED_MODEL_FILES.iter().find(|f| !dir.join(f).exists()) {
                    return Err(Error::NotFound(format!("local embedding model file {} in {}", missing, dir.display())));
                }
                let model = LocalEmbedder::load(&dir, embedding.max_len).map_err(|e| Error::collaborator("loading embedding model", e))?;
                EmbeddingProvider::Local(model)
            }
            EmbeddingProviderKind::Hashing => EmbeddingProvider::Hashing(HashingEmbedder::new(embedding.dimension)),
        };
        info!(model = provider.model_id(), dim = provider.dim(), "embedding provider ready");
        Ok(provider)
    }

    fn inner(&self) -> &dyn Embedder {
        match self {
            EmbeddingProvider::Mistral(e) => e,
            EmbeddingProvider::Local(e) => e,
            EmbeddingProvider::Hashing(e) => e,
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    fn dim(&self) -> usize {
        self.inner().dim()
    }

    fn model_id(&self) -> &str {
        self.inner().model_id()
    }

    fn is_remote(&self) -> bool {
        self.inner().is_remote()
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.inner().embed_batch(texts).await
    }
}
