use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mistral: MistralConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub rag: RagConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MistralConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.mistral.ai/v1".to_string(),
            model: "ministral-14b-2512".to_string(),
            temperature: 0.3,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Remote Mistral embeddings API.
    Mistral,
    /// Sentence-transformer weights on disk, run with candle.
    Local,
    /// Deterministic token hashing; no model, for tests and offline runs.
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub mistral_model: String,
    pub local_model_dir: String,
    pub max_len: usize,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Mistral,
            mistral_model: "mistral-embed-2312".to_string(),
            local_model_dir: "models/paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            max_len: 256,
            dimension: 1024,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub path: String,
    pub table: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { path: "data/index/lancedb".to_string(), table: "events".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
    pub fetch_multiplier: usize,
    pub mmr_lambda: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub enable_reranking: bool,
    pub rerank_top_n: usize,
    pub reranker_model_dir: String,
    pub no_info_phrases: Vec<String>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            fetch_multiplier: 2,
            mmr_lambda: 0.5,
            chunk_size: 300,
            chunk_overlap: 50,
            enable_reranking: true,
            rerank_top_n: 4,
            reranker_model_dir: "models/ms-marco-MiniLM-L-6-v2".to_string(),
            no_info_phrases: ["non disponible", "n'ai pas trouvé", "pas trouvé", "aucun événement"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl RagConfig {
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig { chunk_size: self.chunk_size, overlap: self.chunk_overlap }
    }

    pub fn fetch_k(&self) -> usize {
        self.top_k * self.fetch_multiplier
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the rolling JSON log file; no file logging when unset.
    pub file_dir: Option<String>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file_dir: None, json: false }
    }
}

impl AppConfig {
    /// Merges `config.toml`, `config.<RUST_ENV>.toml` and `APP_*` variables
    /// (`__` separates sections, e.g. `APP_RAG__TOP_K=5`) over the defaults.
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config: AppConfig = figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let rag = &self.rag;
        if rag.chunk_size == 0 {
            return Err(Error::InvalidConfig("rag.chunk_size must be positive".into()));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if rag.top_k == 0 || rag.fetch_multiplier == 0 {
            return Err(Error::InvalidConfig("rag.top_k and rag.fetch_multiplier must be positive".into()));
        }
        if !(0.0..=1.0).contains(&rag.mmr_lambda) {
            return Err(Error::InvalidConfig(format!("rag.mmr_lambda must be within [0, 1], got {}", rag.mmr_lambda)));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be positive".into()));
        }
        Ok(())
    }

    /// Index location, expanded and resolved against `base` when relative.
    pub fn index_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.index.path)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
