//! Sentence-transformer (BERT family) embeddings run locally with candle.
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{info, warn};

use eventrag_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::encode_on_device;

/// Files a model directory must contain to be loadable.
pub const REQUIRED_MODEL_FILES: [&str; 3] = ["tokenizer.json", "config.json", "pytorch_model.bin"];

/// Loads `tokenizer.json`, truncating encodings to `max_len` tokens.
pub fn load_tokenizer(model_dir: &Path, max_len: usize) -> Result<Tokenizer> {
    let path = model_dir.join("tokenizer.json");
    let mut tokenizer =
        Tokenizer::from_file(&path).map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
        .map_err(|e| anyhow!("Invalid truncation for {}: {}", path.display(), e))?;
    Ok(tokenizer)
}

pub fn load_bert_config(model_dir: &Path) -> Result<BertConfig> {
    let path = model_dir.join("config.json");
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// PyTorch checkpoint as a var builder.
pub fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&path).with_context(|| format!("reading {}", path.display()))?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
}

impl LocalEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading local embedding model");
        let tokenizer = load_tokenizer(model_dir, max_len)?;
        let config = load_bert_config(model_dir)?;
        let dim = config.hidden_size;
        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        let model_id = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string());
        info!(model = %model_id, dim, "local embedding model ready");
        Ok(Self { model, tokenizer, device, model_id, dim, max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let enc = encode_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let hidden = self.model.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &enc.attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        anyhow::ensure!(emb.len() == self.dim, "expected {} dims, got {}", self.dim, emb.len());
        if start.elapsed().as_millis() > 250 {
            warn!(elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding");
        }
        Ok(emb)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}
