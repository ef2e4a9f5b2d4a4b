//! Cross-encoder relevance model (BERT sequence classifier with one logit),
//! e.g. `ms-marco-MiniLM-L-6-v2`.
use std::path::Path;

use anyhow::Result;
use candle_core::Device;
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::BertModel;
use tokenizers::Tokenizer;
use tracing::info;

use eventrag_core::traits::RelevanceScorer;
use eventrag_embed::device::select_device;
use eventrag_embed::local::{load_bert_config, load_tokenizer, load_weights, REQUIRED_MODEL_FILES};
use eventrag_embed::tokenize::encode_on_device;

const MAX_PAIR_TOKENS: usize = 512;

pub struct CrossEncoderScorer {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoderScorer {
    pub fn load(model_dir: &Path) -> Result<Self> {
        if let Some(missing) = REQUIRED_MODEL_FILES.iter().find(|f| !model_dir.join(f).exists()) {
            anyhow::bail!("cross-encoder file {} missing in {}", missing, model_dir.display());
        }
        let device = select_device();
        let tokenizer = load_tokenizer(model_dir, MAX_PAIR_TOKENS)?;
        let config = load_bert_config(model_dir)?;
        let hidden = config.hidden_size;
        let vb = load_weights(model_dir, &device)?;
        let bert = BertModel::load(vb.pp("bert"), &config)?;
        let pooler = candle_nn::linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
        let classifier = candle_nn::linear(hidden, 1, vb.pp("classifier"))?;
        info!(dir = %model_dir.display(), "cross-encoder ready");
        Ok(Self { bert, pooler, classifier, tokenizer, device })
    }

    fn score_pair(&self, question: &str, passage: &str) -> Result<f32> {
        let enc = encode_on_device(&self.tokenizer, (question, passage), MAX_PAIR_TOKENS, &self.device)?;
        let hidden = self.bert.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        let values: Vec<f32> = logits.flatten_all()?.to_vec1()?;
        values.first().copied().ok_or_else(|| anyhow::anyhow!("cross-encoder produced no logit"))
    }
}

impl RelevanceScorer for CrossEncoderScorer {
    fn score(&self, question: &str, passages: &[&str]) -> Result<Vec<f32>> {
        passages.iter().map(|p| self.score_pair(question, p)).collect()
    }
}
