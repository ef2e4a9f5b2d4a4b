use anyhow::{Result, anyhow};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Tokenizer};

/// Token tensors for one input, each shaped `[1, T]`.
pub struct Encoded {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Encodes a single text or a (question, passage) pair, truncated to `max_len` tokens.
pub fn encode_on_device<'s, E>(tokenizer: &Tokenizer, input: E, max_len: usize, device: &Device) -> Result<Encoded>
where
    E: Into<EncodeInput<'s>>,
{
    let enc = tokenizer.encode(input, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let len = enc.get_ids().len().min(max_len).max(1);
    let ids: Vec<u32> = enc.get_ids().iter().copied().take(len).collect();
    let types: Vec<u32> = enc.get_type_ids().iter().copied().take(len).collect();
    let mask: Vec<u32> = enc.get_attention_mask().iter().copied().take(len).collect();
    let n = ids.len();
    Ok(Encoded {
        input_ids: Tensor::from_vec(ids, (1, n), device)?,
        token_type_ids: Tensor::from_vec(types, (1, n), device)?,
        attention_mask: Tensor::from_vec(mask, (1, n), device)?,
    })
}
