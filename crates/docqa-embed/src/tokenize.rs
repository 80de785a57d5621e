use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Encoding, Tokenizer};

/// XLM-RoBERTa `<pad>` id.
pub const PAD_ID: u32 = 1;

/// Encode a batch (single texts or `(query, passage)` pairs) and pack it into
/// `[B, T]` id and attention-mask tensors, where `T` is the longest encoding
/// capped at `max_len`.
pub fn encode_batch_on_device<'s, E>(tokenizer: &Tokenizer, inputs: Vec<E>, max_len: usize, device: &Device) -> Result<(Tensor, Tensor)>
where
    E: Into<EncodeInput<'s>> + Send,
{
    let encodings = tokenizer.encode_batch(inputs, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    pack_encodings(&encodings, max_len, device)
}

pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    encode_batch_on_device(tokenizer, vec![text], max_len, device)
}

/// Truncate each encoding to `max_len`, right-pad with [`PAD_ID`] / mask 0.
pub fn pack_encodings(encodings: &[Encoding], max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let batch = encodings.len();
    let width = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);
    let mut ids = Vec::with_capacity(batch * width);
    let mut mask = Vec::with_capacity(batch * width);
    for enc in encodings {
        let n = enc.get_ids().len().min(width);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        ids.extend(std::iter::repeat(PAD_ID).take(width - n));
        mask.extend(std::iter::repeat(0u32).take(width - n));
    }
    let input_ids = Tensor::from_vec(ids, (batch, width), device)?;
    let attention_mask = Tensor::from_vec(mask, (batch, width), device)?;
    Ok((input_ids, attention_mask))
}
