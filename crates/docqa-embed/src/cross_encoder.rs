use anyhow::{anyhow, Result};
use std::path::Path;

use candle_core::Device;
use candle_transformers::models::xlm_roberta::XLMRobertaForSequenceClassification;
use tokenizers::Tokenizer;

use docqa_core::error::Error;
use docqa_core::traits::Reranker;

use crate::device::select_device;
use crate::files::{load_config, load_tokenizer, load_weights};
use crate::tokenize::encode_batch_on_device;

pub const DEFAULT_MAX_LEN: usize = 512;

/// Cross-encoder reranker (BGE reranker layout): every `(query, passage)` pair
/// is encoded jointly and scored by a single-logit classification head.
pub struct CrossEncoderModel { model: XLMRobertaForSequenceClassification, tokenizer: Tokenizer, device: Device, max_len: usize }

impl CrossEncoderModel {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading cross-encoder");
        let tokenizer = load_tokenizer(model_dir)?;
        let config = load_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let model = XLMRobertaForSequenceClassification::new(1, &config, vb)?;
        Ok(Self { model, tokenizer, device, max_len: DEFAULT_MAX_LEN })
    }

    /// All pairs go through one padded batch and one forward pass.
    fn score_inner(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        if pairs.is_empty() { return Ok(Vec::new()); }
        let inputs: Vec<(&str, &str)> = pairs.to_vec();
        let (input_ids, attention_mask) = encode_batch_on_device(&self.tokenizer, inputs, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let logits = self.model.forward(&input_ids, &attention_mask, &token_type_ids)?;
        let scores: Vec<f32> = logits.flatten_all()?.to_device(&Device::Cpu)?.to_vec1()?;
        if scores.len() != pairs.len() {
            return Err(anyhow!("cross-encoder returned {} logits for {} pairs", scores.len(), pairs.len()));
        }
        tracing::debug!(pairs = pairs.len(), "cross-encoder scored batch");
        Ok(scores)
    }
}

impl Reranker for CrossEncoderModel {
    fn score_pairs(&self, pairs: &[(&str, &str)]) -> docqa_core::Result<Vec<f32>> { self.score_inner(pairs).map_err(Error::scoring) }
}
