use anyhow::{anyhow, Result};
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device};
use candle_transformers::models::xlm_roberta::XLMRobertaModel;
use tokenizers::Tokenizer;

use docqa_core::error::Error;
use docqa_core::traits::Embedder;

use crate::device::select_device;
use crate::files::{load_config, load_tokenizer, load_weights};
use crate::pool::masked_mean_l2;
use crate::tokenize::encode_batch_on_device;

pub const DEFAULT_MAX_LEN: usize = 512;

/// XLM-RoBERTa bi-encoder (BGE-M3 layout) with masked mean pooling.
pub struct EmbeddingModel { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize }

impl EmbeddingModel {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading embedding model");
        let tokenizer = load_tokenizer(model_dir)?;
        let config = load_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let model = XLMRobertaModel::new(&config, vb)?;
        tracing::info!(dim = config.hidden_size, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim: config.hidden_size, max_len: DEFAULT_MAX_LEN })
    }

    fn embed_inner(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let (input_ids, attention_mask) = encode_batch_on_device(&self.tokenizer, inputs, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask.to_dtype(DType::F32)?)?;
        let out: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        if out.iter().any(|v| v.len() != self.dim) {
            return Err(anyhow!("embedding dim mismatch, expected {}", self.dim));
        }
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_inner(&[text.to_string()])?.pop().ok_or_else(|| anyhow!("empty embedding batch"))
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> docqa_core::Result<Vec<Vec<f32>>> { self.embed_inner(texts).map_err(Error::scoring) }
}
