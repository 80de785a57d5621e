use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::Config as XLMRobertaConfig;
use tokenizers::Tokenizer;

/// Locate a model directory: explicit setting, then `env_var`, then the
/// conventional `../models/<name>` and `models/<name>` locations.
pub fn resolve_model_dir(explicit: Option<&str>, env_var: &str, name: &str) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        let p = docqa_core::config::expand_path(dir);
        if p.exists() { return Ok(p); }
        return Err(anyhow!("Configured model dir does not exist: {}", p.display()));
    }
    if let Ok(dir) = std::env::var(env_var) {
        let p = PathBuf::from(&dir);
        if p.exists() { tracing::info!(var = env_var, dir = %p.display(), "using model dir from env"); return Ok(p); }
    }
    for candidate in [Path::new("..").join("models").join(name), Path::new("models").join(name)] {
        if candidate.exists() { tracing::info!(dir = %candidate.display(), "using model dir"); return Ok(candidate); }
    }
    Err(anyhow!("Could not locate model directory for {name} (set {env_var})"))
}

pub fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let path = model_dir.join("tokenizer.json");
    Tokenizer::from_file(&path).map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))
}

pub fn load_config(model_dir: &Path) -> Result<XLMRobertaConfig> {
    let path = model_dir.join("config.json");
    Ok(serde_json::from_str(&std::fs::read_to_string(&path)?)?)
}

/// Prefer `model.safetensors`, fall back to `pytorch_model.bin`.
pub fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    let weights: HashMap<String, Tensor> = if safetensors.exists() {
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        let pickle = model_dir.join("pytorch_model.bin");
        candle_core::pickle::read_all(&pickle)?.into_iter().collect()
    };
    Ok(VarBuilder::from_tensors(weights, DType::F32, device))
}
