//! Model adapters behind the core `Embedder` / `Reranker` traits: candle
//! XLM-RoBERTa embedder and cross-encoder, plus deterministic offline
//! stand-ins selected by `models.use_fake_models` or `APP_USE_FAKE_EMBEDDINGS`.

use anyhow::Result;

use docqa_core::config::ModelSettings;
use docqa_core::traits::{Embedder, Reranker};

pub mod cross_encoder;
pub mod device;
pub mod fake;
pub mod files;
pub mod lexical;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use cross_encoder::CrossEncoderModel;
pub use fake::FakeEmbedder;
pub use lexical::LexicalOverlapReranker;
pub use model::EmbeddingModel;
pub use pool::masked_mean_l2;

fn use_fake_models(settings: &ModelSettings) -> bool {
    let from_env = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    from_env || settings.use_fake_models
}

pub fn get_default_embedder(settings: &ModelSettings) -> Result<Box<dyn Embedder>> {
    if use_fake_models(settings) {
        tracing::info!(dim = settings.fake_dim, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let dir = files::resolve_model_dir(settings.embedder_dir.as_deref(), "APP_MODEL_DIR", "bge-m3")?;
    Ok(Box::new(EmbeddingModel::load(&dir)?))
}

pub fn get_default_reranker(settings: &ModelSettings) -> Result<Box<dyn Reranker>> {
    if use_fake_models(settings) {
        tracing::info!("using LexicalOverlapReranker");
        return Ok(Box::new(LexicalOverlapReranker));
    }
    let dir = files::resolve_model_dir(settings.reranker_dir.as_deref(), "APP_RERANKER_DIR", "bge-reranker-v2-m3")?;
    Ok(Box::new(CrossEncoderModel::load(&dir)?))
}
