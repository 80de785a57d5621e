//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nesting, e.g. `APP_RETRIEVAL__HYBRID_ALPHA`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Wrap an already assembled figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view of every section; missing keys fall back to defaults.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.retrieval.validate()?;
        settings.sparse.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        match env {
            "prod" | "production" => {
                // Fake models only make sense for development and tests.
                let fake: bool = self.get("models.use_fake_models").unwrap_or(false);
                if fake {
                    anyhow::bail!("models.use_fake_models must be false in production");
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub retrieval: RetrievalSettings,
    pub sparse: SparseSettings,
    pub models: ModelSettings,
    pub memory: MemorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub chunks_file: String,
    pub sparse_index_dir: String,
    pub lancedb_dir: String,
    pub table_name: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            chunks_file: "./data/chunks.jsonl".to_string(),
            sparse_index_dir: "./bm25_index".to_string(),
            lancedb_dir: "./lancedb".to_string(),
            table_name: "chunks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub initial_top_k: usize,
    pub final_top_n: usize,
    pub similarity_threshold: f32,
    pub hybrid_alpha: f32,
    pub use_reranking: bool,
    pub use_hybrid_search: bool,
    pub use_query_enhancement: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            initial_top_k: 25,
            final_top_n: 5,
            similarity_threshold: 0.3,
            hybrid_alpha: 0.5,
            use_reranking: true,
            use_hybrid_search: true,
            use_query_enhancement: true,
        }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.hybrid_alpha.is_finite() || !(0.0..=1.0).contains(&self.hybrid_alpha) {
            return Err(Error::InvalidConfig(format!("retrieval.hybrid_alpha must be within [0, 1], got {}", self.hybrid_alpha)));
        }
        if !self.similarity_threshold.is_finite() {
            return Err(Error::InvalidConfig("retrieval.similarity_threshold must be finite".to_string()));
        }
        Ok(())
    }
}

/// BM25 hyperparameters. Changing them after a build requires a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparseSettings {
    pub k1: f64,
    pub b: f64,
    pub epsilon: f64,
}

impl Default for SparseSettings {
    fn default() -> Self { Self { k1: 1.5, b: 0.75, epsilon: 0.25 } }
}

impl SparseSettings {
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(self.k1.is_finite() && self.k1 >= 0.0) {
            return Err(Error::InvalidConfig(format!("sparse.k1 must be non-negative, got {}", self.k1)));
        }
        if !(self.b.is_finite() && (0.0..=1.0).contains(&self.b)) {
            return Err(Error::InvalidConfig(format!("sparse.b must be within [0, 1], got {}", self.b)));
        }
        if !self.epsilon.is_finite() {
            return Err(Error::InvalidConfig("sparse.epsilon must be finite".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub embedder_dir: Option<String>,
    pub reranker_dir: Option<String>,
    pub use_fake_models: bool,
    pub fake_dim: usize,
}

impl Default for ModelSettings {
    fn default() -> Self { Self { embedder_dir: None, reranker_dir: None, use_fake_models: false, fake_dim: 1024 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub max_turns: usize,
}

impl Default for MemorySettings {
    fn default() -> Self { Self { max_turns: 5 } }
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
