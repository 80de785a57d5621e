use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a model-side failure (candle, tokenizers, remote scorer) as a scoring error.
    pub fn scoring(err: impl std::fmt::Display) -> Self { Error::Scoring(err.to_string()) }
}

pub type Result<T> = std::result::Result<T, Error>;
