//! Collaborator seams of the retrieval core.
//!
//! Every model and store the orchestrator talks to sits behind one of these
//! traits, each with a single batched entry point.

use crate::error::{Error, Result};
use crate::types::{Chunk, DenseHit, MetadataFilter, SparseDocument};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::Scoring("embedder returned no vector for query".to_string()))
    }
}

/// Nearest-neighbour lookup over embeddings, nearest first by cosine distance.
pub trait DenseRetriever: Send + Sync {
    fn query(&self, embedding: &[f32], top_k: usize, filter: Option<&MetadataFilter>) -> Result<Vec<DenseHit>>;
}

/// Write side of a dense store. `index` replaces the whole collection;
/// `chunks` and `embeddings` are parallel.
pub trait DenseIndexer: DenseRetriever {
    fn index(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()>;
    fn count(&self) -> Result<usize>;
    fn clear(&self) -> Result<()>;
}

/// Lexical top-k search returning `(position, score)` plus position resolution.
pub trait SparseRetriever: Send + Sync {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<(usize, f32)>>;
    fn resolve(&self, positions: &[usize]) -> Result<Vec<SparseDocument>>;
}

/// Pairwise relevance model. Returns one score per `(query, passage)` pair,
/// higher is more relevant; the range is model specific.
pub trait Reranker: Send + Sync {
    fn score_pairs(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>>;
}
