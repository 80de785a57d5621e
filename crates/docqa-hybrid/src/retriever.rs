//! Retrieval orchestrator: dense or hybrid candidate generation, threshold
//! filtering, optional reranking and truncation.

use std::sync::Arc;

use docqa_core::config::RetrievalSettings;
use docqa_core::error::{Error, Result};
use docqa_core::traits::{DenseRetriever, Embedder, Reranker, SparseRetriever};
use docqa_core::types::{Candidate, ChatMessage, MetadataFilter};

use crate::fusion::reciprocal_rank_fusion;
use crate::rerank::rerank;

/// Messages of history folded into a context-aware query.
pub const CONTEXT_MESSAGES: usize = 3;

pub const NO_CONTEXT: &str = "No relevant context found.";

#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveOptions {
    pub initial_top_k: usize,
    pub final_top_n: usize,
    pub similarity_threshold: f32,
    pub filter_metadata: Option<MetadataFilter>,
    /// Dense weight in fusion: 0 = pure sparse, 1 = pure dense.
    pub hybrid_alpha: f32,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self { initial_top_k: 25, final_top_n: 5, similarity_threshold: 0.3, filter_metadata: None, hybrid_alpha: 0.5 }
    }
}

impl From<&RetrievalSettings> for RetrieveOptions {
    fn from(s: &RetrievalSettings) -> Self {
        Self {
            initial_top_k: s.initial_top_k,
            final_top_n: s.final_top_n,
            similarity_threshold: s.similarity_threshold,
            filter_metadata: None,
            hybrid_alpha: s.hybrid_alpha,
        }
    }
}

impl RetrieveOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.hybrid_alpha.is_finite() || !(0.0..=1.0).contains(&self.hybrid_alpha) {
            return Err(Error::InvalidConfig(format!("hybrid_alpha must be within [0, 1], got {}", self.hybrid_alpha)));
        }
        if !self.similarity_threshold.is_finite() {
            return Err(Error::InvalidConfig(format!("similarity_threshold must be finite, got {}", self.similarity_threshold)));
        }
        Ok(())
    }
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    dense: Arc<dyn DenseRetriever>,
    sparse: Option<Arc<dyn SparseRetriever>>,
    reranker: Option<Arc<dyn Reranker>>,
    use_hybrid_search: bool,
    use_reranking: bool,
}

impl Retriever {
    /// Dense-only retriever; hybrid search and reranking are enabled but only
    /// take effect once a sparse index / reranker is attached.
    pub fn new(embedder: Arc<dyn Embedder>, dense: Arc<dyn DenseRetriever>) -> Self {
        Self { embedder, dense, sparse: None, reranker: None, use_hybrid_search: true, use_reranking: true }
    }

    pub fn with_sparse(mut self, sparse: Arc<dyn SparseRetriever>) -> Self { self.sparse = Some(sparse); self }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self { self.reranker = Some(reranker); self }

    pub fn hybrid_search(mut self, enabled: bool) -> Self { self.use_hybrid_search = enabled; self }

    pub fn reranking(mut self, enabled: bool) -> Self { self.use_reranking = enabled; self }

    fn hybrid_leg(&self) -> Option<&dyn SparseRetriever> {
        if self.use_hybrid_search { self.sparse.as_deref() } else { None }
    }

    pub fn retrieve(&self, query: &str, opts: &RetrieveOptions) -> Result<Vec<Candidate>> {
        opts.validate()?;
        if opts.initial_top_k == 0 { return Ok(Vec::new()); }

        let candidates = match self.hybrid_leg() {
            Some(sparse) => self.hybrid_retrieve(sparse, query, opts)?,
            None => self.dense_retrieve(query, opts.initial_top_k, Some(opts.similarity_threshold), opts.filter_metadata.as_ref())?,
        };
        if candidates.is_empty() { return Ok(candidates); }

        let mut candidates = match (&self.reranker, self.use_reranking) {
            (Some(reranker), true) => rerank(reranker.as_ref(), query, candidates)?,
            _ => candidates,
        };
        candidates.truncate(opts.final_top_n);
        tracing::debug!(results = candidates.len(), "retrieval finished");
        Ok(candidates)
    }

    /// Fold the last few history messages into the query before retrieving.
    pub fn retrieve_with_context(&self, query: &str, history: &[ChatMessage], opts: &RetrieveOptions) -> Result<Vec<Candidate>> {
        let query = contextual_query(query, history);
        self.retrieve(&query, opts)
    }

    /// Nearest first; with a threshold, candidates below it are dropped.
    fn dense_retrieve(&self, query: &str, top_k: usize, threshold: Option<f32>, filter: Option<&MetadataFilter>) -> Result<Vec<Candidate>> {
        let embedding = self.embedder.embed_query(query)?;
        let hits = self.dense.query(&embedding, top_k, filter)?;
        let candidates: Vec<Candidate> = hits
            .into_iter()
            .map(Candidate::from_dense)
            .filter(|c| threshold.map_or(true, |t| c.similarity.is_some_and(|s| s >= t)))
            .collect();
        tracing::debug!(dense = candidates.len(), "dense leg");
        Ok(candidates)
    }

    fn hybrid_retrieve(&self, sparse: &dyn SparseRetriever, query: &str, opts: &RetrieveOptions) -> Result<Vec<Candidate>> {
        let dense = self.dense_retrieve(query, opts.initial_top_k, None, opts.filter_metadata.as_ref())?;

        let hits = sparse.search(query, opts.initial_top_k)?;
        let positions: Vec<usize> = hits.iter().map(|(pos, _)| *pos).collect();
        let docs = sparse.resolve(&positions)?;
        let sparse_candidates: Vec<Candidate> = hits
            .iter()
            .filter_map(|(pos, score)| docs.iter().find(|d| d.position == *pos).map(|d| Candidate::from_sparse(d.clone(), *score)))
            .collect();
        tracing::debug!(dense = dense.len(), sparse = sparse_candidates.len(), "hybrid legs");

        let threshold = opts.similarity_threshold;
        let fused: Vec<Candidate> = reciprocal_rank_fusion(dense, sparse_candidates, opts.hybrid_alpha)
            .into_iter()
            .filter(|c| !c.similarity.is_some_and(|s| s < threshold))
            .collect();
        tracing::debug!(fused = fused.len(), "after fusion and threshold");
        Ok(fused)
    }
}

/// Contents of the last [`CONTEXT_MESSAGES`] messages followed by `query`,
/// space-separated.
pub fn contextual_query(query: &str, history: &[ChatMessage]) -> String {
    if history.is_empty() { return query.to_string(); }
    let skip = history.len().saturating_sub(CONTEXT_MESSAGES);
    history.iter().skip(skip).map(|m| m.content.as_str()).chain(std::iter::once(query)).collect::<Vec<_>>().join(" ")
}

/// Render candidates as numbered, source-attributed blocks for an LLM prompt.
pub fn format_context(candidates: &[Candidate]) -> String {
    if candidates.is_empty() { return NO_CONTEXT.to_string(); }
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[Source {}: {}, Page {}]\n{}\n", i + 1, c.meta_or_unknown("source_file"), c.meta_or_unknown("page_num"), c.text))
        .collect::<Vec<_>>()
        .join("\n")
}
