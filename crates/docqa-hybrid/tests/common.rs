#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use docqa_core::error::{Error, Result};
use docqa_core::traits::{DenseRetriever, Embedder, Reranker, SparseRetriever};
use docqa_core::types::{DenseHit, Meta, MetaValue, MetadataFilter, SparseDocument};

pub struct StubEmbedder;

impl Embedder for StubEmbedder {
    fn dim(&self) -> usize { 2 }
    fn max_len(&self) -> usize { 512 }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect()) }
}

/// Returns its hits verbatim (already nearest first), honouring `top_k`.
pub struct StubDense { pub hits: Vec<DenseHit> }

impl StubDense {
    pub fn new(rows: &[(&str, f32)]) -> Self {
        let hits = rows
            .iter()
            .enumerate()
            .map(|(i, (text, distance))| {
                let mut metadata = Meta::new();
                metadata.insert("source_file".into(), MetaValue::Text(format!("dense{i}.pdf")));
                DenseHit { id: format!("d{i}"), text: (*text).to_string(), metadata, distance: *distance }
            })
            .collect();
        Self { hits }
    }
}

impl DenseRetriever for StubDense {
    fn query(&self, _embedding: &[f32], top_k: usize, _filter: Option<&MetadataFilter>) -> Result<Vec<DenseHit>> {
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }
}

/// Ranked list of `(text, score)`; position is the list index.
pub struct StubSparse { pub docs: Vec<(String, f32)> }

impl StubSparse {
    pub fn new(rows: &[(&str, f32)]) -> Self { Self { docs: rows.iter().map(|(t, s)| ((*t).to_string(), *s)).collect() } }
}

impl SparseRetriever for StubSparse {
    fn search(&self, _query: &str, top_k: usize) -> Result<Vec<(usize, f32)>> {
        Ok(self.docs.iter().enumerate().take(top_k).map(|(i, (_, s))| (i, *s)).collect())
    }

    fn resolve(&self, positions: &[usize]) -> Result<Vec<SparseDocument>> {
        Ok(positions
            .iter()
            .filter_map(|&p| self.docs.get(p).map(|(text, _)| SparseDocument { position: p, doc_id: p.to_string(), text: text.clone(), metadata: Meta::new() }))
            .collect())
    }
}

pub struct FailingDense;

impl DenseRetriever for FailingDense {
    fn query(&self, _: &[f32], _: usize, _: Option<&MetadataFilter>) -> Result<Vec<DenseHit>> {
        Err(Error::Operation("dense store offline".into()))
    }
}

pub struct FailingSparse;

impl SparseRetriever for FailingSparse {
    fn search(&self, _: &str, _: usize) -> Result<Vec<(usize, f32)>> { Err(Error::IndexUnavailable("sparse index has not been built".into())) }
    fn resolve(&self, _: &[usize]) -> Result<Vec<SparseDocument>> { Ok(Vec::new()) }
}

/// Scores passages by length and counts calls.
#[derive(Default)]
pub struct CountingReranker { pub calls: AtomicUsize }

impl CountingReranker {
    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Reranker for CountingReranker {
    fn score_pairs(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(pairs.iter().map(|(_, p)| p.len() as f32).collect())
    }
}

pub struct FailingReranker;

impl Reranker for FailingReranker {
    fn score_pairs(&self, _: &[(&str, &str)]) -> Result<Vec<f32>> { Err(Error::Scoring("model crashed".into())) }
}
