//! Domain types shared by the sparse index, dense adapters and the orchestrator.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ChunkId = String;
pub type Meta = BTreeMap<String, MetaValue>;

/// Exact-match metadata constraints passed to dense retrieval.
pub type MetadataFilter = BTreeMap<String, String>;

/// A metadata value: either a plain string or a list of strings
/// (entities, locations, production terms).
///
/// Ingestion output may carry numbers and booleans (`page_num`,
/// `char_length`, `has_dialogue`); those are stringified on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    List(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl RawScalar {
    fn into_string(self) -> String {
        match self {
            RawScalar::Text(s) => s,
            RawScalar::Int(i) => i.to_string(),
            // 3.0 renders as "3.0", not "3"
            RawScalar::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.1}"),
            RawScalar::Float(f) => f.to_string(),
            RawScalar::Bool(b) => if b { "True".to_string() } else { "False".to_string() },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMetaValue {
    Scalar(RawScalar),
    List(Vec<RawScalar>),
}

impl From<RawMetaValue> for MetaValue {
    fn from(raw: RawMetaValue) -> Self {
        match raw {
            RawMetaValue::Scalar(s) => MetaValue::Text(s.into_string()),
            RawMetaValue::List(items) => MetaValue::List(items.into_iter().map(RawScalar::into_string).collect()),
        }
    }
}

impl<'de> Deserialize<'de> for MetaValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawMetaValue::deserialize(deserializer).map(Into::into)
    }
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            MetaValue::List(_) => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Text(s) => f.write_str(s),
            MetaValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self { MetaValue::Text(s.to_string()) }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self { MetaValue::Text(s) }
}

impl From<Vec<String>> for MetaValue {
    fn from(items: Vec<String>) -> Self { MetaValue::List(items) }
}

/// The atomic retrievable unit produced by ingestion.
///
/// - `text`: the chunk payload
/// - `chunk_id`: sequence position within its source document
/// - `chunk_method`: provenance tag of the chunker that produced it
/// - `metadata`: source file, page number, chapter, extracted entities, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(default)]
    pub chunk_id: usize,
    #[serde(default)]
    pub chunk_method: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), chunk_id: 0, chunk_method: String::new(), metadata: Meta::new() }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Metadata copy carried by the indices: the chunk's own metadata plus
    /// `chunk_id` and `chunk_method`.
    pub fn index_metadata(&self) -> Meta {
        let mut meta = self.metadata.clone();
        meta.insert("chunk_id".to_string(), MetaValue::Text(self.chunk_id.to_string()));
        if !self.chunk_method.is_empty() {
            meta.insert("chunk_method".to_string(), MetaValue::Text(self.chunk_method.clone()));
        }
        meta
    }
}

/// Indicates which retrieval leg produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Dense,
    Sparse,
    Hybrid,
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalMethod::Dense => f.write_str("dense"),
            RetrievalMethod::Sparse => f.write_str("sparse"),
            RetrievalMethod::Hybrid => f.write_str("hybrid"),
        }
    }
}

/// A transient retrieval result.
///
/// Score fields are only present when the stage that produces them ran for
/// this candidate; a missing score is `None`, never a zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: ChunkId,
    pub text: String,
    pub metadata: Meta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bm25_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fusion_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    pub retrieval_method: RetrievalMethod,
}

impl Candidate {
    /// Dense candidate; similarity is `1 - distance` (cosine distance in [0, 2]).
    pub fn from_dense(hit: DenseHit) -> Self {
        Self {
            id: hit.id,
            text: hit.text,
            metadata: hit.metadata,
            distance: Some(hit.distance),
            similarity: Some(1.0 - hit.distance),
            bm25_score: None,
            fusion_score: None,
            rerank_score: None,
            retrieval_method: RetrievalMethod::Dense,
        }
    }

    pub fn from_sparse(doc: SparseDocument, score: f32) -> Self {
        Self {
            id: doc.doc_id,
            text: doc.text,
            metadata: doc.metadata,
            distance: None,
            similarity: None,
            bm25_score: Some(score),
            fusion_score: None,
            rerank_score: None,
            retrieval_method: RetrievalMethod::Sparse,
        }
    }

    pub fn meta_or_unknown(&self, key: &str) -> String {
        self.metadata.get(key).map_or_else(|| "Unknown".to_string(), ToString::to_string)
    }
}

/// Raw neighbour returned by a dense store, nearest first.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseHit {
    pub id: ChunkId,
    pub text: String,
    pub metadata: Meta,
    pub distance: f32,
}

/// A document reconstructed from the sparse index.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseDocument {
    pub position: usize,
    pub doc_id: String,
    pub text: String,
    pub metadata: Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation message as kept by the memory buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self { Self { role: Role::User, content: content.into() } }
    pub fn assistant(content: impl Into<String>) -> Self { Self { role: Role::Assistant, content: content.into() } }
}
