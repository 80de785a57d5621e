//! docqa-hybrid
//!
//! Dense + sparse candidate fusion, reranking and the retrieval orchestrator,
//! plus the query rewriting and conversation memory used around it.

pub mod fusion;
pub mod memory;
pub mod query;
pub mod rerank;
pub mod retriever;

pub use fusion::reciprocal_rank_fusion;
pub use memory::ConversationMemory;
pub use query::QueryEnhancer;
pub use retriever::{format_context, Retriever, RetrieveOptions};
