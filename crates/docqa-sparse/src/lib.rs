//! docqa-sparse
//!
//! Persistent BM25 (Okapi) index over the chunk corpus. See `index` for the
//! build/search/resolve lifecycle and `bm25` for the scoring model.

pub mod bm25;
pub mod index;
pub mod tokenize;

pub use bm25::{Bm25Okapi, Bm25Params};
pub use index::SparseIndex;
pub use tokenize::Tokenizer;
