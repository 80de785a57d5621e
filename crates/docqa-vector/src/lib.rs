//! Dense retrieval stores behind `DenseRetriever` / `DenseIndexer`.
//!
//! `MemoryDenseStore` is always available; the LanceDB store is behind the
//! `lance` feature.

pub mod memory;
#[cfg(feature = "lance")]
pub mod schema;
#[cfg(feature = "lance")]
pub mod search;
#[cfg(feature = "lance")]
pub mod table;
#[cfg(feature = "lance")]
pub mod writer;

pub use memory::MemoryDenseStore;
#[cfg(feature = "lance")]
pub use search::LanceDenseStore;
