use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use docqa_core::error::{Error, Result};
use docqa_core::traits::SparseRetriever;
use docqa_core::types::{Chunk, Meta, SparseDocument};

use crate::bm25::{Bm25Okapi, Bm25Params};
use crate::tokenize::Tokenizer;

pub const INDEX_FILE: &str = "bm25_index.json";

/// On-disk form: tokenized corpus, parallel ids and metadata, and the
/// hyperparameters needed to reproduce the exact same scores on reload.
#[derive(Serialize, Deserialize)]
struct PersistedIndex {
	documents: Vec<Vec<String>>,
	doc_ids: Vec<String>,
	metadata: Vec<Meta>,
	bm25_params: Bm25Params,
}

/// One immutable published state. `documents`, `doc_ids` and `metadata` are
/// parallel; `model` is `None` until something has been built.
struct Snapshot {
	documents: Vec<Vec<String>>,
	doc_ids: Vec<String>,
	metadata: Vec<Meta>,
	model: Option<Bm25Okapi>,
}

impl Snapshot {
	fn empty() -> Self { Self { documents: Vec::new(), doc_ids: Vec::new(), metadata: Vec::new(), model: None } }

	fn new(documents: Vec<Vec<String>>, doc_ids: Vec<String>, metadata: Vec<Meta>, params: Bm25Params) -> Self {
		let model = if documents.is_empty() { None } else { Some(Bm25Okapi::new(&documents, params)) };
		Self { documents, doc_ids, metadata, model }
	}
}

/// Persistent BM25 index over the full chunk corpus.
///
/// Readers take a cheap `Arc` clone of the published snapshot; `build`
/// prepares a complete new snapshot, persists it, and only then swaps it in,
/// so a rebuild in progress is never observed.
pub struct SparseIndex {
	persist_dir: PathBuf,
	params: Bm25Params,
	tokenizer: Tokenizer,
	state: RwLock<Arc<Snapshot>>,
	writer: Mutex<()>,
}

impl SparseIndex {
	/// Open the index stored under `persist_dir`, creating the directory if
	/// needed. A missing or unreadable index file is not an error: the index
	/// starts empty and must be rebuilt.
	pub fn open(persist_dir: impl Into<PathBuf>, params: Bm25Params) -> Result<Self> {
		let persist_dir = persist_dir.into();
		fs::create_dir_all(&persist_dir)?;
		let snapshot = load_snapshot(&persist_dir.join(INDEX_FILE), params).unwrap_or_else(Snapshot::empty);
		Ok(Self {
			persist_dir,
			params,
			tokenizer: Tokenizer::default(),
			state: RwLock::new(Arc::new(snapshot)),
			writer: Mutex::new(()),
		})
	}

	pub fn index_path(&self) -> PathBuf { self.persist_dir.join(INDEX_FILE) }

	/// Replace the whole index with `chunks`. Partial updates are not supported.
	pub fn build(&self, chunks: &[Chunk]) -> Result<()> {
		if chunks.is_empty() {
			return Err(Error::IndexBuild("cannot build a sparse index from zero chunks".to_string()));
		}
		let _guard = self.writer.lock().map_err(|_| Error::Operation("sparse index writer lock poisoned".to_string()))?;
		tracing::info!(chunks = chunks.len(), "building BM25 index");

		let mut documents = Vec::with_capacity(chunks.len());
		let mut doc_ids = Vec::with_capacity(chunks.len());
		let mut metadata = Vec::with_capacity(chunks.len());
		for (i, chunk) in chunks.iter().enumerate() {
			documents.push(self.tokenizer.tokenize(&chunk.text));
			doc_ids.push(i.to_string());
			metadata.push(chunk.index_metadata());
		}

		let persisted = PersistedIndex { documents, doc_ids, metadata, bm25_params: self.params };
		self.persist(&persisted)?;
		let PersistedIndex { documents, doc_ids, metadata, bm25_params } = persisted;
		self.publish(Snapshot::new(documents, doc_ids, metadata, bm25_params))?;
		tracing::info!(documents = chunks.len(), path = %self.index_path().display(), "BM25 index built");
		Ok(())
	}

	/// Top `top_k` positions by BM25 score, best first. Documents without any
	/// query-term overlap are never returned.
	pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<(usize, f32)>> {
		if top_k == 0 { return Ok(Vec::new()); }
		let snapshot = self.snapshot()?;
		let Some(model) = snapshot.model.as_ref() else {
			return Err(Error::IndexUnavailable("sparse index has not been built".to_string()));
		};
		let tokens = self.tokenizer.tokenize(query);
		let hits: Vec<(usize, f32)> = model.top_k(&tokens, top_k).into_iter().map(|(pos, score)| (pos, score as f32)).collect();
		tracing::debug!(query, hits = hits.len(), "sparse search");
		Ok(hits)
	}

	/// Reconstruct documents for `positions`. Text is the stored tokens joined
	/// by single spaces, so original whitespace and casing are lost.
	/// Out-of-range positions are skipped.
	pub fn resolve(&self, positions: &[usize]) -> Result<Vec<SparseDocument>> {
		let snapshot = self.snapshot()?;
		Ok(positions
			.iter()
			.filter(|&&pos| pos < snapshot.documents.len())
			.map(|&pos| SparseDocument {
				position: pos,
				doc_id: snapshot.doc_ids[pos].clone(),
				text: snapshot.documents[pos].join(" "),
				metadata: snapshot.metadata[pos].clone(),
			})
			.collect())
	}

	/// Drop all documents and delete the persisted file.
	pub fn clear(&self) -> Result<()> {
		let _guard = self.writer.lock().map_err(|_| Error::Operation("sparse index writer lock poisoned".to_string()))?;
		self.publish(Snapshot::empty())?;
		let path = self.index_path();
		if path.exists() { fs::remove_file(&path)?; }
		tracing::info!("BM25 index cleared");
		Ok(())
	}

	pub fn len(&self) -> usize { self.snapshot().map(|s| s.documents.len()).unwrap_or(0) }

	pub fn is_empty(&self) -> bool { self.len() == 0 }

	/// Hyperparameters of the published model, or the configured ones when
	/// nothing is built yet.
	pub fn params(&self) -> Bm25Params {
		self.snapshot().ok().and_then(|s| s.model.as_ref().map(Bm25Okapi::params)).unwrap_or(self.params)
	}

	fn snapshot(&self) -> Result<Arc<Snapshot>> {
		self.state
			.read()
			.map(|s| Arc::clone(&s))
			.map_err(|_| Error::Operation("sparse index state lock poisoned".to_string()))
	}

	fn publish(&self, snapshot: Snapshot) -> Result<()> {
		let mut state = self.state.write().map_err(|_| Error::Operation("sparse index state lock poisoned".to_string()))?;
		*state = Arc::new(snapshot);
		Ok(())
	}

	fn persist(&self, index: &PersistedIndex) -> Result<()> {
		let bytes = serde_json::to_vec(index)?;
		let mut tmp = tempfile::NamedTempFile::new_in(&self.persist_dir)?;
		tmp.write_all(&bytes)?;
		tmp.flush()?;
		tmp.persist(self.index_path()).map_err(|e| Error::Io(e.error))?;
		Ok(())
	}
}

fn load_snapshot(path: &Path, configured: Bm25Params) -> Option<Snapshot> {
	if !path.exists() { return None; }
	let persisted: PersistedIndex = match fs::read(path).map_err(Error::from).and_then(|b| serde_json::from_slice(&b).map_err(Error::from)) {
		Ok(p) => p,
		Err(e) => {
			tracing::warn!(path = %path.display(), error = %e, "failed to load BM25 index, starting empty");
			return None;
		}
	};
	let n = persisted.documents.len();
	if persisted.doc_ids.len() != n || persisted.metadata.len() != n {
		tracing::warn!(path = %path.display(), "BM25 index has mismatched parallel arrays, starting empty");
		return None;
	}
	if persisted.bm25_params != configured {
		tracing::info!(saved = ?persisted.bm25_params, configured = ?configured, "using saved BM25 parameters; rebuild to apply the configured ones");
	}
	tracing::info!(documents = n, "BM25 index loaded");
	Some(Snapshot::new(persisted.documents, persisted.doc_ids, persisted.metadata, persisted.bm25_params))
}

impl SparseRetriever for SparseIndex {
	fn search(&self, query: &str, top_k: usize) -> Result<Vec<(usize, f32)>> { SparseIndex::search(self, query, top_k) }
	fn resolve(&self, positions: &[usize]) -> Result<Vec<SparseDocument>> { SparseIndex::resolve(self, positions) }
}
