use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use docqa_core::error::{Error, Result};
use docqa_core::traits::{DenseIndexer, DenseRetriever};
use docqa_core::types::{Chunk, DenseHit, Meta, MetadataFilter};

pub const STORE_FILE: &str = "dense_index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Row {
	id: String,
	text: String,
	metadata: Meta,
	vector: Vec<f32>,
}

/// Brute-force cosine store. Rows are scanned in insertion order, so equal
/// distances keep that order. With a `persist_dir` every `index`/`clear` is
/// written through to `dense_index.json`.
pub struct MemoryDenseStore {
	persist_dir: Option<PathBuf>,
	rows: RwLock<Arc<Vec<Row>>>,
}

impl Default for MemoryDenseStore {
	fn default() -> Self { Self::in_memory() }
}

impl MemoryDenseStore {
	pub fn in_memory() -> Self { Self { persist_dir: None, rows: RwLock::new(Arc::new(Vec::new())) } }

	/// Open a file-backed store; an unreadable file starts empty.
	pub fn open(persist_dir: impl Into<PathBuf>) -> Result<Self> {
		let persist_dir = persist_dir.into();
		fs::create_dir_all(&persist_dir)?;
		let rows = load_rows(&persist_dir.join(STORE_FILE)).unwrap_or_default();
		Ok(Self { persist_dir: Some(persist_dir), rows: RwLock::new(Arc::new(rows)) })
	}

	fn snapshot(&self) -> Result<Arc<Vec<Row>>> {
		self.rows.read().map(|r| Arc::clone(&r)).map_err(|_| Error::Operation("dense store lock poisoned".to_string()))
	}

	fn publish(&self, rows: Vec<Row>) -> Result<()> {
		if let Some(dir) = &self.persist_dir { persist_rows(dir, &rows)?; }
		let mut state = self.rows.write().map_err(|_| Error::Operation("dense store lock poisoned".to_string()))?;
		*state = Arc::new(rows);
		Ok(())
	}
}

fn load_rows(path: &Path) -> Option<Vec<Row>> {
	if !path.exists() { return None; }
	match fs::read(path).map_err(Error::from).and_then(|b| serde_json::from_slice(&b).map_err(Error::from)) {
		Ok(rows) => {
			let rows: Vec<Row> = rows;
			tracing::info!(rows = rows.len(), path = %path.display(), "dense store loaded");
			Some(rows)
		}
		Err(e) => {
			tracing::warn!(path = %path.display(), error = %e, "failed to load dense store, starting empty");
			None
		}
	}
}

fn persist_rows(dir: &Path, rows: &[Row]) -> Result<()> {
	let bytes = serde_json::to_vec(rows)?;
	let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
	tmp.write_all(&bytes)?;
	tmp.flush()?;
	tmp.persist(dir.join(STORE_FILE)).map_err(|e| Error::Io(e.error))?;
	Ok(())
}

/// Cosine distance in [0, 2]; a zero vector is at distance 1 from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
	let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
	let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
	if na == 0.0 || nb == 0.0 { return 1.0; }
	(1.0 - dot / (na * nb)).clamp(0.0, 2.0)
}

/// Equality on the stringified metadata value; lists render as `a, b`.
pub fn matches_filter(metadata: &Meta, filter: &MetadataFilter) -> bool {
	filter.iter().all(|(key, expected)| metadata.get(key).is_some_and(|v| v.to_string() == *expected))
}

impl DenseRetriever for MemoryDenseStore {
	fn query(&self, embedding: &[f32], top_k: usize, filter: Option<&MetadataFilter>) -> Result<Vec<DenseHit>> {
		if top_k == 0 { return Ok(Vec::new()); }
		let rows = self.snapshot()?;
		if let Some(first) = rows.first() {
			if first.vector.len() != embedding.len() {
				return Err(Error::Operation(format!("query dimension {} does not match index dimension {}", embedding.len(), first.vector.len())));
			}
		}
		let mut scored: Vec<(usize, f32)> = rows
			.iter()
			.enumerate()
			.filter(|(_, row)| filter.map_or(true, |f| matches_filter(&row.metadata, f)))
			.map(|(i, row)| (i, cosine_distance(embedding, &row.vector)))
			.collect();
		scored.sort_by(|a, b| a.1.total_cmp(&b.1));
		scored.truncate(top_k);
		Ok(scored
			.into_iter()
			.map(|(i, distance)| {
				let row = &rows[i];
				DenseHit { id: row.id.clone(), text: row.text.clone(), metadata: row.metadata.clone(), distance }
			})
			.collect())
	}
}

impl DenseIndexer for MemoryDenseStore {
	fn index(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
		if chunks.len() != embeddings.len() {
			return Err(Error::IndexBuild(format!("{} chunks but {} embeddings", chunks.len(), embeddings.len())));
		}
		if let Some(dim) = embeddings.first().map(Vec::len) {
			if embeddings.iter().any(|e| e.len() != dim) {
				return Err(Error::IndexBuild("embeddings have mixed dimensions".to_string()));
			}
		}
		let rows = chunks
			.iter()
			.zip(embeddings)
			.enumerate()
			.map(|(i, (chunk, vector))| Row { id: i.to_string(), text: chunk.text.clone(), metadata: chunk.index_metadata(), vector: vector.clone() })
			.collect();
		self.publish(rows)?;
		tracing::info!(rows = chunks.len(), "dense store indexed");
		Ok(())
	}

	fn count(&self) -> Result<usize> { Ok(self.snapshot()?.len()) }

	fn clear(&self) -> Result<()> {
		self.publish(Vec::new())?;
		if let Some(dir) = &self.persist_dir {
			let path = dir.join(STORE_FILE);
			if path.exists() { fs::remove_file(path)?; }
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cosine_distance_bounds() {
		assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
		assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
		assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
		assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
	}

	#[test]
	fn filter_compares_stringified_values() {
		let chunk = Chunk::new("x").with_meta("page_num", "3").with_meta("entities", vec!["A".to_string(), "B".to_string()]);
		let meta = chunk.index_metadata();
		let mut f = MetadataFilter::new();
		f.insert("page_num".into(), "3".into());
		assert!(matches_filter(&meta, &f));
		f.insert("entities".into(), "A, B".into());
		assert!(matches_filter(&meta, &f));
		f.insert("chapter".into(), "1".into());
		assert!(!matches_filter(&meta, &f), "missing key never matches");
	}
}
