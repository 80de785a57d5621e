use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::path::Path;
use tokio::runtime::Runtime;

use docqa_core::error::Error;
use docqa_core::traits::{DenseIndexer, DenseRetriever};
use docqa_core::types::{Chunk, DenseHit, Meta, MetadataFilter};

use crate::schema::{build_arrow_schema, FILTER_COLUMNS};
use crate::table::{drop_if_exists, open_db, table_exists};
use crate::writer::{chunks_to_record_batch, BATCH_SIZE};

/// LanceDB-backed dense store (cosine distance). The sync trait surface
/// blocks on an owned runtime, so it must not be called from async code.
pub struct LanceDenseStore { rt: Runtime, db: Connection, table_name: String }

impl LanceDenseStore {
	pub fn open(db_path: &Path, table_name: &str) -> Result<Self> {
		let rt = Runtime::new()?;
		let db = rt.block_on(open_db(db_path.to_string_lossy().as_ref()))?;
		Ok(Self { rt, db, table_name: table_name.to_string() })
	}

	async fn query_async(&self, embedding: &[f32], top_k: usize, filter: Option<&MetadataFilter>) -> docqa_core::Result<Vec<DenseHit>> {
		let clause = filter.filter(|f| !f.is_empty()).map(filter_clause).transpose()?;
		if !table_exists(&self.db, &self.table_name).await.map_err(op)? {
			return Err(Error::IndexUnavailable(format!("LanceDB table '{}' does not exist", self.table_name)));
		}
		let table = self.db.open_table(&self.table_name).execute().await.map_err(op)?;
		let mut query = table.vector_search(embedding.to_vec()).map_err(op)?.distance_type(DistanceType::Cosine).limit(top_k);
		if let Some(clause) = clause { query = query.only_if(clause); }
		let mut stream = query.execute().await.map_err(op)?;
		let mut hits = Vec::new();
		while let Some(batch) = TryStreamExt::try_next(&mut stream).await.map_err(op)? {
			hits.extend(batch_to_hits(&batch).map_err(op)?);
		}
		hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
		tracing::debug!(hits = hits.len(), table = %self.table_name, "lance vector search");
		Ok(hits)
	}

	async fn index_async(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
		if chunks.len() != embeddings.len() { return Err(anyhow!("{} chunks but {} embeddings", chunks.len(), embeddings.len())); }
		drop_if_exists(&self.db, &self.table_name).await?;
		let Some(dim) = embeddings.first().map(|e| e.len() as i32) else {
			tracing::info!("no chunks to index");
			return Ok(());
		};
		let batches = chunks
			.chunks(BATCH_SIZE)
			.zip(embeddings.chunks(BATCH_SIZE))
			.enumerate()
			.map(|(i, (c, e))| chunks_to_record_batch(c, e, i * BATCH_SIZE, dim))
			.collect::<Result<Vec<RecordBatch>>>()?;
		let reader = Box::new(RecordBatchIterator::new(batches.into_iter().map(Ok), build_arrow_schema(dim)));
		self.db.create_table(&self.table_name, reader).execute().await?;
		tracing::info!(rows = chunks.len(), table = %self.table_name, "LanceDB table written");
		Ok(())
	}

	async fn count_async(&self) -> Result<usize> {
		if !table_exists(&self.db, &self.table_name).await? { return Ok(0); }
		let table = self.db.open_table(&self.table_name).execute().await?;
		Ok(table.count_rows(None).await?)
	}
}

fn op(e: impl std::fmt::Display) -> Error { Error::Operation(e.to_string()) }

/// Equality filter over the promoted metadata columns; any other key is a
/// configuration error.
pub fn filter_clause(filter: &MetadataFilter) -> docqa_core::Result<String> {
	let mut parts = Vec::with_capacity(filter.len());
	for (key, value) in filter {
		if !FILTER_COLUMNS.contains(&key.as_str()) {
			return Err(Error::InvalidConfig(format!("metadata filter on unsupported key '{key}' (filterable: {})", FILTER_COLUMNS.join(", "))));
		}
		parts.push(format!("{key} = '{}'", value.replace('\'', "''")));
	}
	Ok(parts.join(" AND "))
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("{name} column missing"))
}

fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<DenseHit>> {
	let ids = string_col(batch, "id")?;
	let texts = string_col(batch, "text")?;
	let metas = string_col(batch, "metadata")?;
	let distances = batch
		.column_by_name("_distance")
		.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
		.ok_or_else(|| anyhow!("_distance column missing"))?;
	let mut hits = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let metadata: Meta = serde_json::from_str(metas.value(i))?;
		let distance = if distances.is_valid(i) { distances.value(i) } else { 1.0 };
		hits.push(DenseHit { id: ids.value(i).to_string(), text: texts.value(i).to_string(), metadata, distance });
	}
	Ok(hits)
}

impl DenseRetriever for LanceDenseStore {
	fn query(&self, embedding: &[f32], top_k: usize, filter: Option<&MetadataFilter>) -> docqa_core::Result<Vec<DenseHit>> {
		if top_k == 0 { return Ok(Vec::new()); }
		self.rt.block_on(self.query_async(embedding, top_k, filter))
	}
}

impl DenseIndexer for LanceDenseStore {
	fn index(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> docqa_core::Result<()> {
		self.rt.block_on(self.index_async(chunks, embeddings)).map_err(|e| Error::IndexBuild(format!("{e:#}")))
	}

	fn count(&self) -> docqa_core::Result<usize> { self.rt.block_on(self.count_async()).map_err(op) }

	fn clear(&self) -> docqa_core::Result<()> { self.rt.block_on(drop_if_exists(&self.db, &self.table_name)).map_err(op) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filter_clause_escapes_and_rejects_unknown_keys() {
		let mut f = MetadataFilter::new();
		f.insert("source_file".into(), "o'neil.pdf".into());
		f.insert("page_num".into(), "4".into());
		assert_eq!(filter_clause(&f).unwrap(), "page_num = '4' AND source_file = 'o''neil.pdf'");
		f.insert("entities".into(), "x".into());
		assert!(matches!(filter_clause(&f), Err(Error::InvalidConfig(_))));
	}
}
