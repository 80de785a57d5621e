//! Chunk + embedding rows to Arrow record batches.
use anyhow::{bail, Result};
use arrow_array::{FixedSizeListArray, RecordBatch, StringArray};
use std::sync::Arc;

use docqa_core::types::Chunk;

use crate::schema::{build_arrow_schema, FILTER_COLUMNS};

pub const BATCH_SIZE: usize = 1000;

/// Rows are `offset..offset + chunks.len()`; the row position is the id.
pub fn chunks_to_record_batch(chunks: &[Chunk], embeddings: &[Vec<f32>], offset: usize, dim: i32) -> Result<RecordBatch> {
	if chunks.len() != embeddings.len() { bail!("{} chunks but {} embeddings", chunks.len(), embeddings.len()); }
	if let Some(bad) = embeddings.iter().find(|e| e.len() as i32 != dim) { bail!("embedding of dim {} in a dim {} table", bad.len(), dim); }

	let metas: Vec<_> = chunks.iter().map(Chunk::index_metadata).collect();
	let ids: Vec<String> = (offset..offset + chunks.len()).map(|i| i.to_string()).collect();
	let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
	let meta_json = metas.iter().map(serde_json::to_string).collect::<Result<Vec<_>, _>>()?;
	let vectors = embeddings.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));

	let mut columns: Vec<arrow_array::ArrayRef> = vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(texts)),
		Arc::new(StringArray::from(meta_json)),
	];
	for col in FILTER_COLUMNS {
		let values: Vec<Option<String>> = metas.iter().map(|m| m.get(*col).map(ToString::to_string)).collect();
		columns.push(Arc::new(StringArray::from(values)));
	}
	columns.push(Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)));
	Ok(RecordBatch::try_new(build_arrow_schema(dim), columns)?)
}
