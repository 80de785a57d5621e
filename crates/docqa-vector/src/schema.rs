use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Metadata keys promoted to their own columns so they can be filtered on.
pub const FILTER_COLUMNS: &[&str] = &["source_file", "page_num", "chapter", "document_type", "chunk_method"];

pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	let mut fields = vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		// full metadata as JSON
		Field::new("metadata", DataType::Utf8, false),
	];
	fields.extend(FILTER_COLUMNS.iter().map(|name| Field::new(*name, DataType::Utf8, true)));
	fields.push(Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true));
	Arc::new(Schema::new(fields))
}
