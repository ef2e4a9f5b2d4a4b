use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const VECTOR_COLUMN: &str = "vector";

/// Row layout of the chunk table. `metadata` holds the chunk metadata as JSON
/// so new metadata keys need no schema migration.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("event_id", DataType::Utf8, false),
		Field::new("chunk_type", DataType::Utf8, false),
		Field::new("content", DataType::Utf8, false),
		Field::new("metadata", DataType::Utf8, false),
		Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Vector width declared by a chunk table schema.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
		DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
		_ => None,
	}
}
