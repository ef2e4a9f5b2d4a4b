use std::sync::Arc;

use anyhow::Result;
use arrow_array::{FixedSizeListArray, RecordBatch, StringArray};

use eventrag_core::types::Chunk;

use crate::schema::build_chunk_schema;

/// Content-derived row id. Identical chunks get identical ids; duplicates are
/// still stored.
pub fn row_id(chunk: &Chunk) -> String {
	let mut hasher = blake3::Hasher::new();
	hasher.update(chunk.metadata.event_id.as_bytes());
	hasher.update(chunk.chunk_type().as_str().as_bytes());
	hasher.update(&chunk.metadata.part.map_or(u64::MAX, |p| p as u64).to_le_bytes());
	hasher.update(chunk.content.as_bytes());
	hasher.finalize().to_hex()[..32].to_string()
}

pub fn chunks_to_record_batch(chunks: &[Chunk], vectors: &[Vec<f32>], dim: usize) -> Result<RecordBatch> {
	anyhow::ensure!(chunks.len() == vectors.len(), "{} chunks but {} vectors", chunks.len(), vectors.len());
	if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
		anyhow::bail!("vector has {} dims, index expects {}", bad.len(), dim);
	}
	let width = i32::try_from(dim)?;
	let mut ids = Vec::with_capacity(chunks.len());
	let mut event_ids = Vec::with_capacity(chunks.len());
	let mut types = Vec::with_capacity(chunks.len());
	let mut contents = Vec::with_capacity(chunks.len());
	let mut metadata = Vec::with_capacity(chunks.len());
	for chunk in chunks {
		ids.push(row_id(chunk));
		event_ids.push(chunk.metadata.event_id.clone());
		types.push(chunk.chunk_type().as_str().to_string());
		contents.push(chunk.content.clone());
		metadata.push(serde_json::to_string(&chunk.metadata)?);
	}
	let vectors = vectors.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));
	let record_batch = RecordBatch::try_new(build_chunk_schema(width), vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(event_ids)),
		Arc::new(StringArray::from(types)),
		Arc::new(StringArray::from(contents)),
		Arc::new(StringArray::from(metadata)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, width)),
	])?;
	Ok(record_batch)
}
