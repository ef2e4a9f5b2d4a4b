use anyhow::{anyhow, Context, Result};
use arrow_array::cast::AsArray;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, StringArray};

use eventrag_core::types::{Chunk, ChunkMetadata, ScoredChunk};

use crate::schema::VECTOR_COLUMN;

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| anyhow!("{name} column missing"))
}

/// Decodes one result batch of a cosine vector search. Scores are `1 - distance`.
pub fn batch_to_scored(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
	let contents = string_column(batch, "content")?;
	let metadata = string_column(batch, "metadata")?;
	let vectors = batch
		.column_by_name(VECTOR_COLUMN)
		.and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
		.ok_or_else(|| anyhow!("vector column missing"))?;
	let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());

	let mut out = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let meta: ChunkMetadata = serde_json::from_str(metadata.value(i)).context("decoding chunk metadata")?;
		let vector = if vectors.is_valid(i) {
			vectors.value(i).as_primitive::<arrow_array::types::Float32Type>().values().to_vec()
		} else {
			Vec::new()
		};
		let score = distances.map_or(0.0, |d| 1.0 - d.value(i));
		out.push(ScoredChunk { chunk: Chunk { content: contents.value(i).to_string(), metadata: meta }, score, vector });
	}
	Ok(out)
}
