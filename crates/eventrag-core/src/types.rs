//! Domain types shared by the chunker, the vector stores and the RAG pipeline.

use serde::{Deserialize, Deserializer, Serialize};

/// A raw event record as exported by the OpenAgenda catalog.
///
/// Every field is optional: records coming from the catalog are only
/// semi-structured, so numbers may arrive as strings and keywords either as a
/// list or as a single string. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    pub uid: Option<String>,
    pub title_fr: Option<String>,
    pub description_fr: Option<String>,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub location_city: Option<String>,
    pub location_region: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub location_lat: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub location_lon: Option<f64>,
    pub firstdate_begin: Option<String>,
    pub lastdate_end: Option<String>,
    pub keywords_fr: Option<Keywords>,
    #[serde(deserialize_with = "lenient_text")]
    pub age_min: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub age_max: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub free: bool,
    pub canonicalurl: Option<String>,
}

/// Keywords are a list in most records, a plain string in a few.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    List(Vec<String>),
    Text(String),
}

impl Keywords {
    /// Joined representation limited to the first `limit` keywords.
    pub fn joined(&self, limit: usize) -> String {
        match self {
            Keywords::List(items) => items.iter().take(limit).map(String::as_str).collect::<Vec<_>>().join(", "),
            Keywords::Text(text) => text.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Keywords::List(items) => items.is_empty(),
            Keywords::Text(text) => text.is_empty(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Scalar>::deserialize(d)? {
        Some(Scalar::Text(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Scalar::Int(i)) => Some(i.to_string()),
        Some(Scalar::Float(f)) => Some(f.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Scalar>::deserialize(d)? {
        Some(Scalar::Float(f)) => Some(f),
        Some(Scalar::Int(i)) => Some(i as f64),
        Some(Scalar::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<Scalar>::deserialize(d)? {
        Some(Scalar::Bool(b)) => b,
        Some(Scalar::Int(i)) => i != 0,
        Some(Scalar::Text(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "oui" | "yes"),
        _ => false,
    })
}

/// Role of a chunk within its source event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Main,
    Practical,
    Description,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Main => "main",
            ChunkType::Practical => "practical",
            ChunkType::Description => "description",
        }
    }
}

/// Metadata propagated unchanged to every chunk of one event.
///
/// Only `chunk_type` and, for description chunks, `part` differ between
/// chunks of the same event. Dates are kept raw (not normalized).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub event_id: String,
    pub title: String,
    pub location_city: String,
    pub location_region: String,
    pub firstdate_begin: String,
    pub lastdate_end: String,
    pub url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub chunk_type: ChunkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<usize>,
}

/// An immutable unit of retrievable text derived from one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn chunk_type(&self) -> ChunkType {
        self.metadata.chunk_type
    }
}

/// A chunk returned by a vector store, with its similarity score and the
/// stored embedding (needed for diversity-aware selection).
///
/// `score` is store-specific but higher is always better.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub vector: Vec<f32>,
}

/// A retrieved chunk exposed to API consumers alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub content: String,
    pub metadata: ChunkMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl From<&Chunk> for Source {
    fn from(chunk: &Chunk) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            content: chunk.content.clone(),
            metadata: chunk.metadata.clone(),
            title: non_empty(&chunk.metadata.title),
            location: non_empty(&chunk.metadata.location_city),
        }
    }
}

/// Result of one question. `sources` is absent when the caller did not ask
/// for them or when the answer reads as "nothing found".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

/// Counters reported by an additive index update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildStats {
    pub events_processed: usize,
    pub chunks_created: usize,
}
