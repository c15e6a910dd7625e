//! Domain types shared by the ingestion, indexing and answering layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ChunkId = String;

/// String-keyed attributes carried by documents and chunks. A BTreeMap keeps
/// serialized attribute order stable, which keeps chunk payloads stable too.
pub type Attrs = BTreeMap<String, String>;

/// The raw source format a document was normalized from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OriginKind {
    TaggedRecord,
    PaginatedText,
    TripleRecord,
}

/// Uniform representation of one source unit after normalization.
///
/// Immutable once created. Optional metadata that the source did not carry is
/// the empty string, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub source_id: String,
    pub origin: OriginKind,
    pub url: String,
    pub title: String,
    pub creator: String,
    pub date: String,
    pub media_url: String,
    /// The text payload that gets chunked and embedded.
    pub raw_text: String,
    pub attributes: Attrs,
}

/// The unit of retrieval and of embedding.
///
/// `id` is stable across re-ingestion runs: `<source_id>:<offset>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub source_id: String,
    pub origin: OriginKind,
    pub text: String,
    pub attributes: Attrs,
}

/// Stable chunk identifier derived from the source id and chunk offset.
pub fn chunk_id(source_id: &str, offset: usize) -> ChunkId {
    format!("{}:{}", source_id, offset)
}

/// Indicates which index produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Lexical,
    Vector,
}

/// The minimal surface returned by both retrievers.
///
/// `score` is engine-specific but higher is always better; hits carry their
/// text and attributes so fusion output needs no second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
    pub text: String,
    pub attributes: Attrs,
}

/// One fused retrieval result. Transient, produced per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: ChunkId,
    pub lexical_rank: Option<usize>,
    pub vector_rank: Option<usize>,
    pub fused_score: f32,
    pub text: String,
    pub attributes: Attrs,
}

/// One completed question/answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question: question.into(), answer: answer.into(), timestamp: Utc::now() }
    }
}

/// Process-wide fusion defaults, overridable per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub lexical_weight: f32,
    pub vector_weight: f32,
    pub lexical_k: usize,
    pub vector_k: usize,
    /// Size of the final fused set returned to the caller.
    pub top_n: usize,
    /// Reciprocal-rank constant; 60 is the conventional choice.
    pub rrf_k: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            lexical_weight: 0.5,
            vector_weight: 0.5,
            lexical_k: 5,
            vector_k: 5,
            top_n: 5,
            rrf_k: 60.0,
        }
    }
}
