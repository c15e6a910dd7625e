//! Capability seams between the engine and its collaborators.
//!
//! Embedding and generation are external services consumed behind traits;
//! the two indices hide their storage engines behind `TextIndexer` and
//! `VectorIndex`.

use crate::types::{ChunkId, ConversationTurn, DocumentChunk, SearchHit};
use async_trait::async_trait;

/// Embedding capability. Implementations must return vectors of `dim()`
/// length and report a stable `space_id` identifying the embedding space;
/// mixing spaces across index and query is a correctness violation.
#[async_trait]
pub trait EmbedProvider: Send + Sync {
    fn space_id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Term-frequency index over chunk text. Upserts replace by chunk id.
pub trait TextIndexer: Send + Sync {
    fn upsert(&self, chunks: &[DocumentChunk]) -> anyhow::Result<()>;
    fn remove(&self, ids: &[ChunkId]) -> anyhow::Result<()>;
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchHit>>;
    fn doc_count(&self) -> anyhow::Result<usize>;
}

/// Embedding-similarity index over chunk vectors. Upserts replace by chunk id.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> anyhow::Result<()>;
    async fn remove(&self, ids: &[ChunkId]) -> anyhow::Result<()>;
    async fn search(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<SearchHit>>;
    async fn count(&self) -> anyhow::Result<usize>;
}

/// Generation capability. The prompt wording is an opaque payload owned by
/// configuration; this trait only moves it across the wire.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(
        &self,
        system: &str,
        history: &[ConversationTurn],
        user: &str,
    ) -> anyhow::Result<String>;
}
