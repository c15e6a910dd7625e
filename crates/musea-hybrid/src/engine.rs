use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use musea_core::traits::{EmbedProvider, TextIndexer, VectorIndex};
use musea_core::types::{ChunkId, Document, DocumentChunk, FusionConfig, RetrievalResult};
use musea_core::Error;
use musea_ingest::chunk_documents;
use musea_text::LexicalIndex;
use musea_vector::VectorStore;

use crate::fusion::fuse;

/// Outcome of one indexing run. Failed batches left no trace in either
/// index and can be retried as-is.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub chunks_indexed: usize,
    pub batches_failed: Vec<Error>,
}

impl IndexReport {
    pub fn is_clean(&self) -> bool {
        self.batches_failed.is_empty()
    }
}

/// The retrieval engine: one lexical index, one vector store, one embedding
/// provider. Writes go to both indices in lockstep; queries fan out to both
/// and fuse.
pub struct HybridEngine {
    text: LexicalIndex,
    vector: VectorStore,
    embedder: Arc<dyn EmbedProvider>,
    fusion: FusionConfig,
}

impl HybridEngine {
    pub fn new(
        text: LexicalIndex,
        vector: VectorStore,
        embedder: Arc<dyn EmbedProvider>,
        fusion: FusionConfig,
    ) -> Self {
        Self { text, vector, embedder, fusion }
    }

    /// Chunk and index normalized documents. See [`Self::index_chunks`].
    pub async fn index_documents(
        &self,
        documents: &[Document],
        batch_size: usize,
    ) -> Result<IndexReport> {
        let chunks = chunk_documents(documents);
        self.index_chunks(&chunks, batch_size).await
    }

    /// Index `chunks` in batches of `batch_size`. Each batch is atomic across
    /// both indices: embed, write vectors, write text; when the text write
    /// fails the batch's vectors are rolled back. A failed batch is recorded
    /// and the run continues with the next one.
    pub async fn index_chunks(
        &self,
        chunks: &[DocumentChunk],
        batch_size: usize,
    ) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        if chunks.is_empty() {
            return Ok(report);
        }
        self.vector.ensure_space(self.embedder.space_id()).await?;

        for (batch_no, batch) in chunks.chunks(batch_size.max(1)).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = match self.embedder.embed_batch(&texts).await {
                Ok(e) => e,
                Err(e) => {
                    warn!(batch = batch_no, error = %e, "embedding failed, batch skipped");
                    report.batches_failed.push(Error::BatchAborted {
                        batch: batch_no,
                        reason: format!("embedding failed: {e}"),
                    });
                    continue;
                }
            };

            if let Err(e) = self.vector.upsert(batch, &embeddings).await {
                warn!(batch = batch_no, error = %e, "vector write failed, batch skipped");
                report.batches_failed.push(Error::BatchAborted {
                    batch: batch_no,
                    reason: format!("vector write failed: {e}"),
                });
                continue;
            }

            if let Err(e) = self.text.upsert(batch) {
                // Roll the batch's vectors back so the indices stay in step.
                let ids: Vec<ChunkId> = batch.iter().map(|c| c.id.clone()).collect();
                if let Err(comp) = self.vector.remove(&ids).await {
                    return Err(Error::IndexDiverged(format!(
                        "batch {batch_no}: text write failed ({e}) and vector rollback failed ({comp})"
                    ))
                    .into());
                }
                warn!(batch = batch_no, error = %e, "text write failed, batch rolled back");
                report.batches_failed.push(Error::BatchAborted {
                    batch: batch_no,
                    reason: format!("text write failed: {e}"),
                });
                continue;
            }

            report.chunks_indexed += batch.len();
            info!(batch = batch_no, chunks = batch.len(), "batch indexed");
        }
        Ok(report)
    }

    /// Retrieve and fuse. Fails fast when the query embedding space does not
    /// match the space the collection was indexed with.
    pub async fn search(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        self.vector.verify_space(self.embedder.space_id()).await?;
        let lexical = self.text.search(query, self.fusion.lexical_k)?;
        let query_vec = self
            .embedder
            .embed_batch(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embedding provider returned no vector"))?;
        let vector = self.vector.search(&query_vec, self.fusion.vector_k).await?;
        Ok(fuse(lexical, vector, &self.fusion))
    }

    pub fn lexical_count(&self) -> Result<usize> {
        self.text.doc_count()
    }

    pub async fn vector_count(&self) -> Result<usize> {
        self.vector.count().await
    }
}
