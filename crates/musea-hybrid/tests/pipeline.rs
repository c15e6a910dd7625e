//! End-to-end: raw tagged records through normalization, chunking, lockstep
//! indexing and fused retrieval, all offline.

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use musea_core::traits::EmbedProvider;
use musea_core::types::FusionConfig;
use musea_core::Error;
use musea_hybrid::HybridEngine;
use musea_ingest::{chunk_documents, Ingestor, NormalizerOptions};
use musea_text::LexicalIndex;
use musea_vector::{HashEmbedder, VectorStore};

const DIM: usize = 32;

async fn engine_in(tmp: &TempDir) -> HybridEngine {
    let text = LexicalIndex::open_or_create(tmp.path().join("tantivy")).expect("text index");
    let vector = VectorStore::open(
        tmp.path().join("lancedb").to_str().unwrap(),
        "chunks",
        DIM,
    )
    .await
    .expect("vector store");
    HybridEngine::new(text, vector, Arc::new(HashEmbedder::new(DIM)), FusionConfig::default())
}

fn sample_chunks(tmp: &TempDir) -> Vec<musea_core::types::DocumentChunk> {
    let src = tmp.path().join("artworks.json");
    fs::write(
        &src,
        r#"[
            {"url": "https://example.org/a", "title": "Portrait of Queen Louise-Marie", "creator": "Winterhalter"},
            {"url": "https://example.org/b", "title": "View of the Royal Greenhouses", "creator": "Unknown"}
        ]"#,
    )
    .expect("write source");
    let ingestor = Ingestor::new(NormalizerOptions::default());
    let (docs, report) = ingestor.ingest_paths(&[src]);
    assert!(report.failures.is_empty());
    chunk_documents(&docs)
}

#[tokio::test]
async fn indexing_keeps_both_indices_in_lockstep() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_in(&tmp).await;
    let chunks = sample_chunks(&tmp);

    let report = engine.index_chunks(&chunks, 100).await.expect("index");
    assert!(report.is_clean());
    assert_eq!(report.chunks_indexed, 2);
    assert_eq!(engine.lexical_count().unwrap(), engine.vector_count().await.unwrap());
    assert_eq!(engine.lexical_count().unwrap(), 2);
}

#[tokio::test]
async fn reindexing_the_same_corpus_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_in(&tmp).await;
    let chunks = sample_chunks(&tmp);

    engine.index_chunks(&chunks, 100).await.expect("first run");
    engine.index_chunks(&chunks, 100).await.expect("second run");

    assert_eq!(engine.lexical_count().unwrap(), 2);
    assert_eq!(engine.vector_count().await.unwrap(), 2);
}

#[tokio::test]
async fn search_returns_fused_results_for_a_matching_query() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_in(&tmp).await;
    let chunks = sample_chunks(&tmp);
    engine.index_chunks(&chunks, 100).await.expect("index");

    let results = engine
        .search("Portrait of Queen Louise-Marie")
        .await
        .expect("search");
    assert!(!results.is_empty());
    assert_eq!(results[0].id, "artworks:0");
    assert!(results[0].lexical_rank.is_some() || results[0].vector_rank.is_some());
    assert!(results[0].fused_score > 0.0);
    assert_eq!(
        results[0].attributes.get("title").map(String::as_str),
        Some("Portrait of Queen Louise-Marie")
    );
}

#[tokio::test]
async fn index_documents_chunks_and_indexes_in_one_call() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_in(&tmp).await;
    let src = tmp.path().join("artworks.json");
    fs::write(&src, r#"[{"url": "a", "title": "X"}, {"url": "b", "title": "Y"}]"#).unwrap();
    let (docs, _) = Ingestor::new(NormalizerOptions::default()).ingest_paths(&[src]);

    let report = engine.index_documents(&docs, 100).await.expect("index");
    assert_eq!(report.chunks_indexed, 2);
    assert_eq!(engine.lexical_count().unwrap(), engine.vector_count().await.unwrap());
}

struct UnavailableEmbedder;

#[async_trait::async_trait]
impl EmbedProvider for UnavailableEmbedder {
    fn space_id(&self) -> &str {
        "hash:xx64:d32"
    }

    fn dim(&self) -> usize {
        DIM
    }

    async fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("embedding endpoint unavailable")
    }
}

#[tokio::test]
async fn embedding_failure_aborts_the_batch_and_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let text = LexicalIndex::open_or_create(tmp.path().join("tantivy")).expect("text index");
    let vector = VectorStore::open(
        tmp.path().join("lancedb").to_str().unwrap(),
        "chunks",
        DIM,
    )
    .await
    .expect("vector store");
    let engine = HybridEngine::new(
        text,
        vector,
        Arc::new(UnavailableEmbedder),
        FusionConfig::default(),
    );
    let chunks = sample_chunks(&tmp);

    let report = engine.index_chunks(&chunks, 100).await.expect("run completes");
    assert_eq!(report.chunks_indexed, 0);
    assert_eq!(report.batches_failed.len(), 1);
    assert!(matches!(report.batches_failed[0], Error::BatchAborted { .. }));
    assert_eq!(engine.lexical_count().unwrap(), 0, "lexical index untouched");
    assert_eq!(engine.vector_count().await.unwrap(), 0, "vector store untouched");
}

#[tokio::test]
async fn small_batches_index_the_whole_corpus() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_in(&tmp).await;
    let chunks = sample_chunks(&tmp);

    let report = engine.index_chunks(&chunks, 1).await.expect("index");
    assert!(report.is_clean());
    assert_eq!(report.chunks_indexed, 2);
    assert_eq!(engine.lexical_count().unwrap(), 2);
    assert_eq!(engine.vector_count().await.unwrap(), 2);
}
