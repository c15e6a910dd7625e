use tempfile::TempDir;

use musea_core::traits::{EmbedProvider, VectorIndex};
use musea_core::types::{Attrs, DocumentChunk, OriginKind};
use musea_core::Error;
use musea_vector::{HashEmbedder, VectorStore};

fn chunk(id: &str, text: &str) -> DocumentChunk {
    DocumentChunk {
        id: id.to_string(),
        source_id: "src".to_string(),
        origin: OriginKind::TaggedRecord,
        text: text.to_string(),
        attributes: Attrs::new(),
    }
}

async fn store_with(tmp: &TempDir, dim: usize) -> VectorStore {
    VectorStore::open(tmp.path().to_str().unwrap(), "chunks", dim)
        .await
        .expect("open store")
}

#[tokio::test]
async fn upsert_is_idempotent_per_chunk_id() {
    let tmp = TempDir::new().unwrap();
    let store = store_with(&tmp, 16).await;
    let embedder = HashEmbedder::new(16);
    let chunks = vec![chunk("src:0", "portrait of a queen"), chunk("src:1", "castle gardens")];
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vecs = embedder.embed_batch(&texts).await.unwrap();

    store.upsert(&chunks, &vecs).await.expect("first upsert");
    store.upsert(&chunks, &vecs).await.expect("second upsert");

    assert_eq!(store.count().await.unwrap(), 2, "no duplication on re-index");
}

#[tokio::test]
async fn search_returns_nearest_chunk_first() {
    let tmp = TempDir::new().unwrap();
    let store = store_with(&tmp, 32).await;
    let embedder = HashEmbedder::new(32);
    let chunks = vec![
        chunk("src:0", "portrait painting of the royal family"),
        chunk("src:1", "bronze sculpture in the museum garden"),
    ];
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vecs = embedder.embed_batch(&texts).await.unwrap();
    store.upsert(&chunks, &vecs).await.unwrap();

    let q = embedder
        .embed_batch(&["portrait painting of the royal family".to_string()])
        .await
        .unwrap();
    let hits = store.search(&q[0], 2).await.unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].id, "src:0");
    assert_eq!(hits[0].text, "portrait painting of the royal family");
}

#[tokio::test]
async fn remove_deletes_by_id() {
    let tmp = TempDir::new().unwrap();
    let store = store_with(&tmp, 8).await;
    let embedder = HashEmbedder::new(8);
    let chunks = vec![chunk("src:0", "alpha"), chunk("src:1", "beta")];
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vecs = embedder.embed_batch(&texts).await.unwrap();
    store.upsert(&chunks, &vecs).await.unwrap();

    store.remove(&["src:0".to_string()]).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn space_is_pinned_on_first_ensure_and_mismatch_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let store = store_with(&tmp, 8).await;

    store.ensure_space("hash:xx64:d8").await.expect("first pin");
    store.ensure_space("hash:xx64:d8").await.expect("same space again");

    let err = store
        .ensure_space("openai:text-embedding-3-large:d8")
        .await
        .expect_err("different space must fail");
    match err.downcast_ref::<Error>() {
        Some(Error::EmbeddingSpaceMismatch { indexed, query }) => {
            assert_eq!(indexed, "hash:xx64:d8");
            assert_eq!(query, "openai:text-embedding-3-large:d8");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Query-time verification fails the same way.
    assert!(store.verify_space("openai:text-embedding-3-large:d8").await.is_err());
    assert!(store.verify_space("hash:xx64:d8").await.is_ok());
}

#[tokio::test]
async fn get_all_returns_every_stored_chunk() {
    let tmp = TempDir::new().unwrap();
    let store = store_with(&tmp, 8).await;
    let embedder = HashEmbedder::new(8);
    let chunks = vec![chunk("src:0", "alpha"), chunk("src:1", "beta")];
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vecs = embedder.embed_batch(&texts).await.unwrap();
    store.upsert(&chunks, &vecs).await.unwrap();

    let mut all = store.get_all().await.unwrap();
    all.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, "src:0");
    assert_eq!(all[0].origin, OriginKind::TaggedRecord);
    assert_eq!(all[1].text, "beta");
}

#[tokio::test]
async fn drop_collection_removes_rows_and_meta() {
    let tmp = TempDir::new().unwrap();
    let store = store_with(&tmp, 8).await;
    store.ensure_space("hash:xx64:d8").await.unwrap();
    store.drop_collection().await.unwrap();

    // Reopening starts from an empty, unpinned collection.
    let store = store_with(&tmp, 8).await;
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(store.verify_space("openai:other:d8").await.is_ok());
}

#[tokio::test]
async fn wrong_dimension_embedding_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = store_with(&tmp, 8).await;
    let bad = vec![vec![0.0f32; 4]];
    assert!(store.upsert(&[chunk("src:0", "x")], &bad).await.is_err());
}
