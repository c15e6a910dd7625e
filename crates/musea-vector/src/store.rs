use anyhow::{anyhow, Result};
use arrow_array::{
    Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::sync::Arc;

use async_trait::async_trait;
use musea_core::traits::VectorIndex;
use musea_core::types::{Attrs, ChunkId, DocumentChunk, OriginKind, SearchHit, SourceKind};
use musea_core::Error;

use crate::meta;
use crate::schema::build_chunks_schema;

fn origin_str(origin: OriginKind) -> &'static str {
    match origin {
        OriginKind::TaggedRecord => "tagged-record",
        OriginKind::PaginatedText => "paginated-text",
        OriginKind::TripleRecord => "triple-record",
    }
}

fn origin_from_str(s: &str) -> OriginKind {
    match s {
        "paginated-text" => OriginKind::PaginatedText,
        "triple-record" => OriginKind::TripleRecord,
        _ => OriginKind::TaggedRecord,
    }
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("column {name} missing or not Utf8"))
}

/// LanceDB-backed chunk store. One collection per store, fixed embedding
/// dimension, replace-by-id upserts.
pub struct VectorStore {
    db: Connection,
    table_name: String,
    meta_table: String,
    dim: usize,
}

impl VectorStore {
    pub async fn open(uri: &str, collection: &str, dim: usize) -> Result<Self> {
        let db = connect(uri).execute().await?;
        let names = db.table_names().execute().await?;
        if !names.contains(&collection.to_string()) {
            let iter = RecordBatchIterator::new(vec![].into_iter(), build_chunks_schema(dim as i32));
            db.create_table(collection, Box::new(iter)).execute().await?;
        }
        Ok(Self {
            db,
            table_name: collection.to_string(),
            meta_table: format!("{collection}_meta"),
            dim,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Pin the collection to `space_id`, or fail if it is already pinned to a
    /// different space. Called once per indexing run, before any write.
    pub async fn ensure_space(&self, space_id: &str) -> Result<()> {
        match meta::get_meta(&self.db, &self.meta_table, meta::SPACE_KEY).await? {
            Some(indexed) if indexed != space_id => Err(Error::EmbeddingSpaceMismatch {
                indexed,
                query: space_id.to_string(),
            }
            .into()),
            Some(_) => Ok(()),
            None => meta::set_meta(&self.db, &self.meta_table, meta::SPACE_KEY, space_id).await,
        }
    }

    /// Query-time check against the pinned space. An unpinned collection is
    /// empty and passes trivially.
    pub async fn verify_space(&self, space_id: &str) -> Result<()> {
        match meta::get_meta(&self.db, &self.meta_table, meta::SPACE_KEY).await? {
            Some(indexed) if indexed != space_id => Err(Error::EmbeddingSpaceMismatch {
                indexed,
                query: space_id.to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Full scan of the collection. Row order is storage order, not ranked.
    pub async fn get_all(&self) -> Result<Vec<DocumentChunk>> {
        let table = self.db.open_table(&self.table_name).execute().await?;
        let mut stream = table.query().execute().await?;
        let mut chunks = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let id_col = string_col(&batch, "id")?;
            let source_col = string_col(&batch, "source_id")?;
            let origin_col = string_col(&batch, "origin")?;
            let text_col = string_col(&batch, "text")?;
            let attrs_col = string_col(&batch, "attrs")?;
            for i in 0..batch.num_rows() {
                let attributes: Attrs =
                    serde_json::from_str(attrs_col.value(i)).unwrap_or_default();
                chunks.push(DocumentChunk {
                    id: id_col.value(i).to_string(),
                    source_id: source_col.value(i).to_string(),
                    origin: origin_from_str(origin_col.value(i)),
                    text: text_col.value(i).to_string(),
                    attributes,
                });
            }
        }
        Ok(chunks)
    }

    pub async fn drop_collection(&self) -> Result<()> {
        let names = self.db.table_names().execute().await?;
        for t in [&self.table_name, &self.meta_table] {
            if names.contains(t) {
                self.db.drop_table(t, &[]).await?;
            }
        }
        Ok(())
    }

    fn chunks_to_record_batch(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<RecordBatch> {
        let schema = build_chunks_schema(self.dim as i32);
        let mut ids = Vec::with_capacity(chunks.len());
        let mut source_ids = Vec::with_capacity(chunks.len());
        let mut origins = Vec::with_capacity(chunks.len());
        let mut texts = Vec::with_capacity(chunks.len());
        let mut attrs = Vec::with_capacity(chunks.len());
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            if embedding.len() != self.dim {
                return Err(anyhow!(
                    "embedding for chunk {} has {} dimensions, collection expects {}",
                    chunk.id,
                    embedding.len(),
                    self.dim
                ));
            }
            ids.push(chunk.id.clone());
            source_ids.push(chunk.source_id.clone());
            origins.push(origin_str(chunk.origin).to_string());
            texts.push(chunk.text.clone());
            attrs.push(serde_json::to_string(&chunk.attributes)?);
            vectors.push(Some(embedding.iter().map(|&x| Some(x)).collect()));
        }
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(source_ids)),
                Arc::new(StringArray::from(origins)),
                Arc::new(StringArray::from(texts)),
                Arc::new(StringArray::from(attrs)),
                Arc::new(
                    arrow_array::FixedSizeListArray::from_iter_primitive::<
                        arrow_array::types::Float32Type,
                        _,
                        _,
                    >(vectors.into_iter(), self.dim as i32),
                ),
            ],
        )?;
        Ok(batch)
    }
}

#[async_trait]
impl VectorIndex for VectorStore {
    async fn upsert(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        if chunks.len() != embeddings.len() {
            return Err(anyhow!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            ));
        }
        let batch = self.chunks_to_record_batch(chunks, embeddings)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let table = self.db.open_table(&self.table_name).execute().await?;
        // Replace-by-id keeps re-indexing idempotent.
        let mut mi = table.merge_insert(&["id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        let _ = mi.execute(reader).await?;
        Ok(())
    }

    async fn remove(&self, ids: &[ChunkId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        let quoted: Vec<String> = ids
            .iter()
            .map(|id| format!("'{}'", id.replace('\'', "''")))
            .collect();
        table
            .delete(&format!("id IN ({})", quoted.join(", ")))
            .await?;
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query_vec.len() != self.dim {
            return Err(anyhow!(
                "query vector has {} dimensions, collection expects {}",
                query_vec.len(),
                self.dim
            ));
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        let mut stream = table
            .vector_search(query_vec.to_vec())?
            .limit(k)
            .execute()
            .await?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let id_col = string_col(&batch, "id")?;
            let text_col = string_col(&batch, "text")?;
            let attrs_col = string_col(&batch, "attrs")?;
            let distance_col = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());
            for i in 0..batch.num_rows() {
                let score = match distance_col {
                    Some(d) => 1.0 - d.value(i),
                    None => 0.5,
                };
                let attributes: Attrs =
                    serde_json::from_str(attrs_col.value(i)).unwrap_or_default();
                hits.push(SearchHit {
                    id: id_col.value(i).to_string(),
                    score,
                    source: SourceKind::Vector,
                    text: text_col.value(i).to_string(),
                    attributes,
                });
            }
        }
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        let table = self.db.open_table(&self.table_name).execute().await?;
        Ok(table.count_rows(None).await?)
    }
}
