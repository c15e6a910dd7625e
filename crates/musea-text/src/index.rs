use anyhow::Result;
use std::path::PathBuf;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, Index, TantivyDocument, Term};

use musea_core::traits::TextIndexer;
use musea_core::types::{Attrs, ChunkId, DocumentChunk, SearchHit, SourceKind};

use crate::schema::{build_schema, register_tokenizer};

const WRITER_HEAP_BYTES: usize = 50_000_000;

pub struct LexicalIndex {
    index: Index,
    id_field: tantivy::schema::Field,
    source_id_field: tantivy::schema::Field,
    text_field: tantivy::schema::Field,
    attrs_field: tantivy::schema::Field,
}

impl LexicalIndex {
    /// Open the index at `index_dir`, creating it when absent. Reopening an
    /// existing directory keeps previously indexed chunks.
    pub fn open_or_create(index_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&index_dir)?;
        let schema = build_schema();
        let dir = MmapDirectory::open(&index_dir)?;
        let index = Index::open_or_create(dir, schema.clone())?;
        register_tokenizer(&index);
        let id_field = schema.get_field("id")?;
        let source_id_field = schema.get_field("source_id")?;
        let text_field = schema.get_field("text")?;
        let attrs_field = schema.get_field("attrs")?;
        Ok(Self { index, id_field, source_id_field, text_field, attrs_field })
    }
}

impl TextIndexer for LexicalIndex {
    fn upsert(&self, chunks: &[DocumentChunk]) -> Result<()> {
        let mut writer = self.index.writer(WRITER_HEAP_BYTES)?;
        for c in chunks {
            // Replace-by-id keeps re-indexing idempotent.
            writer.delete_term(Term::from_field_text(self.id_field, &c.id));
            let attrs_json = serde_json::to_string(&c.attributes)?;
            writer.add_document(doc!(
                self.id_field => c.id.clone(),
                self.source_id_field => c.source_id.clone(),
                self.text_field => c.text.clone(),
                self.attrs_field => attrs_json,
            ))?;
        }
        writer.commit()?;
        Ok(())
    }

    fn remove(&self, ids: &[ChunkId]) -> Result<()> {
        let mut writer: tantivy::IndexWriter<TantivyDocument> =
            self.index.writer(WRITER_HEAP_BYTES)?;
        for id in ids {
            writer.delete_term(Term::from_field_text(self.id_field, id));
        }
        writer.commit()?;
        Ok(())
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let reader = self.index.reader()?;
        let searcher = reader.searcher();
        let qp = QueryParser::for_index(&self.index, vec![self.text_field]);
        // Natural-language questions carry punctuation tantivy's query
        // grammar would reject; lenient parsing drops the offending parts.
        let (q, _errors) = qp.parse_query_lenient(query);
        let top_docs = searcher.search(&q, &TopDocs::with_limit(k))?;
        let mut hits = Vec::new();
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let id = doc
                .get_first(self.id_field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let text = doc
                .get_first(self.text_field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let attributes: Attrs = doc
                .get_first(self.attrs_field)
                .and_then(|v| v.as_str())
                .and_then(|s| serde_json::from_str(s).ok())
                .unwrap_or_default();
            hits.push(SearchHit { id, score, source: SourceKind::Lexical, text, attributes });
        }
        Ok(hits)
    }

    fn doc_count(&self) -> Result<usize> {
        let reader = self.index.reader()?;
        Ok(reader.searcher().num_docs() as usize)
    }
}
