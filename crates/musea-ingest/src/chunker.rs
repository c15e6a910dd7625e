//! Splits Documents into retrievable chunks.
//!
//! Tagged and triple record Documents map 1:1 to chunks; paginated text is
//! already one Document per page upstream, so it also maps 1:1. Chunk ids
//! are stable across runs: `<source_id>:<offset>` with the offset assigned
//! per source in document order.

use musea_core::types::{chunk_id, Document, DocumentChunk};
use std::collections::HashMap;

pub fn chunk_documents(documents: &[Document]) -> Vec<DocumentChunk> {
    let mut offsets: HashMap<&str, usize> = HashMap::new();
    let mut chunks = Vec::with_capacity(documents.len());
    for doc in documents {
        let offset = offsets.entry(doc.source_id.as_str()).or_insert(0);
        let mut attributes = doc.attributes.clone();
        // Canonical keys the assembler relies on, inherited from the
        // normalized fields when the raw attributes did not carry them.
        for (key, value) in [
            ("url", &doc.url),
            ("title", &doc.title),
            ("creator", &doc.creator),
            ("date", &doc.date),
            ("og:image", &doc.media_url),
        ] {
            if !value.is_empty() {
                attributes.entry(key.to_string()).or_insert_with(|| value.clone());
            }
        }
        chunks.push(DocumentChunk {
            id: chunk_id(&doc.source_id, *offset),
            source_id: doc.source_id.clone(),
            origin: doc.origin,
            text: doc.raw_text.clone(),
            attributes,
        });
        *offset += 1;
    }
    chunks
}
