//! Paginated-text sources: one `Document` per PDF page.
//!
//! Page boundaries are source-defined and never re-split downstream. Pages
//! that fail text extraction are skipped with a warning; an unloadable file
//! fails as a whole.

use musea_core::types::{Attrs, Document, OriginKind};
use musea_core::{Error, Result};
use std::path::Path;
use tracing::warn;

pub fn normalize_pages(path: &Path, source_id: &str) -> Result<Vec<Document>> {
    let doc = lopdf::Document::load(path).map_err(|e| Error::MalformedSource {
        path: path.display().to_string(),
        reason: format!("failed to load PDF: {}", e),
    })?;

    let mut documents = Vec::new();
    for (page_no, _) in doc.get_pages() {
        let text = match doc.extract_text(&[page_no]) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), page = page_no, error = %e, "skipping unextractable page");
                continue;
            }
        };
        let text = text.trim().to_string();
        if text.is_empty() {
            continue;
        }

        let mut attributes = Attrs::new();
        attributes.insert("page".to_string(), page_no.to_string());
        attributes.insert("source".to_string(), path.display().to_string());

        documents.push(Document {
            source_id: source_id.to_string(),
            origin: OriginKind::PaginatedText,
            url: String::new(),
            title: source_id.to_string(),
            creator: String::new(),
            date: String::new(),
            media_url: String::new(),
            raw_text: text,
            attributes,
        });
    }
    Ok(documents)
}
