//! Tagged-record sources: a JSON file holding an array of flat records.
//!
//! Each array element becomes one `Document`. A structurally malformed file
//! fails as a whole; there is no partial ingest of a tagged source.

use musea_core::types::{Attrs, Document, OriginKind};
use musea_core::{Error, Result};
use serde_json::Value;
use std::path::Path;

pub fn normalize_tagged(path: &Path, source_id: &str) -> Result<Vec<Document>> {
    let malformed = |reason: String| Error::MalformedSource {
        path: path.display().to_string(),
        reason,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| malformed(e.to_string()))?;
    let records = value
        .as_array()
        .ok_or_else(|| malformed("top-level value is not an array".to_string()))?;

    let mut documents = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let obj = record
            .as_object()
            .ok_or_else(|| malformed(format!("element {} is not an object", i)))?;

        let mut attributes = Attrs::new();
        for (key, val) in obj {
            attributes.insert(key.clone(), scalar_to_string(val));
        }

        let take = |key: &str| attributes.get(key).cloned().unwrap_or_default();
        let title = {
            let t = take("og:title");
            if t.is_empty() { take("title") } else { t }
        };

        documents.push(Document {
            source_id: source_id.to_string(),
            origin: OriginKind::TaggedRecord,
            url: take("url"),
            title,
            creator: take("creator"),
            date: take("date"),
            media_url: take("og:image"),
            // The record itself is what gets embedded and grounded on.
            raw_text: serde_json::to_string(record).map_err(|e| malformed(e.to_string()))?,
            attributes,
        });
    }
    Ok(documents)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Nested structures are kept as compact JSON text.
        other => other.to_string(),
    }
}
