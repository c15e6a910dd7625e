//! Builds the answer payload around the generated text: grounding context
//! for the prompt, per-source citations, and the media selection with
//! per-session duplicate suppression.

use std::collections::HashSet;

use musea_core::types::RetrievalResult;
use musea_session::MediaRegistry;

use crate::lang::{more_information_label, Lang};

/// Wikimedia Commons page titles carry a namespace prefix that reads badly
/// as link text.
const FILE_PREFIXES: &[&str] = &["File:", "Bestand:", "Fichier:", "Datei:"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub label: String,
    pub url: String,
}

/// Everything one answered turn returns to the caller.
#[derive(Debug, Clone)]
pub struct AnswerPayload {
    pub answer: String,
    pub citations: Vec<Citation>,
    /// Media URLs to display, first sighting per session only.
    pub media: Vec<String>,
}

/// Concatenate the fused chunks into the grounding block. Empty retrieval
/// yields an empty block; the system prompt then instructs the model to
/// answer from general knowledge.
pub fn build_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_system_prompt(template: &str, context: &str) -> String {
    template.replace("{context}", context)
}

/// Wiki-file chunks cite their title with the namespace prefix stripped;
/// every other source gets the generic localized label.
fn citation_label(result: &RetrievalResult, lang: Lang) -> String {
    let title = result
        .attributes
        .get("og:title")
        .or_else(|| result.attributes.get("title"))
        .map(String::as_str)
        .unwrap_or("")
        .trim();
    for prefix in FILE_PREFIXES {
        if let Some(stripped) = title.strip_prefix(prefix) {
            let stripped = stripped.trim_start();
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    more_information_label(lang).to_string()
}

/// One citation per distinct source URL, in fused order.
pub fn citations(results: &[RetrievalResult], lang: Lang) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for result in results {
        let url = match result.attributes.get("url") {
            Some(u) if !u.is_empty() => u.clone(),
            _ => continue,
        };
        if !seen.insert(url.clone()) {
            continue;
        }
        out.push(Citation { label: citation_label(result, lang), url });
    }
    out
}

/// Media URLs from the fused chunks that this session has not shown yet.
/// Registering happens here, so a URL surfaces at most once per session
/// until a reset.
pub fn select_media(results: &[RetrievalResult], registry: &mut MediaRegistry) -> Vec<String> {
    let mut out = Vec::new();
    for result in results {
        if let Some(url) = result.attributes.get("og:image") {
            if !url.is_empty() && registry.register(url) {
                out.push(url.clone());
            }
        }
    }
    out
}
