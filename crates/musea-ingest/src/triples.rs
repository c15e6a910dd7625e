//! Triple-record sources: RDF/XML metadata graphs.
//!
//! The file is walked into `(subject, predicate, object)` statements, then a
//! single `Document` is extracted through a fixed Dublin Core predicate
//! vocabulary. Missing optional predicates become empty fields. The primary
//! media URL is resolved by scanning statements whose subject matches a
//! known image-host prefix and whose object declares an image MIME type;
//! the first match in document order wins. No match leaves the media URL
//! empty rather than failing the file.

use musea_core::types::{Attrs, Document, OriginKind};
use musea_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use std::path::Path;

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const DCTERMS_NS: &str = "http://purl.org/dc/terms/";

#[derive(Debug, Clone)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

enum Frame {
    Subject,
    Predicate { uri: String, text: String },
}

/// Walk an RDF/XML file into statements. Any XML error fails the whole file.
pub fn parse_triples(path: &Path) -> Result<Vec<Triple>> {
    let malformed = |reason: String| Error::MalformedSource {
        path: path.display().to_string(),
        reason,
    };

    let xml = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    let mut reader = NsReader::from_str(&xml);

    let mut triples = Vec::new();
    let mut subjects: Vec<String> = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event() {
            Err(e) => return Err(malformed(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let uri = element_uri(&reader, &e).map_err(&malformed)?;
                let about = rdf_attr(&reader, &e, "about").map_err(&malformed)?;
                let resource = rdf_attr(&reader, &e, "resource").map_err(&malformed)?;
                if let Some(about) = about {
                    subjects.push(about);
                    frames.push(Frame::Subject);
                } else {
                    if let (Some(resource), Some(subject)) = (resource, subjects.last()) {
                        triples.push(Triple {
                            subject: subject.clone(),
                            predicate: uri.clone(),
                            object: resource,
                        });
                    }
                    frames.push(Frame::Predicate { uri, text: String::new() });
                }
            }
            Ok(Event::Empty(e)) => {
                let uri = element_uri(&reader, &e).map_err(&malformed)?;
                let resource = rdf_attr(&reader, &e, "resource").map_err(&malformed)?;
                if let (Some(resource), Some(subject)) = (resource, subjects.last()) {
                    triples.push(Triple {
                        subject: subject.clone(),
                        predicate: uri,
                        object: resource,
                    });
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(Frame::Predicate { text, .. }) = frames.last_mut() {
                    text.push_str(&t.unescape().map_err(|e| malformed(e.to_string()))?);
                }
            }
            Ok(Event::End(_)) => match frames.pop() {
                Some(Frame::Subject) => {
                    subjects.pop();
                }
                Some(Frame::Predicate { uri, text }) => {
                    let object = text.trim();
                    if !object.is_empty() {
                        if let Some(subject) = subjects.last() {
                            triples.push(Triple {
                                subject: subject.clone(),
                                predicate: uri,
                                object: object.to_string(),
                            });
                        }
                    }
                }
                None => {}
            },
            Ok(_) => {}
        }
    }
    Ok(triples)
}

fn element_uri<R>(
    reader: &NsReader<R>,
    e: &quick_xml::events::BytesStart<'_>,
) -> std::result::Result<String, String> {
    let (ns, local) = reader.resolve_element(e.name());
    let local = String::from_utf8_lossy(local.as_ref()).to_string();
    match ns {
        ResolveResult::Bound(ns) => {
            Ok(format!("{}{}", String::from_utf8_lossy(ns.as_ref()), local))
        }
        _ => Ok(local),
    }
}

fn rdf_attr<R>(
    reader: &NsReader<R>,
    e: &quick_xml::events::BytesStart<'_>,
    name: &str,
) -> std::result::Result<Option<String>, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let (ns, local) = reader.resolve_attribute(attr.key);
        if local.as_ref() != name.as_bytes() {
            continue;
        }
        let bound = matches!(&ns, ResolveResult::Bound(b) if b.as_ref() == RDF_NS.as_bytes());
        if bound {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

pub fn normalize_triples(
    path: &Path,
    source_id: &str,
    image_host_prefixes: &[String],
) -> Result<Vec<Document>> {
    let triples = parse_triples(path)?;
    if triples.is_empty() {
        return Err(Error::MalformedSource {
            path: path.display().to_string(),
            reason: "no RDF statements found".to_string(),
        });
    }

    let dc = |name: &str| format!("{}{}", DC_NS, name);

    // The record's subject is the resource carrying a dc:title; without one,
    // fall back to the first statement's subject.
    let (url, title) = triples
        .iter()
        .find(|t| t.predicate == dc("title"))
        .map(|t| (t.subject.clone(), t.object.clone()))
        .unwrap_or_else(|| (triples[0].subject.clone(), String::new()));

    let first_object = |predicate: String| {
        triples
            .iter()
            .find(|t| t.subject == url && t.predicate == predicate)
            .map(|t| t.object.clone())
            .unwrap_or_default()
    };

    let media_url = triples
        .iter()
        .find(|t| {
            image_host_prefixes.iter().any(|p| t.subject.starts_with(p.as_str()))
                && t.object.contains("image/")
        })
        .map(|t| t.subject.clone())
        .unwrap_or_default();

    let creator = first_object(dc("creator"));
    let date = first_object(dc("date"));
    let format = first_object(dc("format"));
    let kind = first_object(dc("type"));
    let description = first_object(dc("description"));
    let medium = first_object(format!("{}medium", DCTERMS_NS));

    let mut attributes = Attrs::new();
    attributes.insert("url".to_string(), url.clone());
    attributes.insert("og:image".to_string(), media_url.clone());
    attributes.insert("title".to_string(), title.clone());
    attributes.insert("creator".to_string(), creator.clone());
    attributes.insert("date".to_string(), date.clone());
    attributes.insert("format".to_string(), format);
    attributes.insert("type".to_string(), kind);
    attributes.insert("medium".to_string(), medium);
    attributes.insert("description".to_string(), description);

    let raw_text = serde_json::to_string(&attributes).map_err(|e| Error::MalformedSource {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(vec![Document {
        source_id: source_id.to_string(),
        origin: OriginKind::TripleRecord,
        url,
        title,
        creator,
        date,
        media_url,
        raw_text,
        attributes,
    }])
}
