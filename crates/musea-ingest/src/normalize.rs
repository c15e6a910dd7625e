//! Batch normalization with per-file failure tolerance.
//!
//! This pipeline runs unattended over large file sets: one malformed file is
//! logged, recorded in the report and skipped; the rest of the batch
//! continues.

use crate::{pages, tagged, triples};
use musea_core::types::Document;
use musea_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct NormalizerOptions {
    /// Subject-URL prefixes identifying image hosts in triple records.
    pub image_host_prefixes: Vec<String>,
    /// Directory the source ids are derived relative to. Without it the id
    /// is the bare file stem, which collides across same-named files in
    /// different subdirectories.
    pub source_root: Option<PathBuf>,
}

/// Source id for a file: the path relative to `source_root` with the
/// extension dropped and `/` separators, or the bare stem when no root
/// applies. Chunk ids build on this, so it must be stable across runs.
pub fn source_id_for(path: &Path, root: Option<&Path>) -> String {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| p.display().to_string())
    };
    match root.and_then(|r| path.strip_prefix(r).ok()) {
        Some(rel) => {
            let mut parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            if let Some(last) = parts.last_mut() {
                let file = stem(Path::new(last.as_str()));
                *last = file;
            }
            if parts.is_empty() {
                stem(path)
            } else {
                parts.join("/")
            }
        }
        None => stem(path),
    }
}

/// Normalize one source file according to its extension.
pub fn normalize_path(path: &Path, opts: &NormalizerOptions) -> Result<Vec<Document>> {
    let source_id = source_id_for(path, opts.source_root.as_deref());
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => tagged::normalize_tagged(path, &source_id),
        "pdf" => pages::normalize_pages(path, &source_id),
        "xml" | "rdf" => triples::normalize_triples(path, &source_id, &opts.image_host_prefixes),
        other => Err(Error::MalformedSource {
            path: path.display().to_string(),
            reason: format!("unsupported source extension '{}'", other),
        }),
    }
}

/// Per-file outcome of a batch run, so partial success stays visible.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub files_ok: usize,
    pub documents: usize,
    pub failures: Vec<(PathBuf, String)>,
}

pub struct Ingestor {
    opts: NormalizerOptions,
}

impl Ingestor {
    pub fn new(opts: NormalizerOptions) -> Self {
        Self { opts }
    }

    /// Normalize many files; parse failures are logged and skipped.
    pub fn ingest_paths(&self, paths: &[PathBuf]) -> (Vec<Document>, IngestReport) {
        Self::run(&self.opts, paths)
    }

    fn run(opts: &NormalizerOptions, paths: &[PathBuf]) -> (Vec<Document>, IngestReport) {
        let mut documents = Vec::new();
        let mut report = IngestReport::default();
        for path in paths {
            match normalize_path(path, opts) {
                Ok(docs) => {
                    report.files_ok += 1;
                    report.documents += docs.len();
                    documents.extend(docs);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping source file");
                    report.failures.push((path.clone(), e.to_string()));
                }
            }
        }
        (documents, report)
    }

    /// Walk a directory for supported source files, sorted for stable ids.
    /// Source ids are the paths relative to `dir`, so same-named files in
    /// different subdirectories stay distinct.
    pub fn ingest_dir(&self, dir: &Path) -> (Vec<Document>, IngestReport) {
        let opts = NormalizerOptions {
            source_root: Some(dir.to_path_buf()),
            ..self.opts.clone()
        };
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| {
                matches!(
                    p.extension().and_then(|s| s.to_str()),
                    Some("json") | Some("pdf") | Some("xml") | Some("rdf")
                )
            })
            .collect();
        paths.sort();
        Self::run(&opts, &paths)
    }
}
