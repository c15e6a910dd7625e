//! musea-ingest
//!
//! Normalizes heterogeneous raw sources (tagged JSON records, paginated
//! PDFs, RDF/XML triple records) into uniform `Document`s and splits them
//! into retrievable `DocumentChunk`s. See `normalize` for the batch entry
//! point with per-file failure tolerance.

pub mod chunker;
pub mod normalize;
mod pages;
mod tagged;
mod triples;

pub use chunker::chunk_documents;
pub use normalize::{normalize_path, Ingestor, IngestReport, NormalizerOptions};
