//! musea-text
//!
//! Tantivy-based lexical (BM25) index over chunk text. Upserts replace by
//! chunk id so re-indexing the same source never duplicates.

pub mod index;
pub mod schema;

pub use index::LexicalIndex;
