//! musea-vector
//!
//! LanceDB-backed vector index over chunk embeddings, plus the embedding
//! providers that feed it. The collection is pinned to one embedding space
//! through a key/value meta table; querying it with a different space is a
//! fatal configuration error.

pub mod meta;
pub mod provider;
pub mod schema;
pub mod store;

pub use provider::{embedder_from_settings, HashEmbedder, OpenAiEmbedder};
pub use store::VectorStore;
