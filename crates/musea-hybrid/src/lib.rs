//! musea-hybrid
//!
//! Couples the lexical and vector indices behind one engine: lockstep
//! batch upserts at index time, weighted reciprocal-rank fusion at query
//! time.

pub mod engine;
pub mod fusion;

pub use engine::{HybridEngine, IndexReport};
pub use fusion::fuse;
