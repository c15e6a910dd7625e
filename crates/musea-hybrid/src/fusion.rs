//! Weighted reciprocal-rank fusion.
//!
//! Each retriever contributes `weight / (rrf_k + rank)` for every chunk it
//! returned, ranks starting at 1. A chunk found by both retrievers appears
//! once with both contributions summed. Score ties are broken by lexical
//! rank, then vector rank, then chunk id, so a fixed corpus and query always
//! produce the same ordering.

use std::cmp::Ordering;
use std::collections::HashMap;

use musea_core::types::{Attrs, ChunkId, FusionConfig, RetrievalResult, SearchHit};

struct Entry {
    lexical_rank: Option<usize>,
    vector_rank: Option<usize>,
    text: String,
    attributes: Attrs,
}

pub fn fuse(
    lexical: Vec<SearchHit>,
    vector: Vec<SearchHit>,
    cfg: &FusionConfig,
) -> Vec<RetrievalResult> {
    let mut entries: HashMap<ChunkId, Entry> = HashMap::new();

    for (rank, hit) in lexical.into_iter().enumerate() {
        entries.insert(
            hit.id,
            Entry {
                lexical_rank: Some(rank + 1),
                vector_rank: None,
                text: hit.text,
                attributes: hit.attributes,
            },
        );
    }
    for (rank, hit) in vector.into_iter().enumerate() {
        match entries.get_mut(&hit.id) {
            Some(entry) => entry.vector_rank = Some(rank + 1),
            None => {
                entries.insert(
                    hit.id,
                    Entry {
                        lexical_rank: None,
                        vector_rank: Some(rank + 1),
                        text: hit.text,
                        attributes: hit.attributes,
                    },
                );
            }
        }
    }

    let mut results: Vec<RetrievalResult> = entries
        .into_iter()
        .map(|(id, entry)| {
            let lexical_rrf = entry
                .lexical_rank
                .map(|r| cfg.lexical_weight / (cfg.rrf_k + r as f32))
                .unwrap_or(0.0);
            let vector_rrf = entry
                .vector_rank
                .map(|r| cfg.vector_weight / (cfg.rrf_k + r as f32))
                .unwrap_or(0.0);
            RetrievalResult {
                id,
                lexical_rank: entry.lexical_rank,
                vector_rank: entry.vector_rank,
                fused_score: lexical_rrf + vector_rrf,
                text: entry.text,
                attributes: entry.attributes,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| rank_key(a.lexical_rank).cmp(&rank_key(b.lexical_rank)))
            .then_with(|| rank_key(a.vector_rank).cmp(&rank_key(b.vector_rank)))
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(cfg.top_n);
    results
}

fn rank_key(rank: Option<usize>) -> usize {
    rank.unwrap_or(usize::MAX)
}
