//! Reciprocal Rank Fusion.
//!
//! Each list contributes `1 / (rrf_k + rank)` (1-based rank) to the entry
//! keyed by the first `dedup_prefix_chars` characters of its text. Only ranks
//! matter, so cosine and BM25 scores never need to share a scale.

use serde::Serialize;
use std::collections::HashMap;

use docqa_core::config::RetrievalConfig;
use docqa_text::SparseHit;
use docqa_vector::DenseHit;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    pub rrf_k: f64,
    pub dedup_prefix_chars: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { rrf_k: 60.0, dedup_prefix_chars: 100 }
    }
}

impl From<&RetrievalConfig> for FusionConfig {
    fn from(c: &RetrievalConfig) -> Self {
        Self { rrf_k: c.rrf_k, dedup_prefix_chars: c.dedup_prefix_chars }
    }
}

/// Whichever result was seen first for a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FusedPayload {
    Dense(DenseHit),
    Sparse(SparseHit),
}

impl FusedPayload {
    pub fn text(&self) -> &str {
        match self {
            FusedPayload::Dense(h) => &h.text,
            FusedPayload::Sparse(h) => &h.chunk.text,
        }
    }

    pub fn doc_id(&self) -> &str {
        match self {
            FusedPayload::Dense(h) => &h.doc_id,
            FusedPayload::Sparse(h) => &h.chunk.doc_id,
        }
    }

    pub fn page_number(&self) -> u32 {
        match self {
            FusedPayload::Dense(h) => h.page_number,
            FusedPayload::Sparse(h) => h.chunk.page_number,
        }
    }

    pub fn section_title(&self) -> &str {
        match self {
            FusedPayload::Dense(h) => &h.section_title,
            FusedPayload::Sparse(h) => &h.chunk.section_title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedHit {
    pub hybrid_score: f64,
    #[serde(flatten)]
    pub payload: FusedPayload,
}

/// Dedup key: a prefix counted in chars, not bytes.
pub fn dedup_key(text: &str, prefix_chars: usize) -> &str {
    match text.char_indices().nth(prefix_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// Fold the dense list, then the sparse list, into per-key scores and return
/// the `k` best. Equal scores keep first-seen order.
pub fn reciprocal_rank_fusion(dense: Vec<DenseHit>, sparse: Vec<SparseHit>, k: usize, config: &FusionConfig) -> Vec<FusedHit> {
    let mut fused: Vec<FusedHit> = Vec::with_capacity(dense.len() + sparse.len());
    let mut slots: HashMap<String, usize> = HashMap::new();

    let mut fold = |rank: usize, payload: FusedPayload| {
        let key = dedup_key(payload.text(), config.dedup_prefix_chars).to_string();
        let contribution = 1.0 / (config.rrf_k + rank as f64);
        match slots.get(&key) {
            Some(&slot) => fused[slot].hybrid_score += contribution,
            None => {
                slots.insert(key, fused.len());
                fused.push(FusedHit { hybrid_score: contribution, payload });
            }
        }
    };

    for (i, hit) in dense.into_iter().enumerate() {
        fold(i + 1, FusedPayload::Dense(hit));
    }
    for (i, hit) in sparse.into_iter().enumerate() {
        fold(i + 1, FusedPayload::Sparse(hit));
    }

    fused.sort_by(|a, b| b.hybrid_score.total_cmp(&a.hybrid_score));
    fused.truncate(k);
    fused
}
