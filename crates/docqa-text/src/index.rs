use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use docqa_core::{Chunk, Result};

use crate::bm25::{Bm25Okapi, Bm25Params};
use crate::tokenize::tokenize;

/// A chunk payload annotated with its lexical score and 1-based rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseHit {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub bm25_score: f64,
    pub bm25_rank: usize,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    documents: Vec<Chunk>,
    tokenized: Vec<Vec<String>>,
}

/// Append-only BM25 index over chunk payloads.
///
/// Every `add_documents` call rebuilds the ranking model over the whole
/// accumulated corpus. Not safe to mutate concurrently with `search`; callers
/// synchronise externally.
pub struct SparseIndex {
    params: Bm25Params,
    documents: Vec<Chunk>,
    tokenized: Vec<Vec<String>>,
    model: Option<Bm25Okapi>,
}

impl SparseIndex {
    pub fn new() -> Self {
        Self::with_params(Bm25Params::default())
    }

    pub fn with_params(params: Bm25Params) -> Self {
        Self { params, documents: Vec::new(), tokenized: Vec::new(), model: None }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Chunk] {
        &self.documents
    }

    pub fn contains_doc(&self, doc_id: &str) -> bool {
        self.documents.iter().any(|c| c.doc_id == doc_id)
    }

    pub fn add_documents(&mut self, chunks: &[Chunk]) {
        for chunk in chunks {
            self.tokenized.push(tokenize(&chunk.text));
            self.documents.push(chunk.clone());
        }
        self.rebuild();
        debug!(added = chunks.len(), total = self.documents.len(), "sparse index rebuilt");
    }

    fn rebuild(&mut self) {
        self.model = Some(Bm25Okapi::new(&self.tokenized, self.params));
    }

    /// Rank every document for `query`, drop non-positive scores, keep the
    /// stable descending order, restrict to `doc_filter`, then take `k`.
    pub fn search(&self, query: &str, k: usize, doc_filter: Option<&str>) -> Vec<SparseHit> {
        let Some(model) = self.model.as_ref() else { return Vec::new() };
        let scores = model.scores(&tokenize(query));

        let mut scored: Vec<(usize, f64)> = scores.into_iter().enumerate().filter(|&(_, s)| s > 0.0).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let hits: Vec<SparseHit> = scored
            .into_iter()
            .filter(|&(i, _)| doc_filter.map_or(true, |id| self.documents[i].doc_id == id))
            .take(k)
            .enumerate()
            .map(|(pos, (i, score))| SparseHit { chunk: self.documents[i].clone(), bm25_score: score, bm25_rank: pos + 1 })
            .collect();
        debug!(query, k, filter = doc_filter.unwrap_or(""), hits = hits.len(), "sparse search");
        hits
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let snapshot = Snapshot { documents: self.documents.clone(), tokenized: self.tokenized.clone() };
        fs::write(path, serde_json::to_vec(&snapshot)?)?;
        info!(path = %path.display(), documents = self.documents.len(), "saved sparse index");
        Ok(())
    }

    /// A missing file yields an empty index.
    pub fn load(path: &Path) -> Result<Self> {
        let mut index = Self::new();
        if !path.exists() {
            debug!(path = %path.display(), "no sparse index on disk; starting empty");
            return Ok(index);
        }
        let snapshot: Snapshot = serde_json::from_slice(&fs::read(path)?)?;
        if snapshot.documents.len() != snapshot.tokenized.len() {
            return Err(docqa_core::Error::Operation(format!(
                "corrupt sparse index {}: {} documents but {} token lists",
                path.display(),
                snapshot.documents.len(),
                snapshot.tokenized.len()
            )));
        }
        index.documents = snapshot.documents;
        index.tokenized = snapshot.tokenized;
        if !index.documents.is_empty() {
            index.rebuild();
        }
        info!(path = %path.display(), documents = index.documents.len(), "loaded sparse index");
        Ok(index)
    }
}

impl Default for SparseIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::BlockType;

    fn chunk(doc_id: &str, idx: usize, text: &str) -> Chunk {
        Chunk {
            text: text.into(),
            doc_id: doc_id.into(),
            chunk_index: idx,
            page_number: 1,
            section_title: String::new(),
            parent_section: String::new(),
            chunk_type: BlockType::Paragraph,
            token_count: text.split_whitespace().count(),
        }
    }

    #[test]
    fn empty_index_returns_nothing() {
        assert!(SparseIndex::new().search("anything", 5, None).is_empty());
    }

    #[test]
    fn ranks_are_one_based_after_filtering() {
        let mut idx = SparseIndex::new();
        idx.add_documents(&[
            chunk("a", 0, "pump pump pump maintenance"),
            chunk("b", 0, "pump maintenance schedule"),
            chunk("b", 1, "valve inspection"),
            chunk("c", 0, "gasket replacement"),
            chunk("d", 0, "coolant flush"),
        ]);
        let hits = idx.search("pump", 10, Some("b"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.doc_id, "b");
        assert_eq!(hits[0].bm25_rank, 1);
    }

    #[test]
    fn filter_applies_before_top_k() {
        let mut idx = SparseIndex::new();
        idx.add_documents(&[
            chunk("a", 0, "pump pump pump"),
            chunk("a", 1, "pump pump"),
            chunk("b", 0, "pump notes"),
            chunk("c", 0, "unrelated words"),
            chunk("d", 0, "more unrelated"),
        ]);
        let hits = idx.search("pump", 1, Some("b"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "pump notes");
    }

    #[test]
    fn terms_with_negative_floor_are_dropped() {
        let mut idx = SparseIndex::new();
        idx.add_documents(&[
            chunk("a", 0, "common alpha"),
            chunk("b", 0, "common beta"),
            chunk("c", 0, "common gamma"),
        ]);
        assert!(idx.search("common", 10, None).is_empty());
        assert_eq!(idx.search("beta", 10, None).len(), 1);
    }

    #[test]
    fn contains_doc_tracks_indexed_ids() {
        let mut idx = SparseIndex::new();
        assert!(!idx.contains_doc("a"));
        idx.add_documents(&[chunk("a", 0, "pump notes")]);
        assert!(idx.contains_doc("a"));
        assert!(!idx.contains_doc("b"));
    }

    #[test]
    fn hit_serializes_flat() {
        let hit = SparseHit { chunk: chunk("a", 3, "text"), bm25_score: 1.5, bm25_rank: 2 };
        let v = serde_json::to_value(&hit).unwrap();
        assert_eq!(v["doc_id"], "a");
        assert_eq!(v["chunk_index"], 3);
        assert_eq!(v["bm25_rank"], 2);
    }
}
