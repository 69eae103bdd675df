use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use docqa_core::{Chunk, Embedder, Error};

use crate::{DenseHit, DenseIndex, PayloadFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Point {
    id: String,
    vector: Vec<f32>,
    chunk: Chunk,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    dim: usize,
    points: Vec<Point>,
}

/// Stable point id, so re-ingesting a chunk replaces it instead of adding a copy.
pub fn point_id(chunk: &Chunk) -> String {
    blake3::hash(format!("{}:{}", chunk.doc_id, chunk.chunk_index).as_bytes()).to_hex().to_string()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

/// Brute-force cosine index held in memory, persisted as one JSON file.
pub struct InMemoryDenseIndex<E> {
    embedder: E,
    points: Vec<Point>,
    positions: HashMap<String, usize>,
}

impl<E: Embedder> InMemoryDenseIndex<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder, points: Vec::new(), positions: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    fn reindex_positions(&mut self) {
        self.positions = self.points.iter().enumerate().map(|(i, p)| (p.id.clone(), i)).collect();
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let snapshot = Snapshot { dim: self.embedder.dim(), points: self.points.clone() };
        fs::write(path, serde_json::to_vec(&snapshot)?)?;
        info!(path = %path.display(), points = self.points.len(), "saved dense index");
        Ok(())
    }

    /// A missing file yields an empty index. Stored vectors must match the
    /// embedder's dimension.
    pub fn load(path: &Path, embedder: E) -> Result<Self> {
        let mut index = Self::new(embedder);
        if !path.exists() {
            debug!(path = %path.display(), "no dense index on disk; starting empty");
            return Ok(index);
        }
        let snapshot: Snapshot = serde_json::from_slice(&fs::read(path)?)?;
        let dim = index.embedder.dim();
        if snapshot.dim != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: snapshot.dim }.into());
        }
        index.points = snapshot.points;
        index.reindex_positions();
        info!(path = %path.display(), points = index.points.len(), "loaded dense index");
        Ok(index)
    }
}

impl<E: Embedder> DenseIndex for InMemoryDenseIndex<E> {
    fn add_chunks(&mut self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        if vectors.len() != chunks.len() {
            return Err(Error::BatchSizeMismatch { expected: chunks.len(), actual: vectors.len() }.into());
        }
        for (chunk, vector) in chunks.iter().zip(vectors) {
            let point = Point { id: point_id(chunk), vector, chunk: chunk.clone() };
            match self.positions.get(&point.id) {
                Some(&pos) => self.points[pos] = point,
                None => {
                    self.positions.insert(point.id.clone(), self.points.len());
                    self.points.push(point);
                }
            }
        }
        debug!(added = chunks.len(), total = self.points.len(), "dense index upsert");
        Ok(chunks.len())
    }

    fn search(&self, query: &str, k: usize, filter: Option<&PayloadFilter>) -> Result<Vec<DenseHit>> {
        if self.points.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed_one(query)?;
        let mut scored: Vec<(usize, f32)> = self
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| filter.map_or(true, |f| f.matches(&p.chunk)))
            .map(|(i, p)| (i, cosine(&query_vector, &p.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(scored.into_iter().take(k).map(|(i, s)| DenseHit::from_chunk(&self.points[i].chunk, s)).collect())
    }

    fn delete(&mut self, doc_id: &str) -> Result<usize> {
        let before = self.points.len();
        self.points.retain(|p| p.chunk.doc_id != doc_id);
        self.reindex_positions();
        let removed = before - self.points.len();
        info!(doc_id, removed, "deleted document from dense index");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn point_id_is_stable_and_distinct() {
        let mut c = Chunk {
            text: "t".into(),
            doc_id: "d".into(),
            chunk_index: 0,
            page_number: 0,
            section_title: String::new(),
            parent_section: String::new(),
            chunk_type: docqa_core::BlockType::Paragraph,
            token_count: 1,
        };
        let a = point_id(&c);
        c.text = "changed".into();
        assert_eq!(a, point_id(&c));
        c.chunk_index = 1;
        assert_ne!(a, point_id(&c));
    }
}
