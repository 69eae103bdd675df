//! docqa-vector
//!
//! The dense (semantic) index contract and an in-memory cosine implementation.

pub mod memory;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use docqa_core::{BlockType, Chunk};

pub use memory::InMemoryDenseIndex;

/// Equality match on exactly one payload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadFilter {
    DocId(String),
    SectionTitle(String),
    ChunkType(BlockType),
}

impl PayloadFilter {
    pub fn matches(&self, chunk: &Chunk) -> bool {
        match self {
            PayloadFilter::DocId(id) => chunk.doc_id == *id,
            PayloadFilter::SectionTitle(title) => chunk.section_title == *title,
            PayloadFilter::ChunkType(kind) => chunk.chunk_type == *kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseHit {
    pub text: String,
    pub score: f32,
    pub doc_id: String,
    pub page_number: u32,
    pub section_title: String,
}

impl DenseHit {
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            text: chunk.text.clone(),
            score,
            doc_id: chunk.doc_id.clone(),
            page_number: chunk.page_number,
            section_title: chunk.section_title.clone(),
        }
    }
}

/// Vector store seam. Implementations embed chunk text themselves.
pub trait DenseIndex: Send + Sync {
    /// Returns how many chunks were written.
    fn add_chunks(&mut self, chunks: &[Chunk]) -> Result<usize>;
    fn search(&self, query: &str, k: usize, filter: Option<&PayloadFilter>) -> Result<Vec<DenseHit>>;
    /// Returns how many points were removed.
    fn delete(&mut self, doc_id: &str) -> Result<usize>;
}

impl<D: DenseIndex + ?Sized> DenseIndex for Box<D> {
    fn add_chunks(&mut self, chunks: &[Chunk]) -> Result<usize> { (**self).add_chunks(chunks) }
    fn search(&self, query: &str, k: usize, filter: Option<&PayloadFilter>) -> Result<Vec<DenseHit>> { (**self).search(query, k, filter) }
    fn delete(&mut self, doc_id: &str) -> Result<usize> { (**self).delete(doc_id) }
}
