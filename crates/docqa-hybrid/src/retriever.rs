use anyhow::Result;
use tracing::{debug, info};

use docqa_core::config::RetrievalConfig;
use docqa_core::{Chunk, Error};
use docqa_text::SparseIndex;
use docqa_vector::{DenseIndex, PayloadFilter};

use crate::fusion::{reciprocal_rank_fusion, FusedHit, FusionConfig};

/// Owns both indexes and fuses their rankings per query. Holds no state of
/// its own beyond configuration.
pub struct HybridRetriever<D> {
    sparse: SparseIndex,
    dense: D,
    config: RetrievalConfig,
}

impl<D: DenseIndex> HybridRetriever<D> {
    pub fn new(sparse: SparseIndex, dense: D, config: RetrievalConfig) -> Self {
        Self { sparse, dense, config }
    }

    pub fn sparse(&self) -> &SparseIndex {
        &self.sparse
    }

    pub fn dense(&self) -> &D {
        &self.dense
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Populate both indexes from the same chunk sequence. A document already
    /// present in the sparse index is rejected before either index is touched,
    /// since sparse entries are never replaced.
    pub fn index(&mut self, chunks: &[Chunk]) -> Result<usize> {
        if let Some(dup) = chunks.iter().find(|c| self.sparse.contains_doc(&c.doc_id)) {
            return Err(Error::Operation(format!("document '{}' is already indexed", dup.doc_id)).into());
        }
        let written = self.dense.add_chunks(chunks)?;
        self.sparse.add_documents(chunks);
        debug!(chunks = chunks.len(), dense_written = written, "indexed chunks");
        Ok(written)
    }

    /// Each index is asked for `candidate_k` results under the same document
    /// filter; the fused list is cut to `k`.
    pub fn search(&self, query: &str, k: usize, doc_filter: Option<&str>) -> Result<Vec<FusedHit>> {
        let candidates = self.config.candidate_k;
        let dense_filter = doc_filter.map(|id| PayloadFilter::DocId(id.to_string()));
        let dense = self.dense.search(query, candidates, dense_filter.as_ref())?;
        let sparse = self.sparse.search(query, candidates, doc_filter);
        let (n_dense, n_sparse) = (dense.len(), sparse.len());

        let fused = reciprocal_rank_fusion(dense, sparse, k, &FusionConfig::from(&self.config));
        debug!(query, dense = n_dense, sparse = n_sparse, fused = fused.len(), "hybrid search");
        Ok(fused)
    }

    /// Removes the document from the dense index. The sparse index is
    /// append-only and keeps its entries.
    pub fn delete_document(&mut self, doc_id: &str) -> Result<usize> {
        let removed = self.dense.delete(doc_id)?;
        info!(doc_id, removed, "deleted document");
        Ok(removed)
    }
}
