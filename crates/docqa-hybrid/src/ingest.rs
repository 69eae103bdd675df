use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use docqa_core::parser::ParserRegistry;
use docqa_core::{ParsedDocument, StructureAwareChunker};
use docqa_vector::DenseIndex;

use crate::retriever::HybridRetriever;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub doc_id: String,
    pub blocks: usize,
    pub chunks: usize,
    pub pages: u32,
}

#[derive(Debug)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub error: anyhow::Error,
}

/// Outcome of a multi-file ingest: every file is attempted, failures are kept
/// alongside the documents that made it in.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<IngestReport>,
    pub failures: Vec<IngestFailure>,
}

impl BatchReport {
    pub fn chunks(&self) -> usize {
        self.reports.iter().map(|r| r.chunks).sum()
    }
}

/// Parse, chunk, then write the same chunks into both indexes.
pub struct Ingestor {
    parsers: ParserRegistry,
    chunker: StructureAwareChunker,
}

impl Ingestor {
    pub fn new(parsers: ParserRegistry, chunker: StructureAwareChunker) -> Self {
        Self { parsers, chunker }
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    pub fn ingest_file<D: DenseIndex>(&self, path: &Path, doc_id: Option<&str>, retriever: &mut HybridRetriever<D>) -> Result<IngestReport> {
        let doc = self.parsers.parse(path, doc_id)?;
        self.ingest_document(&doc, retriever)
    }

    /// Ingest each file in order. `on_file` runs after every attempt.
    pub fn ingest_files<D: DenseIndex>(
        &self,
        files: &[PathBuf],
        doc_id: Option<&str>,
        retriever: &mut HybridRetriever<D>,
        mut on_file: impl FnMut(&Path),
    ) -> BatchReport {
        let mut batch = BatchReport::default();
        for path in files {
            match self.ingest_file(path, doc_id, retriever) {
                Ok(report) => batch.reports.push(report),
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "failed to ingest document");
                    batch.failures.push(IngestFailure { path: path.clone(), error });
                }
            }
            on_file(path);
        }
        batch
    }

    pub fn ingest_document<D: DenseIndex>(&self, doc: &ParsedDocument, retriever: &mut HybridRetriever<D>) -> Result<IngestReport> {
        let chunks = self.chunker.chunk_document(doc);
        retriever.index(&chunks)?;
        let report = IngestReport {
            doc_id: doc.doc_id.clone(),
            blocks: doc.blocks.len(),
            chunks: chunks.len(),
            pages: doc.total_pages,
        };
        info!(doc_id = %report.doc_id, blocks = report.blocks, chunks = report.chunks, "ingested document");
        Ok(report)
    }

    pub fn delete_document<D: DenseIndex>(&self, doc_id: &str, retriever: &mut HybridRetriever<D>) -> Result<usize> {
        retriever.delete_document(doc_id)
    }
}
