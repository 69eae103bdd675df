//! docqa-core
//!
//! Domain types, the structure-aware chunker, document parsers and the
//! configuration layer shared by the sparse, dense and hybrid crates.

pub mod chunker;
pub mod config;
pub mod error;
pub mod metric;
pub mod parser;
pub mod preprocess;
pub mod retry;
pub mod sentence;
pub mod traits;
pub mod types;

pub use chunker::StructureAwareChunker;
pub use error::{Error, Result};
pub use retry::RetryPolicy;
pub use traits::{Embedder, LengthMetric};
pub use types::{BlockType, Chunk, DocumentBlock, ParsedDocument};
