//! docqa-hybrid
//!
//! Reciprocal Rank Fusion over the sparse and dense indexes, ingestion into
//! both from one chunk sequence, and cited answer synthesis on top.

pub mod fusion;
pub mod ingest;
pub mod openai;
pub mod pipeline;
pub mod retriever;
pub mod synthesis;

pub use fusion::{reciprocal_rank_fusion, FusedHit, FusedPayload, FusionConfig};
pub use ingest::{BatchReport, IngestFailure, IngestReport, Ingestor};
pub use openai::OpenAiChatModel;
pub use pipeline::{RagPipeline, RagResponse, NO_RESULTS_ANSWER};
pub use retriever::HybridRetriever;
pub use synthesis::{build_context, build_prompt, CompletionModel, Prompt, SYSTEM_PROMPT};
