use anyhow::Result;
use serde::Serialize;
use tracing::info;

use docqa_vector::DenseIndex;

use crate::fusion::FusedHit;
use crate::retriever::HybridRetriever;
use crate::synthesis::{build_prompt, CompletionModel};

pub const NO_RESULTS_ANSWER: &str = "No relevant information found.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<FusedHit>,
    pub query: String,
}

/// Retrieve, then answer from the retrieved context only.
pub struct RagPipeline<D, M> {
    retriever: HybridRetriever<D>,
    model: M,
}

impl<D: DenseIndex, M: CompletionModel> RagPipeline<D, M> {
    pub fn new(retriever: HybridRetriever<D>, model: M) -> Self {
        Self { retriever, model }
    }

    pub fn retriever(&self) -> &HybridRetriever<D> {
        &self.retriever
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn retriever_mut(&mut self) -> &mut HybridRetriever<D> {
        &mut self.retriever
    }

    /// An empty retrieval short-circuits without calling the model.
    pub fn query(&self, question: &str, doc_filter: Option<&str>, top_k: usize) -> Result<RagResponse> {
        let sources = self.retriever.search(question, top_k, doc_filter)?;
        if sources.is_empty() {
            info!(query = question, "no sources retrieved");
            return Ok(RagResponse { answer: NO_RESULTS_ANSWER.to_string(), sources, query: question.to_string() });
        }
        let prompt = build_prompt(question, &sources);
        let answer = self.model.complete(&prompt)?;
        info!(query = question, sources = sources.len(), answer_chars = answer.len(), "answered");
        Ok(RagResponse { answer, sources, query: question.to_string() })
    }
}
