//! docqa-embed
//!
//! The embedding service boundary: a deterministic hash embedder for tests and
//! offline runs, an OpenAI-compatible HTTP client, and a batching wrapper that
//! retries whole batches and checks positional pairing.

pub mod batching;
pub mod fake;
pub mod metric;
pub mod openai;

use anyhow::Result;
use tracing::info;

use docqa_core::config::EmbeddingConfig;
use docqa_core::Embedder;

pub use batching::BatchingEmbedder;
pub use fake::FakeEmbedder;
pub use metric::TokenizerMetric;
pub use openai::OpenAiEmbedder;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// `FakeEmbedder` when `APP_USE_FAKE_EMBEDDINGS=1`, the HTTP embedder
/// otherwise; either way wrapped in batching and retry.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let inner: Box<dyn Embedder> = if use_fake_embeddings() {
        info!(dim = config.dimension, "using fake embedder");
        Box::new(FakeEmbedder::new(config.dimension))
    } else {
        info!(model = %config.model, api_base = %config.api_base, "using http embedder");
        Box::new(OpenAiEmbedder::from_config(config)?)
    };
    Ok(Box::new(BatchingEmbedder::new(inner, config.batch_size, config.retry_policy())))
}
