use anyhow::{anyhow, Result};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::warn;

use docqa_core::LengthMetric;

/// Subword token count from a HuggingFace `tokenizer.json`, without special
/// tokens. Falls back to whitespace words if encoding fails. Not additive
/// across joins, so merged chunk counts are an approximation under it.
pub struct TokenizerMetric {
    tokenizer: Tokenizer,
}

impl TokenizerMetric {
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
        Ok(Self { tokenizer })
    }

    pub fn from_tokenizer(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }
}

impl LengthMetric for TokenizerMetric {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(enc) => enc.len(),
            Err(e) => {
                warn!(error = %e, "tokenization failed; counting words instead");
                text.split_whitespace().count()
            }
        }
    }
}
