//! Built-in length metrics. A subword tokenizer metric lives in `docqa-embed`.

use crate::traits::LengthMetric;

/// One unit per whitespace-separated word. Additive under single-space joins,
/// so merged chunk counts stay exact; the default metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceMetric;

impl LengthMetric for WhitespaceMetric {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
