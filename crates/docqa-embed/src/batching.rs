use anyhow::Result;
use tracing::debug;

use docqa_core::{Embedder, Error, RetryPolicy};

/// Splits inputs into fixed-size batches and sends them one at a time.
///
/// A batch is retried as a unit, never partially, so the i-th vector of a
/// response always belongs to the i-th text of the request. Responses with
/// the wrong count or dimension fail without retry.
pub struct BatchingEmbedder<E> {
    inner: E,
    batch_size: usize,
    retry: RetryPolicy,
}

impl<E: Embedder> BatchingEmbedder<E> {
    pub fn new(inner: E, batch_size: usize, retry: RetryPolicy) -> Self {
        Self { inner, batch_size: batch_size.max(1), retry }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    fn embed_one_batch(&self, batch_no: usize, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let what = format!("embed batch {batch_no}");
        let vectors = self.retry.run(&what, |_| self.inner.embed_batch(batch))?;
        if vectors.len() != batch.len() {
            return Err(Error::BatchSizeMismatch { expected: batch.len(), actual: vectors.len() }.into());
        }
        let dim = self.inner.dim();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, actual: bad.len() }.into());
        }
        debug!(batch = batch_no, size = batch.len(), "embedded batch");
        Ok(vectors)
    }
}

impl<E: Embedder> Embedder for BatchingEmbedder<E> {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for (batch_no, batch) in texts.chunks(self.batch_size).enumerate() {
            out.extend(self.embed_one_batch(batch_no, batch)?);
        }
        Ok(out)
    }
}
