//! BM25 Okapi scoring.
//!
//! `idf(t) = ln((N - n_t + 0.5) / (n_t + 0.5))`. Terms present in more than
//! half of the corpus would get a negative idf; those are replaced by
//! `epsilon * mean(idf)`. The floor takes the sign of the mean: in a corpus
//! dominated by common terms it is itself negative, and matching documents
//! then score below zero.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75, epsilon: 0.25 }
    }
}

#[derive(Debug, Clone)]
pub struct Bm25Okapi {
    params: Bm25Params,
    doc_freqs: Vec<HashMap<String, usize>>,
    doc_len: Vec<usize>,
    avgdl: f64,
    idf: BTreeMap<String, f64>,
}

impl Bm25Okapi {
    pub fn new(corpus: &[Vec<String>], params: Bm25Params) -> Self {
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut doc_len = Vec::with_capacity(corpus.len());
        let mut containing: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_len = 0usize;

        for doc in corpus {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for term in doc {
                *freqs.entry(term.clone()).or_default() += 1;
            }
            for term in freqs.keys() {
                *containing.entry(term.clone()).or_default() += 1;
            }
            total_len += doc.len();
            doc_len.push(doc.len());
            doc_freqs.push(freqs);
        }

        let n = corpus.len() as f64;
        let avgdl = if corpus.is_empty() { 0.0 } else { total_len as f64 / n };

        let mut idf = BTreeMap::new();
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, &df) in &containing {
            let df = df as f64;
            let value = ((n - df + 0.5) / (df + 0.5)).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term.clone(), value);
        }
        if !idf.is_empty() {
            let floor = params.epsilon * idf_sum / idf.len() as f64;
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self { params, doc_freqs, doc_len, avgdl, idf }
    }

    pub fn len(&self) -> usize {
        self.doc_len.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_len.is_empty()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// One score per document, in corpus order. Repeated query terms count
    /// once per occurrence; unknown terms contribute nothing.
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.len()];
        if self.avgdl == 0.0 {
            return scores;
        }
        let Bm25Params { k1, b, .. } = self.params;
        for term in query {
            let Some(idf) = self.idf(term) else { continue };
            for (i, freqs) in self.doc_freqs.iter().enumerate() {
                let tf = freqs.get(term).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let norm = k1 * (1.0 - b + b * self.doc_len[i] as f64 / self.avgdl);
                scores[i] += idf * tf * (k1 + 1.0) / (tf + norm);
            }
        }
        scores
    }
}
