//! docqa-text
//!
//! Lexical retrieval over chunk text: a BM25 Okapi ranking model and the
//! persistent sparse index built on it.

pub mod bm25;
pub mod index;
pub mod tokenize;

pub use bm25::{Bm25Okapi, Bm25Params};
pub use index::{SparseHit, SparseIndex};
pub use tokenize::tokenize;
