pub mod bm25;
pub mod config;
pub mod error;
pub mod eval;
pub mod index;
pub mod parse;
pub mod persist;
pub mod rerank;
pub mod similarity;
pub mod trec;

pub use error::{Error, Result};
pub use index::{Corpus, CorpusStats, DocIndex, Document, IdfTable, Posting, Query, RankedList, ScoredResult, SparseVector, TermId};
