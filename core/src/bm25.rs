//! Okapi BM25 over the corpus postings.
//!
//! ```text
//! idf(t)   = log2((N - n_t + 0.5) / (n_t + 0.5))
//! tf(t, D) = f * (k1 + 1) / (f + k1 * (1 - b + b * |D| / avgdl))
//! score(D) = sum over distinct query terms of idf(t) * tf(t, D)
//! ```
//!
//! `idf` goes negative for terms contained in more than half of the corpus,
//! so scores are not guaranteed positive.

use crate::index::{Corpus, Document, Query, RankedList, TermId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,
    /// Length normalization, 0 disables it.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.5, b: 0.75 } }
}

pub struct Bm25Scorer<'a> {
    corpus: &'a Corpus,
    params: Bm25Params,
}

impl<'a> Bm25Scorer<'a> {
    pub fn new(corpus: &'a Corpus, params: Bm25Params) -> Self {
        Self { corpus, params }
    }

    pub fn params(&self) -> Bm25Params { self.params }

    fn length_ratio(&self, length: u64) -> f64 {
        let avg = self.corpus.stats().avg_doc_length;
        if avg > 0.0 { length as f64 / avg } else { 0.0 }
    }

    fn saturated_tf(&self, tf: u32, length: u64) -> f64 {
        if tf == 0 {
            return 0.0;
        }
        let Bm25Params { k1, b } = self.params;
        let f = tf as f64;
        (f * (k1 + 1.0)) / (f + k1 * (1.0 - b + b * self.length_ratio(length)))
    }

    /// Contribution of one query term to one document.
    pub fn term_score(&self, term: TermId, tf: u32, length: u64) -> f64 {
        self.corpus.stats().bm25_idf(term) * self.saturated_tf(tf, length)
    }

    /// Score a single document without going through the postings.
    pub fn score_document(&self, query: &Query, doc: &Document) -> f64 {
        query
            .vector
            .terms()
            .map(|t| self.term_score(t, doc.vector.get(t), doc.length))
            .fold(0.0, |acc, s| acc + s)
    }

    /// Rank every document of the corpus for `query`, best first.
    /// Equal scores keep corpus order.
    pub fn score(&self, query: &Query) -> RankedList {
        let docs = self.corpus.documents();
        let mut scores = vec![0.0f64; docs.len()];
        for term in query.vector.terms() {
            let idf = self.corpus.stats().bm25_idf(term);
            for p in self.corpus.postings(term) {
                let doc = &docs[p.doc as usize];
                scores[p.doc as usize] += idf * self.saturated_tf(p.tf, doc.length);
            }
        }

        let mut order: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
        order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let mut list = RankedList::new(query.id.clone());
        list.results.reserve(order.len());
        for (i, score) in order {
            list.push(docs[i].id.clone(), score);
        }
        tracing::debug!(query_id = %query.id, num_docs = list.len(), "scored query");
        list
    }
}
