//! Greedy diversification re-ranking.
//!
//! One selection loop serves both MMR and Portfolio re-ranking. The top
//! candidate by raw score is emitted first; after that every remaining
//! candidate is scored by an [`Objective`] that combines its normalized
//! relevance with its interaction against the documents already emitted,
//! and the best one is emitted next. Interaction aggregates are updated
//! incrementally against the most recent pick only, so a pass over `n`
//! candidates costs O(n²) interaction evaluations.

use crate::error::{Error, Result};
use crate::index::{Corpus, Document, IdfTable, RankedList, SparseVector};
use crate::similarity::{CosineSimilarity, PearsonCorrelation, Similarity};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MmrParams {
    /// Weight of relevance against redundancy, in [0, 1].
    pub lambda: f64,
}

impl Default for MmrParams {
    fn default() -> Self { Self { lambda: 0.5 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioParams {
    /// Risk weight. Scales both the per-rank decay and the correlation penalty.
    pub b: f64,
}

impl Default for PortfolioParams {
    fn default() -> Self { Self { b: 4.0 } }
}

/// Shared flag checked once per greedy iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed) }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

/// How interactions with several selected documents collapse into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Max,
    Sum,
}

impl Aggregation {
    pub fn fold(self, acc: Option<f64>, value: f64) -> f64 {
        match (self, acc) {
            (_, None) => value,
            (Aggregation::Max, Some(acc)) => acc.max(value),
            (Aggregation::Sum, Some(acc)) => acc + value,
        }
    }
}

pub trait Objective {
    fn aggregation(&self) -> Aggregation;

    /// Interaction between a candidate and one already selected document.
    fn interaction(&mut self, candidate: &Document, selected: &Document) -> f64;

    /// `relevance` is already divided by the top score of the candidate set.
    /// `rank_position` is the 0-based index of the greedy iteration, i.e. output rank - 1.
    fn combine(&self, relevance: f64, interaction: f64, rank_position: usize) -> f64;
}

/// `lambda * rel - (1 - lambda) * max cosine(c, s)`
pub struct Mmr<'a> {
    lambda: f64,
    cosine: CosineSimilarity<'a>,
}

impl<'a> Mmr<'a> {
    pub fn new(params: MmrParams, idf: &'a IdfTable) -> Self {
        Self { lambda: params.lambda, cosine: CosineSimilarity::new(idf) }
    }
}

impl Objective for Mmr<'_> {
    fn aggregation(&self) -> Aggregation { Aggregation::Max }

    fn interaction(&mut self, candidate: &Document, selected: &Document) -> f64 {
        // cosine reports an empty intersection as 0 itself
        self.cosine.similarity(candidate, selected).unwrap_or(0.0)
    }

    fn combine(&self, relevance: f64, interaction: f64, _rank_position: usize) -> f64 {
        self.lambda * relevance - (1.0 - self.lambda) * interaction
    }
}

/// `rel - b * rank_position - 2b * sum pearson(c, s)`
///
/// `b` doubles as rank decay and correlation weight, as in the mean-variance
/// formulation this reproduces.
pub struct Portfolio {
    b: f64,
    correlation: PearsonCorrelation,
}

impl Portfolio {
    pub fn new(params: PortfolioParams) -> Self {
        Self { b: params.b, correlation: PearsonCorrelation::new() }
    }
}

impl Objective for Portfolio {
    fn aggregation(&self) -> Aggregation { Aggregation::Sum }

    fn interaction(&mut self, candidate: &Document, selected: &Document) -> f64 {
        // only zero variance on the union fails: no measurable correlation
        self.correlation.similarity(candidate, selected).unwrap_or_else(|_| {
            tracing::debug!(candidate = %candidate.id, selected = %selected.id, "constant frequency vector, correlation treated as 0");
            0.0
        })
    }

    fn combine(&self, relevance: f64, interaction: f64, rank_position: usize) -> f64 {
        relevance - self.b * rank_position as f64 - 2.0 * self.b * interaction
    }
}

struct Candidate<'c> {
    doc: Cow<'c, Document>,
    score: f64,
    acc: Option<f64>,
}

pub struct GreedyReranker<'c, O> {
    corpus: &'c Corpus,
    objective: O,
    cancel: Option<CancelToken>,
}

impl<'c, O: Objective> GreedyReranker<'c, O> {
    pub fn new(corpus: &'c Corpus, objective: O) -> Self {
        Self { corpus, objective, cancel: None }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn resolve(&self, doc_id: &str) -> Cow<'c, Document> {
        match self.corpus.find(doc_id) {
            Some(doc) => Cow::Borrowed(doc),
            None => {
                tracing::warn!(doc_id, "candidate not in corpus, using an empty vector");
                Cow::Owned(Document::new(doc_id, SparseVector::default()))
            }
        }
    }

    /// Re-rank `candidates` (in their input rank order). Ties at every step go
    /// to the candidate that comes first in that order.
    ///
    /// Relevance is the raw score divided by the magnitude of the top score,
    /// so the best candidate sits at 1 or -1. A top score of exactly 0 leaves
    /// scores unscaled.
    pub fn rerank(&mut self, candidates: &RankedList) -> Result<RankedList> {
        let mut out = RankedList::new(candidates.query_id.clone());
        let total = candidates.len();
        if total == 0 {
            return Ok(out);
        }

        let mut remaining: Vec<Candidate<'c>> = candidates
            .results
            .iter()
            .map(|r| Candidate { doc: self.resolve(&r.doc_id), score: r.score, acc: None })
            .collect();

        let mut top = 0;
        for (i, c) in remaining.iter().enumerate() {
            if c.score > remaining[top].score {
                top = i;
            }
        }
        let max_score = remaining[top].score;
        let normalizer = if max_score != 0.0 { max_score.abs() } else { 1.0 };

        let first = remaining.remove(top);
        out.push(first.doc.id.clone(), first.score);
        let mut last = first.doc;

        let aggregation = self.objective.aggregation();
        let mut iteration = 0usize;
        while !remaining.is_empty() {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return Err(Error::Cancelled { query_id: candidates.query_id.clone() });
            }

            let mut best: Option<(usize, f64)> = None;
            for (i, c) in remaining.iter_mut().enumerate() {
                let value = self.objective.interaction(&c.doc, &last);
                let acc = aggregation.fold(c.acc, value);
                c.acc = Some(acc);
                let objective = self.objective.combine(c.score / normalizer, acc, iteration);
                if best.map_or(true, |(_, b)| objective > b) {
                    best = Some((i, objective));
                }
            }
            let Some((i, objective)) = best else { break };

            let chosen = remaining.remove(i);
            out.push(chosen.doc.id.clone(), objective);
            last = chosen.doc;
            iteration += 1;
            debug_assert_eq!(out.len() + remaining.len(), total);
        }

        tracing::debug!(query_id = %candidates.query_id, num_docs = out.len(), "re-ranked query");
        Ok(out)
    }
}
