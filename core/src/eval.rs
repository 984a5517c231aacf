//! NDCG and intent-aware alpha-NDCG.
//!
//! Both metrics use the same discount: position 0 is undiscounted and
//! position `i >= 1` is divided by `log2(i + 1)`. The ideal ordering is
//! taken from the same top-k documents that were retrieved.

use crate::index::RankedList;
use std::collections::HashMap;
use std::fmt;

/// Judgments of one query.
#[derive(Debug, Clone, Default)]
pub struct QueryJudgments {
    grades: HashMap<String, i32>,
    intents: HashMap<String, Vec<String>>,
}

impl QueryJudgments {
    /// Records a judgment line. The first grade seen for a document is kept;
    /// every intent judged with a positive grade is collected.
    pub fn insert(&mut self, intent: &str, doc_id: &str, grade: i32) {
        self.grades.entry(doc_id.to_string()).or_insert(grade);
        if grade > 0 {
            let intents = self.intents.entry(doc_id.to_string()).or_default();
            if !intents.iter().any(|i| i == intent) {
                intents.push(intent.to_string());
            }
        }
    }

    /// Graded relevance with negative grades clamped to 0. Unjudged documents are 0.
    pub fn relevance(&self, doc_id: &str) -> u32 {
        self.grades.get(doc_id).map(|&g| g.max(0) as u32).unwrap_or(0)
    }

    pub fn intents(&self, doc_id: &str) -> &[String] {
        self.intents.get(doc_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize { self.grades.len() }

    pub fn is_empty(&self) -> bool { self.grades.is_empty() }
}

#[derive(Debug, Clone, Default)]
pub struct Judgments {
    queries: HashMap<String, QueryJudgments>,
}

impl Judgments {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, query_id: &str, intent: &str, doc_id: &str, grade: i32) {
        self.queries.entry(query_id.to_string()).or_default().insert(intent, doc_id, grade);
    }

    pub fn get(&self, query_id: &str) -> Option<&QueryJudgments> { self.queries.get(query_id) }

    pub fn num_queries(&self) -> usize { self.queries.len() }
}

fn dcg(gains: &[f64]) -> f64 {
    match gains.split_first() {
        None => 0.0,
        Some((first, rest)) => {
            first + rest.iter().enumerate().map(|(j, g)| g / ((j + 2) as f64).log2()).sum::<f64>()
        }
    }
}

fn normalized(actual: &[f64], ideal: &[f64]) -> f64 {
    let idcg = dcg(ideal);
    // nothing relevant in the top k
    if idcg == 0.0 {
        return 0.0;
    }
    dcg(actual) / idcg
}

/// NDCG@k of `ranked`. Positions past the end of the list count as non-relevant.
pub fn ndcg(ranked: &RankedList, judgments: &QueryJudgments, k: usize) -> f64 {
    let relevance: Vec<f64> = ranked.doc_ids().take(k).map(|d| judgments.relevance(d) as f64).collect();
    let mut ideal = relevance.clone();
    ideal.sort_by(|a, b| b.total_cmp(a));
    normalized(&relevance, &ideal)
}

fn novelty_gain(intents: &[String], seen: &HashMap<&str, i32>, alpha: f64) -> f64 {
    intents
        .iter()
        .map(|i| (1.0 - alpha).powi(seen.get(i.as_str()).copied().unwrap_or(0)))
        .sum()
}

fn mark_seen<'j>(intents: &'j [String], seen: &mut HashMap<&'j str, i32>) {
    for i in intents {
        *seen.entry(i.as_str()).or_insert(0) += 1;
    }
}

/// alpha-NDCG@k. Each intent a document covers earns `(1 - alpha)^n`, where `n`
/// counts the higher-ranked documents covering that intent.
///
/// The ideal is the same per-position gains sorted descending, as for NDCG.
pub fn alpha_ndcg(ranked: &RankedList, judgments: &QueryJudgments, k: usize, alpha: f64) -> f64 {
    let mut seen: HashMap<&str, i32> = HashMap::new();
    let mut gains = Vec::with_capacity(k.min(ranked.len()));
    for doc_id in ranked.doc_ids().take(k) {
        let intents = judgments.intents(doc_id);
        gains.push(novelty_gain(intents, &seen, alpha));
        mark_seen(intents, &mut seen);
    }
    let mut ideal = gains.clone();
    ideal.sort_by(|a, b| b.total_cmp(a));
    normalized(&gains, &ideal)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Ndcg,
    AlphaNdcg { alpha: f64 },
}

impl Metric {
    pub fn compute(&self, ranked: &RankedList, judgments: Option<&QueryJudgments>, k: usize) -> f64 {
        let Some(judgments) = judgments else { return 0.0 };
        match *self {
            Metric::Ndcg => ndcg(ranked, judgments, k),
            Metric::AlphaNdcg { alpha } => alpha_ndcg(ranked, judgments, k, alpha),
        }
    }
}

/// Averages of one metric over every query of a run, one row per cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReport {
    pub label: String,
    pub metric: Metric,
    pub rows: Vec<(usize, f64)>,
}

impl MetricReport {
    /// Queries without judgments contribute 0 to the average.
    pub fn evaluate(label: impl Into<String>, run: &[RankedList], judgments: &Judgments, cutoffs: &[usize], metric: Metric) -> Self {
        let rows = cutoffs
            .iter()
            .map(|&k| {
                let total: f64 = run.iter().map(|list| metric.compute(list, judgments.get(&list.query_id), k)).sum();
                let mean = if run.is_empty() { 0.0 } else { total / run.len() as f64 };
                (k, mean)
            })
            .collect();
        Self { label: label.into(), metric, rows }
    }

    pub fn value_at(&self, k: usize) -> Option<f64> {
        self.rows.iter().find(|(c, _)| *c == k).map(|(_, v)| *v)
    }
}

impl fmt::Display for MetricReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label)?;
        match self.metric {
            Metric::Ndcg => {
                writeln!(f, "K\t|\tNDCG@K")?;
                for (k, v) in &self.rows {
                    writeln!(f, "{k}\t|\t{v:.3}")?;
                }
            }
            Metric::AlphaNdcg { alpha } => {
                writeln!(f, "alpha\t|\tK\t|\talpha-NDCG@K")?;
                for (k, v) in &self.rows {
                    writeln!(f, "{alpha:.1}\t|\t{k}\t|\t{v:.3}")?;
                }
            }
        }
        Ok(())
    }
}
