//! Pairwise document similarity for the diversification re-ranker.
//!
//! Both engines memoize per instance. Build one per query so caches never
//! outlive the candidate set they were filled for.

use crate::error::{Error, Result};
use crate::index::{Document, IdfTable, TermId};
use std::cmp::Ordering;
use std::collections::HashMap;

pub trait Similarity {
    fn similarity(&mut self, a: &Document, b: &Document) -> Result<f64>;
}

/// Walks two term-sorted slices in lockstep, calling `f` once per term of the union.
fn merge_join<A: Copy, B: Copy>(
    left: &[(TermId, A)],
    right: &[(TermId, B)],
    mut f: impl FnMut(Option<A>, Option<B>),
) {
    let (mut i, mut j) = (0, 0);
    while i < left.len() || j < right.len() {
        let order = match (left.get(i), right.get(j)) {
            (Some(l), Some(r)) => l.0.cmp(&r.0),
            (Some(_), None) => Ordering::Less,
            _ => Ordering::Greater,
        };
        match order {
            Ordering::Less => {
                f(Some(left[i].1), None);
                i += 1;
            }
            Ordering::Greater => {
                f(None, Some(right[j].1));
                j += 1;
            }
            Ordering::Equal => {
                f(Some(left[i].1), Some(right[j].1));
                i += 1;
                j += 1;
            }
        }
    }
}

/// Cosine over the tf-idf weighted shared terms of two documents.
pub struct CosineSimilarity<'a> {
    idf: &'a IdfTable,
    weighted: HashMap<String, Vec<(TermId, f64)>>,
}

impl<'a> CosineSimilarity<'a> {
    pub fn new(idf: &'a IdfTable) -> Self {
        Self { idf, weighted: HashMap::new() }
    }

    fn ensure_weighted(&mut self, doc: &Document) {
        if self.weighted.contains_key(&doc.id) {
            return;
        }
        let v: Vec<(TermId, f64)> = doc
            .vector
            .entries()
            .iter()
            .map(|&(t, f)| (t, self.idf.get(&t).copied().unwrap_or(0.0) * f as f64))
            .collect();
        self.weighted.insert(doc.id.clone(), v);
    }

    /// Number of memoized document projections.
    pub fn cached(&self) -> usize { self.weighted.len() }
}

impl Similarity for CosineSimilarity<'_> {
    fn similarity(&mut self, a: &Document, b: &Document) -> Result<f64> {
        self.ensure_weighted(a);
        self.ensure_weighted(b);
        let (va, vb) = (&self.weighted[&a.id], &self.weighted[&b.id]);

        let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
        merge_join(va, vb, |x, y| {
            if let (Some(x), Some(y)) = (x, y) {
                dot += x * y;
                norm_a += x * x;
                norm_b += y * y;
            }
        });
        let denominator = norm_a.sqrt() * norm_b.sqrt();
        // no shared terms, or every shared term has zero weight
        if denominator == 0.0 {
            return Ok(0.0);
        }
        Ok((dot / denominator).clamp(-1.0, 1.0))
    }
}

/// Pearson correlation of raw frequencies over the union of two documents' terms.
///
/// A constant vector on the union has zero deviation; that case is reported
/// as `Error::DivisionByZero` and left to the caller.
#[derive(Default)]
pub struct PearsonCorrelation {
    pairs: HashMap<(String, String), f64>,
}

impl PearsonCorrelation {
    pub fn new() -> Self { Self::default() }

    fn key(a: &Document, b: &Document) -> (String, String) {
        if a.id <= b.id {
            (a.id.clone(), b.id.clone())
        } else {
            (b.id.clone(), a.id.clone())
        }
    }

    pub fn cached(&self) -> usize { self.pairs.len() }
}

impl Similarity for PearsonCorrelation {
    fn similarity(&mut self, a: &Document, b: &Document) -> Result<f64> {
        let key = Self::key(a, b);
        if let Some(&r) = self.pairs.get(&key) {
            return Ok(r);
        }

        let mut aligned: Vec<(f64, f64)> = Vec::with_capacity(a.vector.len() + b.vector.len());
        merge_join(a.vector.entries(), b.vector.entries(), |x, y| {
            aligned.push((x.unwrap_or(0) as f64, y.unwrap_or(0) as f64));
        });
        if aligned.is_empty() {
            return Err(Error::DivisionByZero { what: "pearson correlation" });
        }

        let n = aligned.len() as f64;
        let mean_x = aligned.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = aligned.iter().map(|p| p.1).sum::<f64>() / n;
        let (mut cov, mut var_x, mut var_y) = (0.0f64, 0.0f64, 0.0f64);
        for &(x, y) in &aligned {
            let (dx, dy) = (x - mean_x, y - mean_y);
            cov += dx * dy;
            var_x += dx * dx;
            var_y += dy * dy;
        }
        if var_x == 0.0 || var_y == 0.0 {
            return Err(Error::DivisionByZero { what: "pearson correlation" });
        }
        let std_x = (var_x / n).sqrt();
        let std_y = (var_y / n).sqrt();
        let r = ((cov / n) / (std_x * std_y)).clamp(-1.0, 1.0);
        self.pairs.insert(key, r);
        Ok(r)
    }
}
