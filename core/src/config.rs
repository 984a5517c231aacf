use crate::bm25::Bm25Params;
use crate::error::{Error, Result};
use crate::rerank::{MmrParams, PortfolioParams};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const DEFAULT_CUTOFFS: [usize; 7] = [1, 5, 10, 20, 30, 40, 50];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalParams {
    pub cutoffs: Vec<usize>,
    /// Novelty penalties reported by alpha-NDCG, each in [0, 1).
    pub alphas: Vec<f64>,
}

impl Default for EvalParams {
    fn default() -> Self {
        Self { cutoffs: DEFAULT_CUTOFFS.to_vec(), alphas: vec![0.1, 0.5, 0.9] }
    }
}

/// Every tunable of a pipeline run. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    pub bm25: Bm25Params,
    pub mmr: MmrParams,
    pub portfolio: PortfolioParams,
    pub eval: EvalParams,
    /// Results kept per query in written runs and read as re-ranking input.
    pub depth: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            bm25: Bm25Params::default(),
            mmr: MmrParams::default(),
            portfolio: PortfolioParams::default(),
            eval: EvalParams::default(),
            depth: 100,
        }
    }
}

fn invalid(name: &'static str, value: impl ToString, expected: &'static str) -> Error {
    Error::InvalidParameter { name, value: value.to_string(), expected }
}

impl RankConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path.as_ref())?;
        let config: RankConfig = serde_json::from_reader(BufReader::new(f))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bm25.k1 >= 0.0) {
            return Err(invalid("bm25.k1", self.bm25.k1, "a non-negative number"));
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(invalid("bm25.b", self.bm25.b, "a number in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.mmr.lambda) {
            return Err(invalid("mmr.lambda", self.mmr.lambda, "a number in [0, 1]"));
        }
        if !self.portfolio.b.is_finite() {
            return Err(invalid("portfolio.b", self.portfolio.b, "a finite number"));
        }
        if self.depth == 0 {
            return Err(invalid("depth", self.depth, "at least 1"));
        }
        if self.eval.cutoffs.is_empty() || self.eval.cutoffs.contains(&0) {
            return Err(invalid("eval.cutoffs", format!("{:?}", self.eval.cutoffs), "a non-empty list of positive cutoffs"));
        }
        if let Some(a) = self.eval.alphas.iter().find(|a| !(0.0..1.0).contains(*a)) {
            return Err(invalid("eval.alphas", a, "values in [0, 1)"));
        }
        Ok(())
    }
}
