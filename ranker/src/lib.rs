use anyhow::{bail, Context, Result};
use divrank_core::bm25::{Bm25Params, Bm25Scorer};
use divrank_core::eval::{Judgments, Metric, MetricReport};
use divrank_core::parse::load_documents;
use divrank_core::persist::{load_snapshot, SnapshotPaths};
use divrank_core::rerank::{CancelToken, GreedyReranker, Mmr, MmrParams, Portfolio, PortfolioParams};
use divrank_core::trec::load_run;
use divrank_core::{Corpus, Query, RankedList};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Load a corpus from a snapshot directory or directly from a vector file.
pub fn load_corpus(path: &Path) -> Result<Corpus> {
    let snapshot = SnapshotPaths::new(path);
    if snapshot.exists() {
        let (corpus, meta) = load_snapshot(&snapshot).with_context(|| format!("loading snapshot {}", path.display()))?;
        tracing::info!(created_at = %meta.created_at, num_docs = meta.num_docs, "using snapshot");
        return Ok(corpus);
    }
    if path.is_dir() {
        bail!("{} is a directory without a snapshot", path.display());
    }
    load_documents(path).with_context(|| format!("loading documents from {}", path.display()))
}

/// Rank the whole corpus for every query. Lists come back in query order.
pub fn bm25_run(corpus: &Corpus, queries: &[Query], params: Bm25Params) -> Vec<RankedList> {
    let scorer = Bm25Scorer::new(corpus, params);
    let lists: Vec<RankedList> = queries.par_iter().map(|q| scorer.score(q)).collect();
    tracing::info!(num_queries = lists.len(), k1 = params.k1, b = params.b, "bm25 run complete");
    lists
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Diversifier {
    Mmr(MmrParams),
    Portfolio(PortfolioParams),
}

impl Diversifier {
    pub fn tag(&self) -> &'static str {
        match self {
            Diversifier::Mmr(_) => "mmr",
            Diversifier::Portfolio(_) => "portfolio",
        }
    }
}

/// Re-rank the first `depth` candidates of every list. Each query gets its own
/// objective so similarity caches never cross queries.
pub fn rerank_run(
    corpus: &Corpus,
    run: &[RankedList],
    diversifier: Diversifier,
    depth: usize,
    cancel: &CancelToken,
) -> Result<Vec<RankedList>> {
    let idf = corpus.stats().idf_table();
    let lists = run
        .par_iter()
        .map(|list| {
            let mut candidates = list.clone();
            candidates.truncate(depth);
            let reranked = match diversifier {
                Diversifier::Mmr(params) => GreedyReranker::new(corpus, Mmr::new(params, &idf))
                    .with_cancel(cancel.clone())
                    .rerank(&candidates),
                Diversifier::Portfolio(params) => GreedyReranker::new(corpus, Portfolio::new(params))
                    .with_cancel(cancel.clone())
                    .rerank(&candidates),
            };
            reranked.with_context(|| format!("re-ranking query {}", list.query_id))
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(num_queries = lists.len(), method = diversifier.tag(), depth, "re-rank run complete");
    Ok(lists)
}

/// Every regular file under `path`, or `path` itself when it is a file.
pub fn run_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("run path {} does not exist", path.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// One report per run file and metric, labelled with the file name.
pub fn evaluate_run(path: &Path, judgments: &Judgments, cutoffs: &[usize], metrics: &[Metric]) -> Result<Vec<MetricReport>> {
    let files = run_files(path)?;
    let per_file = files
        .par_iter()
        .map(|file| -> Result<Vec<MetricReport>> {
            let run = load_run(file).with_context(|| format!("reading run {}", file.display()))?;
            let label = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            Ok(metrics
                .iter()
                .map(|&m| MetricReport::evaluate(label.clone(), &run, judgments, cutoffs, m))
                .collect::<Vec<_>>())
        })
        .collect::<Result<Vec<_>>>()?;
    let reports: Vec<MetricReport> = per_file.into_iter().flatten().collect();
    tracing::info!(num_runs = files.len(), num_reports = reports.len(), "evaluation complete");
    Ok(reports)
}
