use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use divrank_core::config::RankConfig;
use divrank_core::eval::Metric;
use divrank_core::parse::load_queries;
use divrank_core::rerank::CancelToken;
use divrank_core::trec::{load_qrels, load_run, save_run};
use ranker::{bm25_run, evaluate_run, load_corpus, rerank_run, Diversifier};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ranker")]
#[command(about = "BM25 retrieval, diversity re-ranking and NDCG evaluation", long_about = None)]
struct Cli {
    /// JSON parameter file. Falls back to the DIVRANK_CONFIG environment variable.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunOutput {
    /// Run file to write
    #[arg(long)]
    output: PathBuf,
    /// Results kept per query
    #[arg(long)]
    depth: Option<usize>,
    /// Value of the tag column
    #[arg(long)]
    tag: Option<String>,
}

#[derive(Args)]
struct Rerank {
    /// Snapshot directory or vector file
    #[arg(long)]
    corpus: PathBuf,
    /// Run to re-rank, usually written by `ranker bm25`
    #[arg(long)]
    run: PathBuf,
    #[command(flatten)]
    out: RunOutput,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every document for every query with BM25
    Bm25 {
        #[arg(long)]
        corpus: PathBuf,
        /// Query vector file
        #[arg(long)]
        queries: PathBuf,
        #[arg(long)]
        k1: Option<f64>,
        #[arg(long)]
        b: Option<f64>,
        #[command(flatten)]
        out: RunOutput,
    },
    /// Re-rank a run with Maximal Marginal Relevance
    Mmr {
        #[arg(long)]
        lambda: Option<f64>,
        #[command(flatten)]
        args: Rerank,
    },
    /// Re-rank a run with mean-variance portfolio selection
    Portfolio {
        /// Risk weight
        #[arg(long)]
        b: Option<f64>,
        #[command(flatten)]
        args: Rerank,
    },
    /// Report NDCG@k for a run file or a directory of runs
    Ndcg {
        #[arg(long)]
        run: PathBuf,
        #[arg(long)]
        qrels: PathBuf,
        /// Comma separated cutoffs
        #[arg(long, value_delimiter = ',')]
        cutoffs: Option<Vec<usize>>,
    },
    /// Report intent-aware alpha-NDCG@k
    AlphaNdcg {
        #[arg(long)]
        run: PathBuf,
        #[arg(long)]
        qrels: PathBuf,
        #[arg(long, value_delimiter = ',')]
        cutoffs: Option<Vec<usize>>,
        /// Novelty penalties, comma separated
        #[arg(long, value_delimiter = ',')]
        alpha: Option<Vec<f64>>,
    },
}

fn base_config(path: Option<PathBuf>) -> Result<RankConfig> {
    match path.or_else(|| std::env::var_os("DIVRANK_CONFIG").map(PathBuf::from)) {
        Some(p) => RankConfig::from_json_file(&p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(RankConfig::default()),
    }
}

fn apply_output(config: &mut RankConfig, out: &RunOutput) {
    if let Some(depth) = out.depth {
        config.depth = depth;
    }
}

fn write(path: &Path, lists: &[divrank_core::RankedList], tag: &str, depth: usize) -> Result<()> {
    save_run(path, lists, tag, depth).with_context(|| format!("writing run {}", path.display()))
}

fn rerank(config: &RankConfig, args: &Rerank, diversifier: Diversifier) -> Result<()> {
    let corpus = load_corpus(&args.corpus)?;
    let run = load_run(&args.run).with_context(|| format!("reading run {}", args.run.display()))?;
    let lists = rerank_run(&corpus, &run, diversifier, config.depth, &CancelToken::new())?;
    let tag = args.out.tag.as_deref().unwrap_or(diversifier.tag());
    write(&args.out.output, &lists, tag, config.depth)
}

fn report(config: &RankConfig, run: &Path, qrels: &Path, metrics: &[Metric]) -> Result<()> {
    let judgments = load_qrels(qrels).with_context(|| format!("reading judgments {}", qrels.display()))?;
    for r in evaluate_run(run, &judgments, &config.eval.cutoffs, metrics)? {
        println!("{r}");
    }
    Ok(())
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let mut config = base_config(cli.config)?;

    match cli.command {
        Commands::Bm25 { corpus, queries, k1, b, out } => {
            config.bm25.k1 = k1.unwrap_or(config.bm25.k1);
            config.bm25.b = b.unwrap_or(config.bm25.b);
            apply_output(&mut config, &out);
            config.validate()?;

            let corpus = load_corpus(&corpus)?;
            let queries = load_queries(&queries).with_context(|| format!("reading queries {}", queries.display()))?;
            let lists = bm25_run(&corpus, &queries, config.bm25);
            write(&out.output, &lists, out.tag.as_deref().unwrap_or("bm25"), config.depth)
        }
        Commands::Mmr { lambda, args } => {
            config.mmr.lambda = lambda.unwrap_or(config.mmr.lambda);
            apply_output(&mut config, &args.out);
            config.validate()?;
            rerank(&config, &args, Diversifier::Mmr(config.mmr))
        }
        Commands::Portfolio { b, args } => {
            config.portfolio.b = b.unwrap_or(config.portfolio.b);
            apply_output(&mut config, &args.out);
            config.validate()?;
            rerank(&config, &args, Diversifier::Portfolio(config.portfolio))
        }
        Commands::Ndcg { run, qrels, cutoffs } => {
            if let Some(cutoffs) = cutoffs {
                config.eval.cutoffs = cutoffs;
            }
            config.validate()?;
            report(&config, &run, &qrels, &[Metric::Ndcg])
        }
        Commands::AlphaNdcg { run, qrels, cutoffs, alpha } => {
            if let Some(cutoffs) = cutoffs {
                config.eval.cutoffs = cutoffs;
            }
            if let Some(alpha) = alpha {
                config.eval.alphas = alpha;
            }
            config.validate()?;
            let metrics: Vec<Metric> = config.eval.alphas.iter().map(|&alpha| Metric::AlphaNdcg { alpha }).collect();
            report(&config, &run, &qrels, &metrics)
        }
    }
}
