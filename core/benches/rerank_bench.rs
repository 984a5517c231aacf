use criterion::{criterion_group, criterion_main, Criterion};
use divrank_core::bm25::{Bm25Params, Bm25Scorer};
use divrank_core::rerank::{GreedyReranker, Mmr, MmrParams, Portfolio, PortfolioParams};
use divrank_core::{Corpus, Document, Query, SparseVector};

// 100 documents over a 300-term vocabulary, spread deterministically
fn synthetic_corpus() -> Corpus {
    Corpus::from_documents((0..100u32).map(|d| {
        let pairs = (0..20u32).map(|j| ((d * 7 + j * j * 13) % 300, 1 + (d + j) % 4));
        Document::new(format!("doc-{d}"), SparseVector::from_pairs(pairs))
    }))
}

fn bench_rerank(c: &mut Criterion) {
    let corpus = synthetic_corpus();
    let query = Query::new("q", SparseVector::from_pairs((0..10u32).map(|t| (t * 29 % 300, 1))));
    let candidates = Bm25Scorer::new(&corpus, Bm25Params::default()).score(&query);
    let idf = corpus.stats().idf_table();

    c.bench_function("bm25_100_docs", |b| {
        let scorer = Bm25Scorer::new(&corpus, Bm25Params::default());
        b.iter(|| scorer.score(&query))
    });
    c.bench_function("mmr_100_candidates", |b| {
        b.iter(|| GreedyReranker::new(&corpus, Mmr::new(MmrParams::default(), &idf)).rerank(&candidates))
    });
    c.bench_function("portfolio_100_candidates", |b| {
        b.iter(|| GreedyReranker::new(&corpus, Portfolio::new(PortfolioParams::default())).rerank(&candidates))
    });
}

criterion_group!(benches, bench_rerank);
criterion_main!(benches);
