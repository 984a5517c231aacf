use divrank_core::bm25::{Bm25Params, Bm25Scorer};
use divrank_core::similarity::{CosineSimilarity, PearsonCorrelation, Similarity};
use divrank_core::{Corpus, Document, Query, SparseVector, TermId};
use proptest::prelude::*;

fn doc(id: &str, pairs: &[(TermId, u32)]) -> Document {
    Document::new(id, SparseVector::from_pairs(pairs.iter().copied()))
}

fn build(raw: &[Vec<(TermId, u32)>]) -> Corpus {
    Corpus::from_documents(raw.iter().enumerate().map(|(i, pairs)| doc(&format!("d{i}"), pairs)))
}

fn score_of(list: &divrank_core::RankedList, id: &str) -> f64 {
    list.results.iter().find(|r| r.doc_id == id).map(|r| r.score).unwrap()
}

fn raw_corpus() -> impl Strategy<Value = Vec<Vec<(TermId, u32)>>> {
    prop::collection::vec(prop::collection::vec((0u32..8, 1u32..5), 1..6), 2..10)
}

#[test]
fn two_document_scores_follow_the_formula() {
    let corpus = Corpus::from_documents(vec![doc("doc1", &[(1, 2), (2, 1)]), doc("doc2", &[(1, 1)])]);
    assert_eq!(corpus.stats().avg_doc_length, 2.0);

    let query = Query::new("q", SparseVector::from_pairs([(1, 1), (2, 1)]));
    let list = Bm25Scorer::new(&corpus, Bm25Params::default()).score(&query);

    // t1 occurs in both documents, t2 in exactly half of them
    let idf_t1 = 0.2f64.log2();
    let doc1 = idf_t1 * (2.0 * 2.5 / (2.0 + 1.5 * (0.25 + 0.75 * 1.5)));
    let doc2 = idf_t1 * (2.5 / (1.0 + 1.5 * (0.25 + 0.75 * 0.5)));
    assert!((score_of(&list, "doc1") - doc1).abs() < 1e-12);
    assert!((score_of(&list, "doc2") - doc2).abs() < 1e-12);
    assert_eq!(list.doc_ids().collect::<Vec<_>>(), vec!["doc1", "doc2"]);
}

#[test]
fn rare_term_scores_positive() {
    let corpus = Corpus::from_documents(vec![
        doc("a", &[(1, 3)]),
        doc("b", &[(2, 1)]),
        doc("c", &[(3, 1)]),
        doc("d", &[(2, 2), (3, 1)]),
    ]);
    let query = Query::new("q", SparseVector::from_pairs([(1, 1)]));
    let list = Bm25Scorer::new(&corpus, Bm25Params::default()).score(&query);
    assert_eq!(list.results[0].doc_id, "a");
    assert!(list.results[0].score > 0.0);
    assert!(list.results[1..].iter().all(|r| r.score == 0.0));
}

#[test]
fn cosine_of_a_document_with_itself_is_one() {
    let corpus = Corpus::from_documents(vec![doc("a", &[(1, 3), (2, 1)]), doc("b", &[(2, 4)]), doc("c", &[(3, 1)])]);
    let idf = corpus.stats().idf_table();
    let mut cosine = CosineSimilarity::new(&idf);
    let a = corpus.find("a").unwrap();
    assert!((cosine.similarity(a, a).unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn pearson_of_proportional_documents_is_one() {
    let a = doc("a", &[(1, 1), (2, 2), (3, 3)]);
    let b = doc("b", &[(1, 2), (2, 4), (3, 6)]);
    let mut pearson = PearsonCorrelation::new();
    assert!((pearson.similarity(&a, &b).unwrap() - 1.0).abs() < 1e-12);
}

proptest! {
    #[test]
    fn scores_do_not_depend_on_document_order(raw in raw_corpus(), terms in prop::collection::vec((0u32..8, 1u32..3), 1..4)) {
        let forward = build(&raw);
        let reversed = Corpus::from_documents(forward.documents().iter().rev().cloned());
        let query = Query::new("q", SparseVector::from_pairs(terms));

        let a = Bm25Scorer::new(&forward, Bm25Params::default()).score(&query);
        let b = Bm25Scorer::new(&reversed, Bm25Params::default()).score(&query);
        for r in &a.results {
            prop_assert!((r.score - score_of(&b, &r.doc_id)).abs() < 1e-9);
        }
    }

    #[test]
    fn postings_agree_with_direct_scoring(raw in raw_corpus(), terms in prop::collection::vec((0u32..8, 1u32..3), 1..4)) {
        let corpus = build(&raw);
        let query = Query::new("q", SparseVector::from_pairs(terms));
        let scorer = Bm25Scorer::new(&corpus, Bm25Params::default());
        let list = scorer.score(&query);
        prop_assert_eq!(list.len(), corpus.len());
        for pair in list.results.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        for d in corpus.documents() {
            prop_assert!((scorer.score_document(&query, d) - score_of(&list, &d.id)).abs() < 1e-9);
        }
    }

    #[test]
    fn higher_frequency_never_lowers_score_for_informative_terms(raw in raw_corpus(), pick in 0usize..64) {
        let corpus = build(&raw);
        let target = &corpus.documents()[0];
        let entries = target.vector.entries();
        let (term, freq) = entries[pick % entries.len()];
        prop_assume!(corpus.stats().bm25_idf(term) >= 0.0);

        let pairs: Vec<(TermId, u32)> = entries.iter().map(|&(t, f)| if t == term { (t, freq + 1) } else { (t, f) }).collect();
        let mut docs: Vec<Document> = corpus.documents().to_vec();
        docs[0] = Document::new("d0", SparseVector::from_pairs(pairs));
        let bumped = Corpus::from_documents(docs);

        let query = Query::new("q", SparseVector::from_pairs([(term, 1)]));
        let before = Bm25Scorer::new(&corpus, Bm25Params::default()).score_document(&query, corpus.find("d0").unwrap());
        let after = Bm25Scorer::new(&bumped, Bm25Params::default()).score_document(&query, bumped.find("d0").unwrap());
        prop_assert!(after >= before - 1e-12);
    }

    #[test]
    fn similarities_are_symmetric_and_bounded(raw in raw_corpus()) {
        let corpus = build(&raw);
        let idf = corpus.stats().idf_table();
        let mut cosine = CosineSimilarity::new(&idf);
        let docs = corpus.documents();
        for a in docs {
            for b in docs {
                let ab = cosine.similarity(a, b).unwrap();
                let ba = cosine.similarity(b, a).unwrap();
                prop_assert!((ab - ba).abs() < 1e-12);
                prop_assert!((-1.0..=1.0).contains(&ab));

                // fresh engines so the symmetry is computed, not cached
                let ab = PearsonCorrelation::new().similarity(a, b);
                let ba = PearsonCorrelation::new().similarity(b, a);
                match (ab, ba) {
                    (Ok(x), Ok(y)) => {
                        prop_assert!((x - y).abs() < 1e-12);
                        prop_assert!((-1.0 - 1e-12..=1.0 + 1e-12).contains(&x));
                    }
                    (Err(_), Err(_)) => {}
                    _ => prop_assert!(false, "pearson failed in one direction only"),
                }
            }
        }
    }
}
