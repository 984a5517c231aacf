use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;
/// Dense position of a document inside its `Corpus`.
pub type DocIndex = u32;
pub type IdfTable = HashMap<TermId, f64>;

/// Term frequencies of one document or query, sorted by term id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(TermId, u32)>,
}

impl SparseVector {
    /// Builds a vector from `(term, frequency)` pairs. A repeated term keeps its first frequency.
    pub fn from_pairs<I: IntoIterator<Item = (TermId, u32)>>(pairs: I) -> Self {
        let mut entries: Vec<(TermId, u32)> = pairs.into_iter().collect();
        entries.sort_by_key(|(t, _)| *t); // stable, so dedup keeps the first occurrence
        entries.dedup_by_key(|(t, _)| *t);
        Self { entries }
    }

    pub fn get(&self, term: TermId) -> u32 {
        match self.entries.binary_search_by_key(&term, |(t, _)| *t) {
            Ok(i) => self.entries[i].1,
            Err(_) => 0,
        }
    }

    pub fn contains(&self, term: TermId) -> bool {
        self.entries.binary_search_by_key(&term, |(t, _)| *t).is_ok()
    }

    pub fn entries(&self) -> &[(TermId, u32)] { &self.entries }

    pub fn terms(&self) -> impl Iterator<Item = TermId> + '_ {
        self.entries.iter().map(|(t, _)| *t)
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Sum of all frequencies.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, f)| *f as u64).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub vector: SparseVector,
    pub length: u64,
}

impl Document {
    pub fn new(id: impl Into<String>, vector: SparseVector) -> Self {
        let length = vector.total();
        Self { id: id.into(), vector, length }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub id: String,
    pub vector: SparseVector,
}

impl Query {
    pub fn new(id: impl Into<String>, vector: SparseVector) -> Self {
        Self { id: id.into(), vector }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: DocIndex,
    pub tf: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    pub num_docs: u32,
    pub total_length: u64,
    pub avg_doc_length: f64,
    pub document_frequency: HashMap<TermId, u32>,
}

impl CorpusStats {
    pub fn df(&self, term: TermId) -> u32 {
        self.document_frequency.get(&term).copied().unwrap_or(0)
    }

    /// ln(N / df), or 0 for a term no document contains.
    pub fn idf(&self, term: TermId) -> f64 {
        let df = self.df(term);
        if df == 0 {
            return 0.0;
        }
        (self.num_docs as f64 / df as f64).ln()
    }

    /// log2((N - n + 0.5) / (n + 0.5)); defined for unseen terms too.
    pub fn bm25_idf(&self, term: TermId) -> f64 {
        let n = self.df(term) as f64;
        let big_n = self.num_docs as f64;
        ((big_n - n + 0.5) / (n + 0.5)).log2()
    }

    pub fn idf_table(&self) -> IdfTable {
        self.document_frequency.keys().map(|&t| (t, self.idf(t))).collect()
    }
}

/// In-memory document store with corpus statistics and term postings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    docs: Vec<Document>,
    by_id: HashMap<String, DocIndex>,
    postings: HashMap<TermId, Vec<Posting>>, // sorted by doc
    stats: CorpusStats,
}

impl Corpus {
    /// Builds the store in one pass. Later documents reusing an id are dropped.
    pub fn from_documents<I: IntoIterator<Item = Document>>(documents: I) -> Self {
        let mut docs: Vec<Document> = Vec::new();
        let mut by_id: HashMap<String, DocIndex> = HashMap::new();
        let mut postings: HashMap<TermId, Vec<Posting>> = HashMap::new();
        let mut document_frequency: HashMap<TermId, u32> = HashMap::new();
        let mut total_length: u64 = 0;
        let mut duplicates = 0usize;

        for doc in documents {
            if by_id.contains_key(&doc.id) {
                duplicates += 1;
                continue;
            }
            let index = docs.len() as DocIndex;
            for &(term, tf) in doc.vector.entries() {
                *document_frequency.entry(term).or_insert(0) += 1;
                postings.entry(term).or_default().push(Posting { doc: index, tf });
            }
            total_length += doc.length;
            by_id.insert(doc.id.clone(), index);
            docs.push(doc);
        }
        if duplicates > 0 {
            tracing::debug!(duplicates, "ignored repeated document ids");
        }

        let num_docs = docs.len() as u32;
        let avg_doc_length = if num_docs == 0 { 0.0 } else { total_length as f64 / num_docs as f64 };
        let stats = CorpusStats { num_docs, total_length, avg_doc_length, document_frequency };
        Self { docs, by_id, postings, stats }
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn documents(&self) -> &[Document] { &self.docs }

    pub fn get(&self, index: DocIndex) -> Option<&Document> { self.docs.get(index as usize) }

    pub fn find(&self, id: &str) -> Option<&Document> {
        self.by_id.get(id).and_then(|&i| self.get(i))
    }

    pub fn document(&self, id: &str) -> Result<&Document> {
        self.find(id).ok_or_else(|| Error::UnknownReference { kind: "document", id: id.to_string() })
    }

    pub fn postings(&self, term: TermId) -> &[Posting] {
        self.postings.get(&term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn stats(&self) -> &CorpusStats { &self.stats }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub query_id: String,
    pub doc_id: String,
    pub score: f64,
}

/// Results for one query, best first. Rank is the position in `results`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankedList {
    pub query_id: String,
    pub results: Vec<ScoredResult>,
}

impl RankedList {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self { query_id: query_id.into(), results: Vec::new() }
    }

    pub fn push(&mut self, doc_id: impl Into<String>, score: f64) {
        self.results.push(ScoredResult { query_id: self.query_id.clone(), doc_id: doc_id.into(), score });
    }

    pub fn len(&self) -> usize { self.results.len() }

    pub fn is_empty(&self) -> bool { self.results.is_empty() }

    pub fn truncate(&mut self, depth: usize) { self.results.truncate(depth) }

    pub fn doc_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.results.iter().map(|r| r.doc_id.as_str())
    }
}
