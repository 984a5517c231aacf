//! Ranking-exchange run files and relevance judgment files.
//!
//! Run line: `queryId Q0 docId rank score tag`
//! Judgment line: `queryId intentOrIteration docId grade`

use crate::error::{Error, Result};
use crate::eval::Judgments;
use crate::index::{RankedList, ScoredResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Write the first `depth` results of each list with 0-based ranks.
pub fn write_run<W: Write>(mut w: W, lists: &[RankedList], tag: &str, depth: usize) -> Result<()> {
    for list in lists {
        for (rank, r) in list.results.iter().take(depth).enumerate() {
            writeln!(w, "{} Q0 {} {} {} {}", r.query_id, r.doc_id, rank, r.score, tag)?;
        }
    }
    w.flush()?;
    Ok(())
}

pub fn save_run<P: AsRef<Path>>(path: P, lists: &[RankedList], tag: &str, depth: usize) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let f = File::create(path)?;
    write_run(std::io::BufWriter::new(f), lists, tag, depth)?;
    tracing::info!(path = %path.display(), num_queries = lists.len(), tag, "wrote run");
    Ok(())
}

/// Read a run, grouping lines by query id. Queries keep the order in which
/// they first appear; each query's entries are ordered by their rank column.
pub fn read_run<R: BufRead>(reader: R, file: &str) -> Result<Vec<RankedList>> {
    let mut lists: Vec<RankedList> = Vec::new();
    let mut ranks: Vec<Vec<u64>> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < 5 {
            return Err(Error::malformed(file, line_no, format!("expected at least 5 columns, got {}", tokens.len())));
        }
        let rank: u64 = tokens[3]
            .parse()
            .map_err(|_| Error::malformed(file, line_no, format!("invalid rank '{}'", tokens[3])))?;
        let score: f64 = tokens[4]
            .parse()
            .ok()
            .filter(|s: &f64| s.is_finite())
            .ok_or_else(|| Error::malformed(file, line_no, format!("invalid score '{}'", tokens[4])))?;

        let slot = *slots.entry(tokens[0].to_string()).or_insert_with(|| {
            lists.push(RankedList::new(tokens[0]));
            ranks.push(Vec::new());
            lists.len() - 1
        });
        lists[slot].push(tokens[2], score);
        ranks[slot].push(rank);
    }

    for (list, rank) in lists.iter_mut().zip(ranks) {
        let mut keyed: Vec<(u64, ScoredResult)> = rank.into_iter().zip(std::mem::take(&mut list.results)).collect();
        keyed.sort_by_key(|(r, _)| *r); // stable for repeated ranks
        list.results = keyed.into_iter().map(|(_, r)| r).collect();
    }
    Ok(lists)
}

pub fn load_run<P: AsRef<Path>>(path: P) -> Result<Vec<RankedList>> {
    let path = path.as_ref();
    let f = File::open(path)?;
    let lists = read_run(BufReader::new(f), &path.display().to_string())?;
    tracing::info!(path = %path.display(), num_queries = lists.len(), "loaded run");
    Ok(lists)
}

pub fn read_qrels<R: BufRead>(reader: R, file: &str) -> Result<Judgments> {
    let mut judgments = Judgments::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != 4 {
            return Err(Error::malformed(file, i + 1, format!("expected 4 columns, got {}", tokens.len())));
        }
        let grade: i32 = tokens[3]
            .parse()
            .map_err(|_| Error::malformed(file, i + 1, format!("invalid relevance grade '{}'", tokens[3])))?;
        judgments.insert(tokens[0], tokens[1], tokens[2], grade);
    }
    Ok(judgments)
}

pub fn load_qrels<P: AsRef<Path>>(path: P) -> Result<Judgments> {
    let path = path.as_ref();
    let f = File::open(path)?;
    let judgments = read_qrels(BufReader::new(f), &path.display().to_string())?;
    tracing::info!(path = %path.display(), num_queries = judgments.num_queries(), "loaded judgments");
    Ok(judgments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn run_round_trips_with_depth() {
        let mut list = RankedList::new("201");
        list.push("d1", 2.5);
        list.push("d2", 1.0);
        list.push("d3", 0.5);
        let mut buf = Vec::new();
        write_run(&mut buf, &[list], "bm25", 2).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "201 Q0 d1 0 2.5 bm25\n201 Q0 d2 1 1 bm25\n");

        let lists = read_run(Cursor::new(text), "run").unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].doc_ids().collect::<Vec<_>>(), vec!["d1", "d2"]);
    }

    #[test]
    fn run_groups_interleaved_queries_and_orders_by_rank() {
        let text = "\
202 Q0 b 1 0.4 t
201 Q0 x 0 9 t
202 Q0 a 0 0.9 t
201 Q0 y 1 8 t
";
        let lists = read_run(Cursor::new(text), "run").unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].query_id, "202");
        assert_eq!(lists[0].doc_ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(lists[0].results[0].score, 0.9);
        assert_eq!(lists[1].doc_ids().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn run_with_bad_score_is_malformed() {
        let err = read_run(Cursor::new("1 Q0 d 0 high t\n"), "run").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn run_with_non_finite_score_is_malformed() {
        for score in ["NaN", "inf", "-inf"] {
            let text = format!("1 Q0 a 0 2.0 t\n1 Q0 b 1 {score} t\n");
            let err = read_run(Cursor::new(text), "run").unwrap_err();
            assert!(matches!(err, Error::MalformedRecord { line: 2, .. }), "{score} accepted");
        }
    }

    #[test]
    fn qrels_keep_intents() {
        let text = "201 1 d1 1\n201 2 d1 1\n201 3 d2 0\n202 0 d9 -2\n";
        let j = read_qrels(Cursor::new(text), "qrels").unwrap();
        let q = j.get("201").unwrap();
        assert_eq!(q.relevance("d1"), 1);
        assert_eq!(q.intents("d1").len(), 2);
        assert!(q.intents("d2").is_empty());
        assert_eq!(j.get("202").unwrap().relevance("d9"), 0);
    }
}
