use crate::error::{Error, Result};
use crate::index::{Corpus, Document, Query, SparseVector, TermId};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parse one `id term:freq term:freq ...` record. Blank lines yield `None`.
pub fn parse_vector_line(line: &str, file: &str, line_no: usize) -> Result<Option<(String, SparseVector)>> {
    let mut tokens = line.split_whitespace();
    let id = match tokens.next() {
        Some(id) => id,
        None => return Ok(None),
    };
    let mut pairs: Vec<(TermId, u32)> = Vec::new();
    for token in tokens {
        let (term, freq) = token
            .split_once(':')
            .ok_or_else(|| Error::malformed(file, line_no, format!("expected term:frequency, got '{token}'")))?;
        let term: TermId = term
            .parse()
            .map_err(|_| Error::malformed(file, line_no, format!("invalid term id '{term}'")))?;
        let freq: u32 = freq
            .parse()
            .map_err(|_| Error::malformed(file, line_no, format!("frequency '{freq}' is not a non-negative integer")))?;
        pairs.push((term, freq));
    }
    Ok(Some((id.to_string(), SparseVector::from_pairs(pairs))))
}

/// Every record of a document vector file, in file order.
pub fn read_document_list<R: BufRead>(reader: R, file: &str) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some((id, vector)) = parse_vector_line(&line, file, i + 1)? {
            docs.push(Document::new(id, vector));
        }
    }
    Ok(docs)
}

pub fn load_document_list<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let f = File::open(path)?;
    read_document_list(BufReader::new(f), &path.display().to_string())
}

/// Read a document vector file into a corpus. Repeated ids keep their first record.
pub fn read_documents<R: BufRead>(reader: R, file: &str) -> Result<Corpus> {
    let corpus = Corpus::from_documents(read_document_list(reader, file)?);
    tracing::info!(file, num_docs = corpus.len(), num_terms = corpus.num_terms(), "loaded documents");
    Ok(corpus)
}

pub fn load_documents<P: AsRef<Path>>(path: P) -> Result<Corpus> {
    let path = path.as_ref();
    let f = File::open(path)?;
    read_documents(BufReader::new(f), &path.display().to_string())
}

pub fn read_queries<R: BufRead>(reader: R, file: &str) -> Result<Vec<Query>> {
    let mut queries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some((id, vector)) = parse_vector_line(&line, file, i + 1)? {
            queries.push(Query::new(id, vector));
        }
    }
    tracing::info!(file, num_queries = queries.len(), "loaded queries");
    Ok(queries)
}

pub fn load_queries<P: AsRef<Path>>(path: P) -> Result<Vec<Query>> {
    let path = path.as_ref();
    let f = File::open(path)?;
    read_queries(BufReader::new(f), &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_record() {
        let (id, v) = parse_vector_line("clueweb-1 4:2 9:1 4:7", "t", 1).unwrap().unwrap();
        assert_eq!(id, "clueweb-1");
        assert_eq!(v.entries(), &[(4, 2), (9, 1)]);
    }

    #[test]
    fn blank_line_is_skipped() {
        assert!(parse_vector_line("   ", "t", 1).unwrap().is_none());
    }

    #[test]
    fn negative_frequency_is_malformed() {
        let err = parse_vector_line("d 3:-1", "docs.dat", 12).unwrap_err();
        match err {
            Error::MalformedRecord { file, line, .. } => {
                assert_eq!(file, "docs.dat");
                assert_eq!(line, 12);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_colon_is_malformed() {
        assert!(matches!(parse_vector_line("d 3", "t", 1), Err(Error::MalformedRecord { .. })));
    }

    #[test]
    fn read_documents_reports_line_number() {
        let input = "a 1:1\n\nb 2:x\n";
        let err = read_documents(Cursor::new(input), "docs").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { line: 3, .. }));
    }

    #[test]
    fn read_documents_dedups_ids() {
        let input = "a 1:1 2:2\nb 2:1\na 5:5\n";
        let corpus = read_documents(Cursor::new(input), "docs").unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.find("a").unwrap().length, 3);
    }
}
