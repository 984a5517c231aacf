use crate::error::Result;
use crate::index::Corpus;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub avg_doc_length: f64,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    pub fn for_corpus(corpus: &Corpus, created_at: impl Into<String>) -> Self {
        Self {
            num_docs: corpus.stats().num_docs,
            num_terms: corpus.num_terms(),
            avg_doc_length: corpus.stats().avg_doc_length,
            created_at: created_at.into(),
            version: SNAPSHOT_VERSION,
        }
    }
}

pub struct SnapshotPaths {
    pub root: PathBuf,
}

impl SnapshotPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn corpus(&self) -> PathBuf { self.root.join("corpus.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    /// True when `root` holds a snapshot rather than being a raw vector file.
    pub fn exists(&self) -> bool { self.meta().is_file() && self.corpus().is_file() }
}

pub fn save_corpus(paths: &SnapshotPaths, corpus: &Corpus) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = BufWriter::new(File::create(paths.corpus())?);
    bincode::serialize_into(&mut f, corpus)?;
    f.flush()?;
    Ok(())
}

pub fn load_corpus(paths: &SnapshotPaths) -> Result<Corpus> {
    let mut f = File::open(paths.corpus())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let corpus = bincode::deserialize(&buf)?;
    Ok(corpus)
}

pub fn save_meta(paths: &SnapshotPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &SnapshotPaths) -> Result<MetaFile> {
    let f = File::open(paths.meta())?;
    let meta: MetaFile = serde_json::from_reader(BufReader::new(f))?;
    Ok(meta)
}

/// Write corpus and metadata together.
pub fn save_snapshot(paths: &SnapshotPaths, corpus: &Corpus, created_at: &str) -> Result<MetaFile> {
    let meta = MetaFile::for_corpus(corpus, created_at);
    save_corpus(paths, corpus)?;
    save_meta(paths, &meta)?;
    Ok(meta)
}

pub fn load_snapshot(paths: &SnapshotPaths) -> Result<(Corpus, MetaFile)> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        tracing::warn!(found = meta.version, expected = SNAPSHOT_VERSION, "snapshot version differs");
    }
    let corpus = load_corpus(paths)?;
    tracing::info!(root = %paths.root.display(), num_docs = corpus.len(), "loaded snapshot");
    Ok((corpus, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Document, SparseVector};

    #[test]
    fn snapshot_restores_postings_and_meta() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SnapshotPaths::new(dir.path().join("snap"));
        assert!(!paths.exists());

        let corpus = Corpus::from_documents(vec![
            Document::new("a", SparseVector::from_pairs([(1, 2), (4, 1)])),
            Document::new("b", SparseVector::from_pairs([(4, 3)])),
        ]);
        let written = save_snapshot(&paths, &corpus, "2024-05-01T12:00:00Z").unwrap();
        assert!(paths.exists());
        assert_eq!(written.num_terms, 2);

        let (loaded, meta) = load_snapshot(&paths).unwrap();
        assert_eq!(meta.version, SNAPSHOT_VERSION);
        assert_eq!(meta.created_at, "2024-05-01T12:00:00Z");
        assert_eq!(loaded.postings(4).len(), 2);
        assert_eq!(loaded.stats().df(1), 1);
        assert_eq!(loaded.document("b").unwrap().length, 3);
    }

    #[test]
    fn missing_snapshot_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_snapshot(&SnapshotPaths::new(dir.path())).unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }
}
