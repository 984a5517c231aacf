use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use divrank_core::parse::load_document_list;
use divrank_core::persist::{load_meta, save_snapshot, MetaFile, SnapshotPaths};
use divrank_core::{Corpus, Document};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build corpus snapshots from term-frequency vector files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse document vectors and write a snapshot directory
    Build {
        /// Vector file, or a directory whose files are read in path order
        #[arg(long)]
        docs: PathBuf,
        /// Snapshot directory
        #[arg(long)]
        output: PathBuf,
    },
    /// Print the metadata of an existing snapshot
    Info {
        #[arg(long)]
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { docs, output } => {
            let meta = build_snapshot(&docs, &output)?;
            println!("{}", describe(&meta));
            Ok(())
        }
        Commands::Info { index } => {
            let meta = load_meta(&SnapshotPaths::new(&index))
                .with_context(|| format!("reading snapshot metadata in {}", index.display()))?;
            println!("{}", describe(&meta));
            Ok(())
        }
    }
}

fn describe(meta: &MetaFile) -> String {
    format!(
        "docs={} terms={} avg_doc_length={:.3} created_at={} version={}",
        meta.num_docs, meta.num_terms, meta.avg_doc_length, meta.created_at, meta.version
    )
}

fn input_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("input {} does not exist", input.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

fn build_snapshot(input: &Path, output: &Path) -> Result<MetaFile> {
    let mut docs: Vec<Document> = Vec::new();
    for file in input_files(input)? {
        let parsed = load_document_list(&file).with_context(|| format!("parsing {}", file.display()))?;
        tracing::info!(file = %file.display(), num_docs = parsed.len(), "parsed vector file");
        docs.extend(parsed);
    }

    let corpus = Corpus::from_documents(docs);
    tracing::info!(num_docs = corpus.len(), num_terms = corpus.num_terms(), "ingested documents");

    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    let meta = save_snapshot(&SnapshotPaths::new(output), &corpus, &created_at)?;
    tracing::info!(output = %output.display(), "snapshot build complete");
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use divrank_core::persist::load_snapshot;
    use std::fs;

    #[test]
    fn directory_input_is_merged_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("vectors");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("a.dat"), "d1 1:2 2:1\nd2 1:1\n").unwrap();
        fs::write(input.join("b.dat"), "d3 3:4\nd1 9:9\n").unwrap();

        let out = dir.path().join("snap");
        let meta = build_snapshot(&input, &out).unwrap();
        assert_eq!(meta.num_docs, 3);
        assert_eq!(meta.num_terms, 3);
        assert!(!meta.created_at.is_empty());

        let (corpus, _) = load_snapshot(&SnapshotPaths::new(&out)).unwrap();
        // the later d1 record is ignored
        assert_eq!(corpus.find("d1").unwrap().length, 3);
        assert_eq!(corpus.documents().iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn malformed_file_fails_the_build() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("docs.dat");
        fs::write(&input, "d1 1:2\nd2 oops\n").unwrap();
        let err = build_snapshot(&input, &dir.path().join("snap")).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
        assert!(!dir.path().join("snap").exists());
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(build_snapshot(&dir.path().join("nope"), &dir.path().join("snap")).is_err());
    }
}
