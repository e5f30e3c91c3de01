//! Ingestion pipeline: load, chunk and index the course material directory.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::config::ChunkingConfig;
use crate::loader::{DocumentLoader, LoadError};
use crate::rag::{aggregate_parallel, Chunker, RagError, VectorIndex};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Index(#[from] RagError),

    #[error("Loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Drop every existing record before indexing.
    pub clear_first: bool,
    /// Stop at the first file that fails to load or index.
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Load,
    Index,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub files_seen: usize,
    pub files_loaded: usize,
    pub chunks_indexed: usize,
    pub failures: Vec<IngestFailure>,
    /// Set when `fail_fast` stopped the run early.
    pub aborted: bool,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, path: PathBuf, stage: FailureStage, message: String) {
        log::warn!("{:?} failure for {}: {}", stage, path.display(), message);
        self.failures.push(IngestFailure {
            path,
            stage,
            message,
        });
    }
}

/// Load every file under the loader's directory and index its chunks.
///
/// Each file is indexed as one all-or-nothing batch, so a failing file never
/// leaves partial records behind. Per-file failures are collected in the
/// report; only a missing data directory or a failed clear are fatal, and
/// the directory is scanned before anything is cleared.
pub async fn ingest(
    loader: &DocumentLoader,
    index: &VectorIndex,
    chunking: ChunkingConfig,
    options: IngestOptions,
) -> Result<IngestReport, IngestError> {
    // Scan before clearing so a bad data directory leaves the index intact.
    let scan = loader.clone();
    let outcomes = tokio::task::spawn_blocking(move || scan.load_all()).await??;

    if options.clear_first {
        index.clear()?;
    }

    let chunker = Chunker::new(chunking);
    let mut report = IngestReport {
        files_seen: outcomes.len(),
        ..Default::default()
    };

    for (i, outcome) in outcomes.into_iter().enumerate() {
        let documents = match outcome.result {
            Ok(documents) => documents,
            Err(e) => {
                report.fail(outcome.path, FailureStage::Load, e.to_string());
                if options.fail_fast {
                    report.aborted = true;
                    break;
                }
                continue;
            }
        };
        report.files_loaded += 1;

        let chunks = aggregate_parallel(&chunker, &documents);
        match index.add_chunks(&chunks).await {
            Ok(written) => {
                report.chunks_indexed += written;
                log::info!(
                    "[{}/{}] {}: {} chunk(s)",
                    i + 1,
                    report.files_seen,
                    outcome.path.display(),
                    written
                );
            }
            Err(e) => {
                report.fail(outcome.path, FailureStage::Index, e.to_string());
                if options.fail_fast {
                    report.aborted = true;
                    break;
                }
            }
        }
    }

    log::info!(
        "Ingestion finished: {}/{} file(s) loaded, {} chunk(s) indexed, {} failure(s)",
        report.files_loaded,
        report.files_seen,
        report.chunks_indexed,
        report.failures.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::{FailingEmbedder, HistogramEmbedder};
    use crate::rag::{Collection, Embedder};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        loader: DocumentLoader,
        index: VectorIndex,
    }

    fn fixture(files: &[(&str, &str)], embedder: Arc<dyn Embedder>) -> Fixture {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        fs::create_dir_all(&data).unwrap();
        for (name, bytes) in files {
            fs::write(data.join(name), bytes).unwrap();
        }
        let collection = Collection::open(&temp.path().join("db"), "course_materials").unwrap();
        Fixture {
            loader: DocumentLoader::new(data),
            index: VectorIndex::new(collection, embedder, 2, Duration::from_secs(5)),
            _temp: temp,
        }
    }

    fn chunking() -> ChunkingConfig {
        ChunkingConfig::new(40, 8).unwrap()
    }

    fn names(report: &IngestReport) -> Vec<String> {
        report
            .failures
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_ingest_indexes_every_file() {
        let f = fixture(
            &[
                ("a.txt", "语言模型预测下一个词。"),
                ("b.txt", "Attention is all you need. Transformers scale well."),
            ],
            Arc::new(HistogramEmbedder::default()),
        );

        let report = ingest(&f.loader, &f.index, chunking(), IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(report.files_seen, 2);
        assert_eq!(report.files_loaded, 2);
        assert!(report.is_clean());
        assert!(report.chunks_indexed >= 2);
        assert_eq!(f.index.count().unwrap(), report.chunks_indexed as u64);
    }

    #[tokio::test]
    async fn test_failures_are_reported_and_others_indexed() {
        let f = fixture(
            &[
                ("a.txt", "good material"),
                ("b.txt", "BAD material"),
                ("d.txt", "more good material"),
            ],
            Arc::new(FailingEmbedder { marker: "BAD" }),
        );
        fs::write(f.loader.data_dir().join("c.txt"), [0xff, 0xfe]).unwrap();

        let report = ingest(&f.loader, &f.index, chunking(), IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(report.files_seen, 4);
        assert_eq!(report.files_loaded, 3);
        assert_eq!(names(&report), vec!["b.txt", "c.txt"]);
        assert_eq!(report.failures[0].stage, FailureStage::Index);
        assert_eq!(report.failures[1].stage, FailureStage::Load);
        assert!(!report.aborted);
        assert_eq!(f.index.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_first_failure() {
        let f = fixture(
            &[("a.txt", "BAD start"), ("b.txt", "fine")],
            Arc::new(FailingEmbedder { marker: "BAD" }),
        );
        let options = IngestOptions {
            fail_fast: true,
            ..Default::default()
        };

        let report = ingest(&f.loader, &f.index, chunking(), options).await.unwrap();
        assert!(report.aborted);
        assert_eq!(names(&report), vec!["a.txt"]);
        assert_eq!(f.index.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_first_replaces_previous_records() {
        let f = fixture(&[("a.txt", "short note")], Arc::new(HistogramEmbedder::default()));
        let options = IngestOptions {
            clear_first: true,
            ..Default::default()
        };

        ingest(&f.loader, &f.index, chunking(), options).await.unwrap();
        let first = f.index.count().unwrap();
        ingest(&f.loader, &f.index, chunking(), options).await.unwrap();
        assert_eq!(f.index.count().unwrap(), first);

        ingest(&f.loader, &f.index, chunking(), IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(f.index.count().unwrap(), first * 2);
    }

    #[tokio::test]
    async fn test_missing_directory_keeps_existing_records() {
        let f = fixture(
            &[("a.txt", "注意力。"), ("b.txt", "位置编码。")],
            Arc::new(HistogramEmbedder::default()),
        );
        ingest(&f.loader, &f.index, chunking(), IngestOptions::default())
            .await
            .unwrap();
        let before = f.index.count().unwrap();
        assert_eq!(before, 2);

        let missing = DocumentLoader::new(f.loader.data_dir().join("no_such_dir"));
        let options = IngestOptions {
            clear_first: true,
            ..Default::default()
        };
        let err = ingest(&missing, &f.index, chunking(), options)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Load(LoadError::MissingDirectory(_))));
        assert_eq!(f.index.count().unwrap(), before);
    }

    #[tokio::test]
    async fn test_missing_directory_is_fatal() {
        let f = fixture(&[], Arc::new(HistogramEmbedder::default()));
        let loader = DocumentLoader::new(Path::new("/nonexistent/course/data"));
        let err = ingest(&loader, &f.index, chunking(), IngestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Load(LoadError::MissingDirectory(_))));
    }
}
