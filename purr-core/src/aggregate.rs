//! Size-bounded batch aggregation: discover → transform → concatenate.
//!
//! This module owns the one policy of the crate. Documents found under the
//! input root are read and transformed on a blocking worker pool, then written
//! strictly in path order into `combined_<n>.<ext>` files, each capped at
//! `max_size` bytes.
//!
//! # Rollover
//! Before a document is appended, the next batch is opened and the current one
//! finalized if `current + document > max_size` **and** the current batch
//! already holds content. A document is never split, so a document larger than
//! `max_size` ends up alone in its own batch.
//!
//! # Ordering
//! Worker results are consumed through an ordered buffer, so completion order
//! never leaks into the output: repeated runs over the same tree produce
//! byte-identical batches.
//!
//! # Error Handling
//! Per-document read and transform errors are logged, recorded in the report
//! and skipped. Any error creating, writing or flushing a batch aborts the run
//! with the batch path.
//!
//! # Navigation
//! - Entrypoints: [`aggregate`], [`aggregate_with_cancel`]
//! - Writer state: [`BatchWriter`]

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{future, stream, StreamExt};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AggregateConfig;
use crate::contract::{
    AggregateError, AggregateReport, BatchReport, Document, DocumentFailure, FailureKind,
    Transform, TransformError,
};
use crate::discover::discover;

/// Path of batch `number` inside `output_dir`.
pub fn batch_path(output_dir: &Path, number: u32, extension: &str) -> PathBuf {
    output_dir.join(format!("combined_{number}.{extension}"))
}

struct OpenBatch {
    number: u32,
    path: PathBuf,
    file: BufWriter<File>,
    size: u64,
    documents: usize,
    hasher: Sha256,
}

impl OpenBatch {
    fn create(output_dir: &Path, number: u32, extension: &str) -> Result<Self, AggregateError> {
        let path = batch_path(output_dir, number, extension);
        let file = File::create(&path).map_err(|source| {
            error!(error = ?source, path = %path.display(), "Failed to create batch file");
            AggregateError::Write {
                path: path.clone(),
                source,
            }
        })?;
        debug!(number, path = %path.display(), "Opened batch");
        Ok(Self {
            number,
            path,
            file: BufWriter::new(file),
            size: 0,
            documents: 0,
            hasher: Sha256::new(),
        })
    }

    fn append(&mut self, content: &[u8]) -> Result<(), AggregateError> {
        self.file.write_all(content).map_err(|source| {
            error!(error = ?source, path = %self.path.display(), "Failed to write to batch file");
            AggregateError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        self.hasher.update(content);
        self.size += content.len() as u64;
        self.documents += 1;
        Ok(())
    }

    fn close(mut self) -> Result<BatchReport, AggregateError> {
        self.file.flush().map_err(|source| {
            error!(error = ?source, path = %self.path.display(), "Failed to flush batch file");
            AggregateError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        let report = BatchReport {
            number: self.number,
            path: self.path,
            size: self.size,
            documents: self.documents,
            sha256: format!("{:x}", self.hasher.finalize()),
        };
        info!(
            number = report.number,
            size = report.size,
            documents = report.documents,
            path = %report.path.display(),
            "Finalized batch"
        );
        Ok(report)
    }
}

/// Sequential writer stage. Holds the single open batch and decides rollover.
///
/// The first batch is created eagerly, so a run with no documents still leaves
/// an empty `combined_1.<ext>` behind.
pub struct BatchWriter {
    output_dir: PathBuf,
    extension: String,
    max_size: u64,
    current: OpenBatch,
    finished: Vec<BatchReport>,
}

impl BatchWriter {
    /// Create `output_dir` (with parents) and open batch 1.
    pub fn create(
        output_dir: &Path,
        extension: &str,
        max_size: u64,
    ) -> Result<Self, AggregateError> {
        std::fs::create_dir_all(output_dir).map_err(|source| {
            error!(error = ?source, path = %output_dir.display(), "Failed to create output directory");
            AggregateError::Write {
                path: output_dir.to_path_buf(),
                source,
            }
        })?;
        let first = OpenBatch::create(output_dir, 1, extension)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            extension: extension.to_string(),
            max_size,
            current: first,
            finished: Vec::new(),
        })
    }

    /// Open the next batch, then finalize the current one.
    ///
    /// If the next batch cannot be created the current batch stays open, so a
    /// retry never reuses a batch number.
    fn roll(&mut self) -> Result<(), AggregateError> {
        let next = OpenBatch::create(
            &self.output_dir,
            self.current.number + 1,
            &self.extension,
        )?;
        let done = std::mem::replace(&mut self.current, next);
        self.finished.push(done.close()?);
        Ok(())
    }

    /// Append one document, rolling over first if it would overflow a non-empty batch.
    pub fn write_document(&mut self, doc: &Document) -> Result<(), AggregateError> {
        let size = doc.size();
        if self.current.size > 0 && self.current.size + size > self.max_size {
            self.roll()?;
        }
        if size > self.max_size {
            warn!(
                path = %doc.path.display(),
                size,
                max_size = self.max_size,
                "Document exceeds max_size on its own; writing it to a dedicated batch"
            );
        }
        let batch = &mut self.current;
        batch.append(doc.content.as_bytes())?;
        debug!(
            path = %doc.path.display(),
            size,
            batch = batch.number,
            batch_size = batch.size,
            "Appended document"
        );
        Ok(())
    }

    /// Finalize the open batch and return every batch in order.
    pub fn finish(mut self) -> Result<Vec<BatchReport>, AggregateError> {
        self.finished.push(self.current.close()?);
        Ok(self.finished)
    }
}

/// Read one file through a buffer of `read_buffer` bytes and transform it.
pub fn load_document<T>(
    path: &Path,
    transform: &T,
    read_buffer: usize,
) -> Result<Document, AggregateError>
where
    T: Transform + ?Sized,
{
    let read_err = |source: std::io::Error| AggregateError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_err)?;
    let mut reader = BufReader::with_capacity(read_buffer, file);
    let mut content = String::new();
    reader.read_to_string(&mut content).map_err(read_err)?;
    let content = transform.apply(content)?;
    Ok(Document {
        path: path.to_path_buf(),
        content,
    })
}

fn record_failure(report: &mut AggregateReport, path: PathBuf, err: AggregateError) {
    let kind = match err {
        AggregateError::Transform(_) => FailureKind::Transform,
        _ => FailureKind::Read,
    };
    warn!(path = %path.display(), ?kind, error = %err, "Skipping document");
    report.failures.push(DocumentFailure {
        path,
        kind,
        message: err.to_string(),
    });
}

/// Run one aggregation with no cancellation.
pub async fn aggregate<T>(
    config: &AggregateConfig,
    transform: Arc<T>,
) -> Result<AggregateReport, AggregateError>
where
    T: Transform + ?Sized + 'static,
{
    aggregate_with_cancel(config, transform, CancellationToken::new()).await
}

/// Run one aggregation. Once `cancel` fires, no further documents are
/// scheduled; documents already in flight are written in order and the open
/// batch is finalized normally.
pub async fn aggregate_with_cancel<T>(
    config: &AggregateConfig,
    transform: Arc<T>,
    cancel: CancellationToken,
) -> Result<AggregateReport, AggregateError>
where
    T: Transform + ?Sized + 'static,
{
    config.validate()?;
    config.trace_loaded();

    let discovery = discover(&config.input_dir, &config.match_suffix())?;
    let total = discovery.documents.len();

    let mut report = AggregateReport {
        failures: discovery.failures,
        ..AggregateReport::default()
    };

    let mut writer = BatchWriter::create(
        &config.output_dir,
        config.output_extension(),
        config.max_size,
    )?;

    info!(
        documents = total,
        jobs = config.jobs,
        max_size = config.max_size,
        "[AGGREGATE] Starting aggregation"
    );

    let read_buffer = config.read_buffer;
    let mut seen = 0usize;
    let mut loaded = stream::iter(discovery.documents)
        .take_while(|_| future::ready(!cancel.is_cancelled()))
        .map(|path| {
            let transform = Arc::clone(&transform);
            async move {
                let job_path = path.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    load_document(&job_path, transform.as_ref(), read_buffer)
                })
                .await;
                (path, joined)
            }
        })
        .buffered(config.jobs);

    while let Some((path, joined)) = loaded.next().await {
        seen += 1;
        match joined {
            Ok(Ok(doc)) => {
                if let Err(e) = writer.write_document(&doc) {
                    error!(error = %e, "[AGGREGATE][ERROR] Aborting run on write failure");
                    return Err(e);
                }
                report.documents_written += 1;
            }
            Ok(Err(e)) => record_failure(&mut report, path, e),
            Err(join_err) => {
                let err = AggregateError::Transform(TransformError::Other(format!(
                    "worker task failed: {join_err}"
                )));
                record_failure(&mut report, path, err);
            }
        }
    }
    drop(loaded);

    report.cancelled = cancel.is_cancelled() && seen < total;
    if report.cancelled {
        warn!(
            processed = seen,
            remaining = total - seen,
            "[AGGREGATE] Cancelled; closing current batch"
        );
    }

    report.batches = writer.finish()?;

    info!(
        batches = report.batches.len(),
        documents_written = report.documents_written,
        read_failures = report.skipped(FailureKind::Read),
        transform_failures = report.skipped(FailureKind::Transform),
        total_size = report.total_size(),
        "[AGGREGATE] Aggregation complete"
    );
    Ok(report)
}
