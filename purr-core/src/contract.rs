//! # contract: shared types for the batch aggregator
//!
//! This module defines the [`Transform`] trait that every document passes
//! through before it is written, the error taxonomy of an aggregation run,
//! and the report returned to callers.
//!
//! ## Interface & Extensibility
//! - Implement [`Transform`] to add a new content step (see [`crate::preprocess`]).
//! - Transforms are synchronous and run on the blocking worker pool, so they
//!   must be `Send + Sync` and must not share mutable state.
//! - Recoverable per-document errors end up in [`AggregateReport::failures`];
//!   everything in [`AggregateError`] that is returned from
//!   [`crate::aggregate::aggregate`] is fatal.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so tests can inject failing or
//!   counting transforms.

use std::path::PathBuf;

use mockall::automock;
use serde::Serialize;

/// Error raised by a single document's transform step. Recoverable.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The minifier produced bytes that are not valid UTF-8.
    #[error("minified output is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The Markdown converter aborted on this document.
    #[error("markdown conversion failed: {0}")]
    Conversion(String),

    #[error("{0}")]
    Other(String),
}

/// Errors of an aggregation run.
///
/// `NotFound`, `InvalidConfig` and `Write` abort the run. `Read` and
/// `Transform` are recorded per document and the run carries on.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("input directory not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
}

/// A content step applied to every document before aggregation.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Transform: Send + Sync {
    /// Transform the full text of one document.
    fn apply(&self, content: String) -> Result<String, TransformError>;
}

/// One source file after reading and transformation.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub content: String,
}

impl Document {
    /// Byte length of the transformed content in UTF-8.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Why a document was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Read,
    Transform,
}

/// A document that was skipped, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

/// A finalized output batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub number: u32,
    pub path: PathBuf,
    pub size: u64,
    pub documents: usize,
    /// SHA-256 of the batch contents, lowercase hex.
    pub sha256: String,
}

/// Outcome of an aggregation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    pub batches: Vec<BatchReport>,
    pub documents_written: usize,
    pub failures: Vec<DocumentFailure>,
    pub cancelled: bool,
}

impl AggregateReport {
    pub fn skipped(&self, kind: FailureKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }

    pub fn total_size(&self) -> u64 {
        self.batches.iter().map(|b| b.size).sum()
    }
}
