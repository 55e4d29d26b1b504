use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::contract::AggregateError;

/// 80 MiB, the cap used when none is configured.
pub const DEFAULT_MAX_SIZE: u64 = 80 * 1024 * 1024;
/// 1 MiB read buffer per document.
pub const DEFAULT_READ_BUFFER: usize = 1024 * 1024;
pub const DEFAULT_EXTENSION: &str = "html";

/// Independent content toggles. Applied in a fixed order: minify, then Markdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
    #[serde(default)]
    pub minify: bool,
    #[serde(default)]
    pub markdown: bool,
}

/// Everything one aggregation run needs. Immutable for the duration of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_size: u64,
    /// File name suffix to match, without the leading dot.
    pub extension: String,
    pub transform: TransformOptions,
    /// Size of the read/transform worker pool.
    pub jobs: usize,
    pub read_buffer: usize,
}

impl AggregateConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            max_size: DEFAULT_MAX_SIZE,
            extension: DEFAULT_EXTENSION.to_string(),
            transform: TransformOptions::default(),
            jobs: default_jobs(),
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_transform(mut self, transform: TransformOptions) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Rejects settings no run can honour. Does not touch the filesystem.
    pub fn validate(&self) -> Result<(), AggregateError> {
        if self.max_size == 0 {
            return Err(AggregateError::InvalidConfig(
                "max_size must be a positive number of bytes".into(),
            ));
        }
        if self.jobs == 0 {
            return Err(AggregateError::InvalidConfig(
                "jobs must be at least 1".into(),
            ));
        }
        if self.read_buffer == 0 {
            return Err(AggregateError::InvalidConfig(
                "read_buffer must be at least 1 byte".into(),
            ));
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(AggregateError::InvalidConfig(
                "extension filter must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Suffix (with dot) a file name must end with to be picked up.
    pub fn match_suffix(&self) -> String {
        format!(".{}", self.extension.trim_start_matches('.'))
    }

    /// Extension of the produced batch files.
    pub fn output_extension(&self) -> &str {
        if self.transform.markdown {
            "md"
        } else {
            self.extension.trim_start_matches('.')
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            input_dir = %self.input_dir.display(),
            output_dir = %self.output_dir.display(),
            max_size = self.max_size,
            extension = %self.extension,
            minify = self.transform.minify,
            markdown = self.transform.markdown,
            jobs = self.jobs,
            "Loaded AggregateConfig"
        );
        debug!(?self, "AggregateConfig loaded (full debug)");
    }
}

/// Available hardware parallelism, falling back to a single worker.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
