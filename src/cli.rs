///
/// This module implements the CLI interface for purr: command parsing, merging
/// flags with an optional YAML config file, and printing the run report.
///
/// All business logic (discovery, transforms, batching) lives in the
/// [`purr-core`] crate. This module is strictly CLI glue.
///
/// ## How To Use
/// - For command-line users: `purr html-combine <INPUT> --help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// ## Extending
/// Each clump script is one variant of [`Commands`].
///
/// [`purr-core`]: ../../purr-core/
use crate::load_config::{load_config, FileConfig};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use purr_core::aggregate::aggregate_with_cancel;
use purr_core::config::{
    default_jobs, AggregateConfig, TransformOptions, DEFAULT_EXTENSION, DEFAULT_MAX_SIZE,
    DEFAULT_READ_BUFFER,
};
use purr_core::contract::{AggregateError, AggregateReport, FailureKind};
use purr_core::preprocess::Pipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// CLI for purr: batch utilities grouped into clumps.
#[derive(Parser)]
#[clap(
    name = "purr",
    version,
    about = "Batch document utilities: combine, minify and convert HTML trees into size-capped files"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Combine the HTML files of a directory tree into numbered, size-capped files
    #[clap(name = "html-combine", visible_alias = "combine")]
    HtmlCombine(HtmlCombineArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct HtmlCombineArgs {
    /// Directory tree containing the documents to combine
    pub input: PathBuf,

    /// Output directory for combined_<n> files [default: current directory]
    #[clap(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Maximum size in bytes of each combined file [default: 83886080]
    #[clap(long = "max-size", allow_negative_numbers = true)]
    pub max_size: Option<i64>,

    /// Collapse whitespace in each document
    #[clap(long)]
    pub minify: bool,

    /// Convert each document's body to Markdown (writes .md files)
    #[clap(long, visible_alias = "md")]
    pub markdown: bool,

    /// File extension to pick up [default: html]
    #[clap(long)]
    pub extension: Option<String>,

    /// Number of read/transform workers [default: available parallelism]
    #[clap(long)]
    pub jobs: Option<usize>,

    /// Read buffer size in bytes [default: 1048576]
    #[clap(long = "buffer-size")]
    pub buffer_size: Option<usize>,

    /// YAML file with defaults for any of the options above
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Print the run report as JSON
    #[clap(long)]
    pub json: bool,
}

/// Merge explicit flags over the optional config file over built-in defaults.
pub fn resolve_config(args: &HtmlCombineArgs) -> Result<AggregateConfig> {
    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };

    let output_dir = match args.output.clone().or(file.output_dir) {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let max_size = args
        .max_size
        .or(file.max_size)
        .unwrap_or(DEFAULT_MAX_SIZE as i64);
    let max_size = u64::try_from(max_size).map_err(|_| {
        AggregateError::InvalidConfig(format!(
            "max_size must be a positive number of bytes, got {max_size}"
        ))
    })?;

    let config = AggregateConfig {
        input_dir: args.input.clone(),
        output_dir,
        max_size,
        extension: args
            .extension
            .clone()
            .or(file.extension)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
        transform: TransformOptions {
            minify: args.minify || file.minify.unwrap_or(false),
            markdown: args.markdown || file.markdown.unwrap_or(false),
        },
        jobs: args.jobs.or(file.jobs).unwrap_or_else(default_jobs),
        read_buffer: args
            .buffer_size
            .or(file.buffer_size)
            .unwrap_or(DEFAULT_READ_BUFFER),
    };
    config.validate()?;
    Ok(config)
}

/// Human-readable run summary.
pub fn render_summary(report: &AggregateReport) -> String {
    let mut out = String::new();
    let state = if report.cancelled {
        "Combine cancelled"
    } else {
        "Combine complete"
    };
    out.push_str(&format!(
        "{state}: {} document(s) into {} batch(es), {} bytes\n",
        report.documents_written,
        report.batches.len(),
        report.total_size()
    ));
    for batch in &report.batches {
        out.push_str(&format!(
            "  {}  {} bytes  {} document(s)\n",
            batch.path.display(),
            batch.size,
            batch.documents
        ));
    }
    if !report.failures.is_empty() {
        out.push_str(&format!(
            "Skipped: {} unreadable, {} failed to transform\n",
            report.skipped(FailureKind::Read),
            report.skipped(FailureKind::Transform)
        ));
        for failure in &report.failures {
            out.push_str(&format!(
                "  {}: {}\n",
                failure.path.display(),
                failure.message
            ));
        }
    }
    out
}

async fn html_combine(args: HtmlCombineArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    tracing::info!(command = "html-combine", "Starting combine");

    let transform = Arc::new(Pipeline::from_options(&config.transform));

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight documents");
            on_ctrl_c.cancel();
        }
    });

    let result = aggregate_with_cancel(&config, transform, cancel).await;
    signal_task.abort();

    match result {
        Ok(report) => {
            tracing::info!(command = "html-combine", batches = report.batches.len(), "Combine complete");
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_summary(&report));
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "html-combine", error = %e, "Combine failed");
            Err(anyhow::Error::new(e).context("html-combine failed"))
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::HtmlCombine(args) => html_combine(args).await,
    }
}
