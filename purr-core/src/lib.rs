#![doc = "purr-core: core logic library for purr."]

//! This crate contains the document discovery, content transforms and the
//! size-bounded batch aggregator behind the `purr` command-line tool.
//!
//! # Usage
//! Build an [`config::AggregateConfig`], turn its transform toggles into a
//! [`preprocess::Pipeline`] and hand both to [`aggregate::aggregate`].

pub mod aggregate;
pub mod config;
pub mod contract;
pub mod discover;
pub mod preprocess;

pub use aggregate::{aggregate, aggregate_with_cancel};
pub use config::{AggregateConfig, TransformOptions};
pub use contract::{AggregateError, AggregateReport, Transform, TransformError};
