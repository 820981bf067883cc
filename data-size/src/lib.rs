//! Storage usage for a single task: bytes and item counts across the artifact
//! bucket, the per-task record tables, and an estimate of the embedding vectors
//! derived from the raw embedding files.

pub mod aggregate;
pub mod backends;
pub mod config;
pub mod error;
pub mod handler;
pub mod mock;
pub mod out;
pub mod sizing;
pub mod storage_core;
pub mod thumbnails;
pub mod topology;
pub mod types;

pub use aggregate::Aggregator;
pub use config::Settings;
pub use error::SizeError;
pub use handler::{get_data_size, DataSizeRequest, Response};
pub use types::{AggregateResult, BreakdownEntry, Outcome, SizeInfo, TableSizeInfo, VectorEstimate};
