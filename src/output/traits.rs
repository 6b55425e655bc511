//! Record sink trait and output errors
//!
//! A sink receives records one at a time, in emission order, and is finalized
//! once with the run summary.

use crate::output::{ProductRecord, RunSummary};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for record sinks
///
/// Implementations must be thread-safe: crawl workers push concurrently.
pub trait RecordSink: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Writes one record
    fn push(&self, record: &ProductRecord) -> OutputResult<()>;

    /// Flushes buffered output and records the run summary where supported
    fn finalize(&self, _summary: &RunSummary) -> OutputResult<()> {
        Ok(())
    }
}
