//! Output module for scraped product records
//!
//! This module handles:
//! - The `ProductRecord` data model and its JSON shape
//! - Record sinks (JSON Lines, SQLite, in-memory)
//! - The end-of-run summary

mod jsonl;
mod memory;
mod record;
mod sqlite;
pub mod stats;
mod traits;

pub use jsonl::JsonlSink;
pub use memory::MemorySink;
pub use record::ProductRecord;
pub use sqlite::SqliteSink;
pub use stats::{print_summary, RunSummary};
pub use traits::{OutputError, OutputResult, RecordSink};

use crate::config::{OutputConfig, OutputFormat};
use std::path::Path;
use std::sync::Arc;

/// Opens the sink selected by the output configuration
///
/// # Arguments
///
/// * `config` - Output format and path
/// * `config_hash` - Recorded alongside the run where the sink supports it
pub fn open_sink(config: &OutputConfig, config_hash: &str) -> OutputResult<Arc<dyn RecordSink>> {
    let path = Path::new(&config.path);
    let sink: Arc<dyn RecordSink> = match config.format {
        OutputFormat::Jsonl => Arc::new(JsonlSink::create(path)?),
        OutputFormat::Sqlite => Arc::new(SqliteSink::open(path, config_hash)?),
    };
    tracing::info!("Writing {} records to {}", sink.name(), path.display());
    Ok(sink)
}
