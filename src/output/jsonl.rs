//! JSON Lines sink: one record per line

use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::output::{ProductRecord, RunSummary};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// Writes records as newline-delimited JSON
pub struct JsonlSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    /// Creates (or truncates) the output file
    pub fn create(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl RecordSink for JsonlSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn push(&self, record: &ProductRecord) -> OutputResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock writer: {}", e)))?;

        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn finalize(&self, _summary: &RunSummary) -> OutputResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock writer: {}", e)))?;
        writer.flush()?;
        Ok(())
    }
}
