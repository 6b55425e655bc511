use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::output::ProductRecord;
use std::sync::Mutex;

/// Keeps records in memory, for embedding the crawler in another program
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ProductRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the records received so far, in emission order
    pub fn records(&self) -> Vec<ProductRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn push(&self, record: &ProductRecord) -> OutputResult<()> {
        self.records
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock records: {}", e)))?
            .push(record.clone());
        Ok(())
    }
}
