//! SQLite sink
//!
//! Products are keyed by URL, so re-running a crawl against the same database
//! refreshes existing rows instead of duplicating them. Each run also leaves
//! a row in `runs` with its config hash and final counters.

use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::output::{ProductRecord, RunSummary};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQL schema for the products database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    items_scraped INTEGER,
    max_items INTEGER,
    pages_fetched INTEGER
);

-- One row per product URL, refreshed on every scrape
CREATE TABLE IF NOT EXISTS products (
    url TEXT PRIMARY KEY,
    name TEXT,
    price TEXT,
    price_numeric REAL,
    image_url TEXT,
    sku TEXT,
    availability TEXT,
    description TEXT,
    scraped_at TEXT NOT NULL,
    run_id INTEGER NOT NULL REFERENCES runs(id)
);

CREATE INDEX IF NOT EXISTS idx_products_run ON products(run_id);
"#;

/// Writes records to a SQLite database
pub struct SqliteSink {
    conn: Mutex<Connection>,
    run_id: i64,
}

impl SqliteSink {
    /// Opens (or creates) the database and starts a run
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `config_hash` - Hash of the configuration driving this run
    pub fn open(path: &Path, config_hash: &str) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        Self::with_connection(conn, config_hash)
    }

    /// Creates an in-memory database
    pub fn in_memory(config_hash: &str) -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn, config_hash)
    }

    fn with_connection(conn: Connection, config_hash: &str) -> OutputResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![Utc::now().to_rfc3339(), config_hash, "running"],
        )?;
        let run_id = conn.last_insert_rowid();

        Ok(Self {
            conn: Mutex::new(conn),
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Number of product rows in the database
    pub fn count(&self) -> OutputResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn lock(&self) -> OutputResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock database: {}", e)))
    }
}

impl RecordSink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn push(&self, record: &ProductRecord) -> OutputResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO products
                (url, name, price, price_numeric, image_url, sku, availability, description, scraped_at, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(url) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                price_numeric = excluded.price_numeric,
                image_url = excluded.image_url,
                sku = excluded.sku,
                availability = excluded.availability,
                description = excluded.description,
                scraped_at = excluded.scraped_at,
                run_id = excluded.run_id",
            params![
                record.url,
                record.name,
                record.raw_price_text,
                record.numeric_price,
                record.image_url,
                record.sku,
                record.availability.map(|a| a.phrase()),
                record.description,
                record.scraped_at.to_rfc3339(),
                self.run_id,
            ],
        )?;
        Ok(())
    }

    fn finalize(&self, summary: &RunSummary) -> OutputResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE runs
             SET finished_at = ?1, status = ?2, items_scraped = ?3, max_items = ?4, pages_fetched = ?5
             WHERE id = ?6",
            params![
                Utc::now().to_rfc3339(),
                "completed",
                summary.items_scraped as i64,
                summary.max_items as i64,
                summary.pages_fetched as i64,
                self.run_id,
            ],
        )?;
        Ok(())
    }
}
