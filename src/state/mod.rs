//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: Per-run budget, visited set, page cap and outcome counters
//! - `PageOutcome`: How each crawl target was resolved (scraped, skipped, failed, ...)

mod crawl_state;
mod outcome;

// Re-export main types
pub use crawl_state::{Claim, CrawlState};
pub use outcome::PageOutcome;
