//! Run summary generation
//!
//! This module condenses the final crawl state into a [`RunSummary`] and
//! prints it at exit.

use crate::state::{CrawlState, PageOutcome};
use std::time::Duration;

/// End-of-run counters
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Records emitted
    pub items_scraped: usize,

    /// The requested item budget
    pub max_items: usize,

    /// Pages fetched, including failed fetches
    pub pages_fetched: usize,

    /// Fetches that failed or returned non-HTML
    pub fetch_failures: usize,

    /// Listing pages on which no strategy found entries
    pub empty_listings: usize,

    /// Targets skipped without a fetch, or whose result was dropped
    pub skipped: usize,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

impl RunSummary {
    /// A summary for a run that did nothing yet
    pub fn empty(max_items: usize, elapsed: Duration) -> Self {
        Self {
            items_scraped: 0,
            max_items,
            pages_fetched: 0,
            fetch_failures: 0,
            empty_listings: 0,
            skipped: 0,
            elapsed,
        }
    }

    /// Condenses the final crawl state
    pub fn from_state(state: &CrawlState, elapsed: Duration) -> Self {
        let sum = |pick: fn(&PageOutcome) -> bool| -> usize {
            PageOutcome::all()
                .iter()
                .filter(|outcome| pick(outcome))
                .map(|outcome| state.count(*outcome))
                .sum()
        };

        Self {
            items_scraped: state.items_scraped(),
            max_items: state.max_items(),
            pages_fetched: state.pages_fetched(),
            fetch_failures: sum(PageOutcome::is_error),
            empty_listings: state.count(PageOutcome::EmptyListing),
            skipped: sum(PageOutcome::is_skip),
            elapsed,
        }
    }

    /// Returns true if the run ended before the budget was met
    pub fn is_short(&self) -> bool {
        self.items_scraped < self.max_items
    }

    /// Items per second over the whole run
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.items_scraped as f64 / secs
        } else {
            0.0
        }
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Items:");
    println!(
        "  Scraped: {} / {} requested",
        summary.items_scraped, summary.max_items
    );
    if summary.is_short() {
        println!(
            "  Scraped fewer than requested ({} short)",
            summary.max_items - summary.items_scraped
        );
    }
    println!();

    println!("Pages:");
    println!("  Fetched: {}", summary.pages_fetched);
    println!("  Fetch failures: {}", summary.fetch_failures);
    println!("  Empty listings: {}", summary.empty_listings);
    println!("  Skipped: {}", summary.skipped);
    println!();

    println!(
        "Elapsed: {:.1}s ({:.2} items/sec)",
        summary.elapsed.as_secs_f64(),
        summary.rate()
    );
}
