use crate::state::PageOutcome;
use std::collections::{HashMap, HashSet};

/// Answer to a request for one unit of the item budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns the URL and may proceed
    Granted,

    /// The URL was already visited in this run
    AlreadyVisited,

    /// The item budget is already met
    BudgetMet,
}

/// Mutable state of one crawl run
///
/// All keys are normalized URL keys (see [`crate::url::normalize_to_key`]).
/// The coordinator keeps this behind a single mutex; each method is one
/// atomic check-and-update, so holding the lock for one call is enough to
/// keep `items_scraped <= max_items` under any number of workers.
#[derive(Debug)]
pub struct CrawlState {
    max_items: usize,
    max_pages: usize,

    /// Records emitted so far
    items_scraped: usize,

    /// Pages fetched so far, including failures
    pages_fetched: usize,

    /// Product URLs that were fetched or emitted
    visited: HashSet<String>,

    /// Listing URLs that were expanded
    seen_listings: HashSet<String>,

    outcomes: HashMap<PageOutcome, usize>,
}

impl CrawlState {
    /// Creates the state for a run emitting at most `max_items` records and
    /// fetching at most `max_pages` pages
    pub fn new(max_items: usize, max_pages: usize) -> Self {
        Self {
            max_items,
            max_pages,
            items_scraped: 0,
            pages_fetched: 0,
            visited: HashSet::new(),
            seen_listings: HashSet::new(),
            outcomes: HashMap::new(),
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn items_scraped(&self) -> usize {
        self.items_scraped
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn budget_met(&self) -> bool {
        self.items_scraped >= self.max_items
    }

    /// Items still allowed before the budget is met
    pub fn remaining(&self) -> usize {
        self.max_items.saturating_sub(self.items_scraped)
    }

    pub fn is_visited(&self, key: &str) -> bool {
        self.visited.contains(key)
    }

    /// Marks a product URL visited ahead of its fetch
    ///
    /// The budget is not consumed here; see [`CrawlState::record_item`].
    pub fn begin_product(&mut self, key: &str) -> Claim {
        if self.budget_met() {
            return Claim::BudgetMet;
        }
        if !self.visited.insert(key.to_string()) {
            return Claim::AlreadyVisited;
        }
        Claim::Granted
    }

    /// Consumes one unit of budget for a fetched product page
    ///
    /// Returns the record's 1-based ordinal, or None if the budget filled up
    /// while the page was in flight.
    pub fn record_item(&mut self) -> Option<usize> {
        if self.budget_met() {
            return None;
        }
        self.items_scraped += 1;
        Some(self.items_scraped)
    }

    /// Claims a listing entry: marks it visited and consumes one unit of budget
    ///
    /// On [`Claim::Granted`] the item is already counted.
    pub fn claim_entry(&mut self, key: &str) -> Claim {
        if self.budget_met() {
            return Claim::BudgetMet;
        }
        if !self.visited.insert(key.to_string()) {
            return Claim::AlreadyVisited;
        }
        self.items_scraped += 1;
        Claim::Granted
    }

    /// Gives back one unit of budget for a record that was never written
    ///
    /// The URL stays visited.
    pub fn release_item(&mut self) {
        self.items_scraped = self.items_scraped.saturating_sub(1);
    }

    /// Marks a listing page as expanded; false if it already was
    pub fn mark_listing(&mut self, key: &str) -> bool {
        self.seen_listings.insert(key.to_string())
    }

    /// Counts one page fetch against the page cap; false if the cap is reached
    pub fn try_start_fetch(&mut self) -> bool {
        if self.pages_fetched >= self.max_pages {
            return false;
        }
        self.pages_fetched += 1;
        true
    }

    /// Records how a target was resolved
    pub fn record(&mut self, outcome: PageOutcome) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
    }

    /// Number of targets resolved with the given outcome
    pub fn count(&self, outcome: PageOutcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }
}
