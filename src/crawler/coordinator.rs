//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker loop that coordinates all aspects of
//! the crawling process, including:
//! - Pulling labeled targets from the shared frontier
//! - Product pages: fetch, extract, emit
//! - Listing pages: extract entries, emit shallow records, follow pagination
//! - Enforcing the item budget and page cap across workers
//! - Producing the run summary

use crate::config::{Config, DEFAULT_CONCURRENCY, DEFAULT_MAX_ITEMS, MAX_CONCURRENCY, PAGES_PER_ITEM};
use crate::crawler::fetcher::{FetchResult, HttpFetcher, PageFetcher};
use crate::crawler::frontier::{CrawlTarget, Frontier};
use crate::crawler::seeds::build_seeds;
use crate::extract::{
    extract_description, extract_listing, extract_product, listing_diagnostics, next_page,
    ListingEntry, DESCRIPTION_REVEAL, RENDERED_CASCADE, STATIC_CASCADE,
};
use crate::output::{ProductRecord, RecordSink, RunSummary};
use crate::state::{Claim, CrawlState, PageOutcome};
use crate::url::{classify, normalize_to_key, PageLabel, Site};
use crate::{HarvestError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::task::JoinSet;
use url::Url;

/// Listing entries logged with their classification on every listing page
const SAMPLE_ENTRIES: usize = 3;

/// Main crawler coordinator structure
///
/// Holds the run settings and collaborators; every call to
/// [`Coordinator::run`] starts from a fresh [`CrawlState`].
pub struct Coordinator {
    site: Site,
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn RecordSink>,
    max_items: usize,
    max_pages: Option<usize>,
    concurrency: usize,
}

impl Coordinator {
    /// Creates a coordinator with default limits
    ///
    /// # Arguments
    ///
    /// * `site` - The catalog being crawled
    /// * `fetcher` - Page transport
    /// * `sink` - Receives every emitted record
    pub fn new(site: Site, fetcher: Arc<dyn PageFetcher>, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            site,
            fetcher,
            sink,
            max_items: DEFAULT_MAX_ITEMS,
            max_pages: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Creates a coordinator with the site and limits of a loaded configuration
    pub fn from_config(config: &Config, fetcher: Arc<dyn PageFetcher>, sink: Arc<dyn RecordSink>) -> Self {
        let mut coordinator = Self::new(config.site.site(), fetcher, sink)
            .with_max_items(config.crawl.max_items)
            .with_concurrency(config.crawl.concurrency);
        coordinator.max_pages = config.crawl.max_pages;
        coordinator
    }

    /// Sets the item budget
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.max(1);
        self
    }

    /// Sets the hard cap on pages fetched (default: `max_items * 5`)
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages.max(1));
        self
    }

    /// Sets the number of workers; 1 runs the crawl sequentially
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// The page cap in effect
    pub fn max_pages(&self) -> usize {
        self.max_pages
            .unwrap_or_else(|| self.max_items.saturating_mul(PAGES_PER_ITEM))
    }

    /// Runs the crawl until the budget is met or the frontier is exhausted
    ///
    /// Fetch failures and extraction misses only skip the page concerned. A
    /// sink write failure stops all workers and is returned, after the sink
    /// has been finalized with what was written.
    pub async fn run(&self, seeds: Vec<CrawlTarget>) -> Result<RunSummary> {
        let started = Instant::now();

        tracing::info!(
            "Starting crawl with {} seeds, max_items={}, concurrency={}, max_pages={}",
            seeds.len(),
            self.max_items,
            self.concurrency,
            self.max_pages()
        );

        let context = Arc::new(CrawlContext {
            site: self.site.clone(),
            fetcher: Arc::clone(&self.fetcher),
            sink: Arc::clone(&self.sink),
            max_items: self.max_items,
            state: Mutex::new(CrawlState::new(self.max_items, self.max_pages())),
            frontier: Frontier::new(seeds),
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..self.concurrency {
            workers.spawn(run_worker(Arc::clone(&context), worker_id));
        }

        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            let outcome = joined
                .map_err(|e| HarvestError::Worker(e.to_string()))
                .and_then(|result| result);
            if let Err(e) = outcome {
                context.frontier.close();
                first_error.get_or_insert(e);
            }
        }

        let summary = {
            let state = context.lock_state();
            RunSummary::from_state(&state, started.elapsed())
        };
        self.sink.finalize(&summary)?;

        if let Some(e) = first_error {
            return Err(e);
        }

        if summary.is_short() {
            tracing::warn!(
                "Scraped fewer than requested: {}/{} products",
                summary.items_scraped,
                summary.max_items
            );
        }
        tracing::info!(
            "Scraping completed. Total products scraped: {} ({} pages fetched in {:?})",
            summary.items_scraped,
            summary.pages_fetched,
            summary.elapsed
        );

        Ok(summary)
    }
}

/// Runs a complete crawl from configuration over HTTP
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::load_config;
/// use catalog_harvest::crawler::run_crawl;
/// use catalog_harvest::output::MemorySink;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let sink = Arc::new(MemorySink::new());
/// let summary = run_crawl(&config, sink.clone()).await?;
/// println!("{} records", summary.items_scraped);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config, sink: Arc<dyn RecordSink>) -> Result<RunSummary> {
    let site = config.site.site();
    let seeds = build_seeds(&config.crawl.search_terms, &config.crawl.start_urls, &site)?;
    let fetcher = Arc::new(HttpFetcher::from_config(&config.fetch)?);
    Coordinator::from_config(config, fetcher, sink).run(seeds).await
}

/// State shared by all workers of one run
struct CrawlContext {
    site: Site,
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn RecordSink>,
    max_items: usize,
    state: Mutex<CrawlState>,
    frontier: Frontier,
}

async fn run_worker(context: Arc<CrawlContext>, worker_id: usize) -> Result<()> {
    tracing::debug!("Worker {} started", worker_id);

    while let Some(in_flight) = context.frontier.next().await {
        if context.budget_met() {
            context.frontier.close();
            break;
        }

        let target = in_flight.target().clone();
        let result = match target.label {
            PageLabel::Product => context.process_product(&target).await,
            PageLabel::Search | PageLabel::Category => context.process_listing(&target).await,
        };
        drop(in_flight);

        if let Err(e) = result {
            tracing::error!("Worker {} stopping on {}: {}", worker_id, target.url, e);
            context.frontier.close();
            return Err(e);
        }

        if context.budget_met() {
            context.frontier.close();
        }
    }

    tracing::debug!("Worker {} finished", worker_id);
    Ok(())
}

impl CrawlContext {
    fn lock_state(&self) -> MutexGuard<'_, CrawlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn budget_met(&self) -> bool {
        self.lock_state().budget_met()
    }

    fn record(&self, outcome: PageOutcome) {
        self.lock_state().record(outcome);
    }

    /// Fetches a product detail page and emits a full record
    async fn process_product(&self, target: &CrawlTarget) -> Result<()> {
        let url = target.url.as_str();

        let classification = classify(url, &self.site);
        if !classification.is_product() {
            tracing::info!(
                "Skipping non-product URL in product handler: {} ({:?})",
                url,
                classification
            );
            self.record(PageOutcome::Excluded);
            return Ok(());
        }

        let key = match normalize_to_key(url) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Skipping product {}: {}", url, e);
                self.record(PageOutcome::Excluded);
                return Ok(());
            }
        };

        let claim = self.lock_state().begin_product(&key);
        match claim {
            Claim::Granted => {}
            Claim::AlreadyVisited => {
                tracing::info!("Skipping duplicate product: {}", key);
                self.record(PageOutcome::AlreadyVisited);
                return Ok(());
            }
            Claim::BudgetMet => return Ok(()),
        }

        let Some((final_url, markup)) = self.fetch_page(url).await else {
            return Ok(());
        };
        let base_url = Url::parse(&final_url).or_else(|_| Url::parse(url))?;

        let mut fields = extract_product(&markup, &base_url);
        if fields.name.is_none() {
            tracing::warn!("Title not found for {}", url);
        }
        if fields.description.is_none() {
            if let Some(revealed) = self.fetcher.reveal(url, &DESCRIPTION_REVEAL).await {
                fields.description = extract_description(&revealed);
            }
        }

        let record = ProductRecord::from_product_page(key, fields);
        let ordinal = self.lock_state().record_item();
        match ordinal {
            Some(n) => {
                self.push_record(&record)?;
                self.record(PageOutcome::Scraped);
                tracing::info!("Scraped {}/{} products: {}", n, self.max_items, record.url);
            }
            None => {
                tracing::debug!("Budget met while {} was in flight, dropping it", record.url);
                self.record(PageOutcome::OverBudget);
            }
        }

        Ok(())
    }

    /// Expands a search or category page and follows its pagination
    async fn process_listing(&self, target: &CrawlTarget) -> Result<()> {
        let url = target.url.as_str();
        let label = target.label;

        let key = normalize_to_key(url).unwrap_or_else(|_| url.to_string());
        let first_visit = self.lock_state().mark_listing(&key);
        if !first_visit {
            tracing::info!("Skipping already processed {} page: {}", label, url);
            self.record(PageOutcome::AlreadyVisited);
            return Ok(());
        }

        tracing::info!("Processing {} page: {}", label, url);

        let Some((final_url, markup)) = self.fetch_page(url).await else {
            return Ok(());
        };
        let base_url = Url::parse(&final_url).or_else(|_| Url::parse(url))?;

        let cascade = if self.fetcher.renders_dom() {
            RENDERED_CASCADE
        } else {
            STATIC_CASCADE
        };
        let entries = extract_listing(&markup, &base_url, &self.site, cascade);

        if entries.is_empty() {
            self.record(PageOutcome::EmptyListing);
            let diagnostics = listing_diagnostics(&markup, &base_url, &self.site);
            tracing::warn!("No products found on {} page {}", label, url);
            tracing::info!("Page body preview: {}", diagnostics.text_preview);
            tracing::info!(
                "Links on page: {} same-site, samples: {:?}",
                diagnostics.site_links,
                diagnostics.link_samples
            );
        } else {
            self.record(PageOutcome::ListingExpanded);
            tracing::info!("Found {} products on {} page", entries.len(), label);
            self.log_samples(&entries);
            self.emit_entries(&entries, label)?;
        }

        if self.budget_met() {
            return Ok(());
        }

        match next_page(&markup, &base_url) {
            Some(next) if self.site.contains_str(&next) => {
                if self.frontier.push(CrawlTarget::new(next.clone(), label)) {
                    tracing::info!("Enqueued next {} page: {}", label, next);
                }
            }
            Some(next) => tracing::debug!("Ignoring off-site next page {}", next),
            None => tracing::debug!("No next page on {}", url),
        }

        Ok(())
    }

    /// Emits shallow records for the product entries of a listing page
    fn emit_entries(&self, entries: &[ListingEntry], label: PageLabel) -> Result<()> {
        let mut skipped: Vec<&str> = Vec::new();

        for entry in entries {
            if !classify(&entry.url, &self.site).is_product() {
                skipped.push(&entry.url);
                continue;
            }
            let Ok(key) = normalize_to_key(&entry.url) else {
                skipped.push(&entry.url);
                continue;
            };

            let (claim, scraped) = {
                let mut state = self.lock_state();
                let claim = state.claim_entry(&key);
                (claim, state.items_scraped())
            };

            match claim {
                Claim::Granted => {
                    let mut record = ProductRecord::from_listing(entry);
                    record.url = key;
                    self.push_record(&record)?;
                    tracing::info!(
                        "Scraped {}/{} products (from {} listing)",
                        scraped,
                        self.max_items,
                        label
                    );
                }
                Claim::AlreadyVisited => continue,
                Claim::BudgetMet => break,
            }
        }

        if !skipped.is_empty() {
            tracing::info!(
                "Skipped {} non-product URLs, samples: {:?}",
                skipped.len(),
                &skipped[..skipped.len().min(SAMPLE_ENTRIES)]
            );
        }

        Ok(())
    }

    /// Writes a record whose budget unit is already taken
    ///
    /// On failure the unit is given back, so the summary only counts records
    /// that reached the sink.
    fn push_record(&self, record: &ProductRecord) -> Result<()> {
        if let Err(e) = self.sink.push(record) {
            self.lock_state().release_item();
            return Err(e.into());
        }
        Ok(())
    }

    fn log_samples(&self, entries: &[ListingEntry]) {
        for entry in entries.iter().take(SAMPLE_ENTRIES) {
            tracing::info!(
                "  Sample URL: {} -> {:?}",
                entry.url,
                classify(&entry.url, &self.site)
            );
        }
    }

    /// Fetches a page under the page cap; None if it was not fetched or failed
    ///
    /// Returns the final URL (after redirects) and the markup.
    async fn fetch_page(&self, url: &str) -> Option<(String, String)> {
        if !self.lock_state().try_start_fetch() {
            tracing::warn!("Page cap reached, not fetching {}", url);
            self.record(PageOutcome::PageCapReached);
            self.frontier.close();
            return None;
        }

        let result = self.fetcher.fetch(url).await;
        if !result.succeeded() {
            let outcome = match result {
                FetchResult::ContentMismatch { .. } => PageOutcome::ContentMismatch,
                _ => PageOutcome::FetchFailed,
            };
            tracing::warn!(
                "Failed to fetch {}: {}",
                url,
                result.failure_reason().unwrap_or_default()
            );
            self.record(outcome);
            return None;
        }

        let final_url = result.final_url().unwrap_or(url).to_string();
        result.into_markup().map(|markup| (final_url, markup))
    }
}
