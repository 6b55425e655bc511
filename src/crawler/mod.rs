//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - The page transport seam and its HTTP implementation
//! - The shared frontier workers pull targets from
//! - Seed resolution from search terms and start URLs
//! - Overall crawl coordination under the item budget

mod coordinator;
mod fetcher;
mod frontier;
mod seeds;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, fetch_url, FetchResult, HttpFetcher, PageFetcher};
pub use frontier::{CrawlTarget, Frontier, InFlight};
pub use seeds::build_seeds;
