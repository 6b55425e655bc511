/// Page outcome definitions for tracking crawl progress
///
/// Every target taken off the frontier ends in exactly one of these outcomes.
use std::fmt;

/// How a crawl target was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageOutcome {
    // ===== Success =====
    /// Product page fetched and a record emitted
    Scraped,

    /// Listing page fetched and at least one entry found
    ListingExpanded,

    // ===== Soft misses =====
    /// Listing page fetched but no strategy found entries
    EmptyListing,

    // ===== Skips =====
    /// URL already visited in this run
    AlreadyVisited,

    /// Product target that re-classified as a non-product page
    Excluded,

    /// Result arrived after the item budget was met and was dropped
    OverBudget,

    /// Total page cap reached before the fetch
    PageCapReached,

    // ===== Errors =====
    /// Network failure or non-success HTTP status
    FetchFailed,

    /// Response was not HTML
    ContentMismatch,
}

impl PageOutcome {
    /// Returns true if the page contributed to the run
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Scraped | Self::ListingExpanded)
    }

    /// Returns true if the target was never fetched or its result was discarded
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::AlreadyVisited | Self::Excluded | Self::OverBudget | Self::PageCapReached
        )
    }

    /// Returns true if the fetch itself failed
    pub fn is_error(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::ContentMismatch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scraped => "scraped",
            Self::ListingExpanded => "listing_expanded",
            Self::EmptyListing => "empty_listing",
            Self::AlreadyVisited => "already_visited",
            Self::Excluded => "excluded",
            Self::OverBudget => "over_budget",
            Self::PageCapReached => "page_cap_reached",
            Self::FetchFailed => "fetch_failed",
            Self::ContentMismatch => "content_mismatch",
        }
    }

    /// Returns all possible outcomes
    pub fn all() -> [Self; 9] {
        [
            Self::Scraped,
            Self::ListingExpanded,
            Self::EmptyListing,
            Self::AlreadyVisited,
            Self::Excluded,
            Self::OverBudget,
            Self::PageCapReached,
            Self::FetchFailed,
            Self::ContentMismatch,
        ]
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
