//! Page renderer capability.
//!
//! The pipeline only depends on the extracted field shapes
//! ([`RawListing`]); how a page turns into those fields is the
//! source's business.

pub mod html;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::RawListing;

// Re-export for convenience
pub use html::HtmlSource;

/// One rendered search-results page.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Absolute listing URLs, in page order
    pub listing_urls: Vec<String>,

    /// Total posting count from the results banner, when present
    pub result_count: Option<String>,
}

/// Trait for listing sources.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the search-results page for the configured target.
    async fn search(&self) -> Result<SearchPage>;

    /// Fetch and extract one listing page.
    async fn fetch_listing(&self, url: &str) -> Result<RawListing>;
}
