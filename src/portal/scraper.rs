//! One-call harvesting of a single search combination.

use crate::config::PortalConfig;
use crate::error::HarvestError;
use crate::portal::client::{PortalClient, PortalHttp};
use crate::portal::models::{RawRecord, SearchCombination};
use crate::portal::navigator::FormNavigator;
use crate::portal::parser::ResultsParser;
use anyhow::Result;
use async_trait::async_trait;

/// The harvesting seam the run pipeline depends on. Implemented by the
/// real portal scraper and by canned scrapers in tests.
#[async_trait]
pub trait CombinationScraper: Send + Sync {
    /// Fetches all readable rows for one combination. An empty Vec is a
    /// valid outcome; volumes often hold nothing of a given type.
    async fn scrape(&self, combination: &SearchCombination)
        -> Result<Vec<RawRecord>, HarvestError>;
}

/// Scrapes the live portal: walks the form with a navigator, then
/// extracts the grid. The HTTP client is shared across combinations;
/// each combination still starts its own conversation from a fresh GET,
/// so no form state leaks between them.
pub struct PortalScraper<H: PortalHttp> {
    http: H,
    base_url: String,
}

impl PortalScraper<PortalClient> {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        Ok(Self { http: PortalClient::new(config)?, base_url: config.base_url.clone() })
    }
}

impl<H: PortalHttp> PortalScraper<H> {
    /// Builds a scraper over any transport, for tests.
    pub fn with_http(http: H, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }
}

#[async_trait]
impl<H: PortalHttp> CombinationScraper for PortalScraper<H> {
    async fn scrape(
        &self,
        combination: &SearchCombination,
    ) -> Result<Vec<RawRecord>, HarvestError> {
        let navigator = FormNavigator::new(&self.http, &self.base_url, combination);
        let html = navigator.results_page().await?;
        Ok(ResultsParser::extract(&html).records)
    }
}
