//! Everything that talks to or understands the valuation portal:
//! transport, postback navigation, form state, and grid extraction.

pub mod client;
pub mod forms;
pub mod models;
pub mod navigator;
pub mod parser;
pub mod scraper;
pub mod selectors;

pub use client::{PortalClient, PortalHttp};
pub use models::{PropertyRecord, RawRecord, SearchCombination};
pub use navigator::{FormNavigator, NavState};
pub use parser::{ExtractedRows, ResultsParser};
pub use scraper::{CombinationScraper, PortalScraper};
