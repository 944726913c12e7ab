//! valuation-harvester - Scheduled harvester for a municipal property
//! valuation portal
//!
//! Walks the portal's stateful WebForms search across every property
//! type and volume, and snapshots the results into PostgreSQL.

pub mod alert;
pub mod commands;
pub mod config;
pub mod error;
pub mod harvest;
pub mod portal;
pub mod store;

pub use config::Config;
pub use error::HarvestError;
pub use portal::models::{PropertyRecord, RawRecord, SearchCombination};
