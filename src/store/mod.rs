//! Persistence of harvested records.

pub mod postgres;

use crate::error::HarvestError;
use crate::portal::models::PropertyRecord;
use async_trait::async_trait;

pub use postgres::PgStore;

/// Storage seam for the run pipeline.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persists one combination's records as a unit, stamping every row
    /// with the batch's capture date. All rows land or none do.
    ///
    /// Returns the number of rows written.
    async fn store_batch(&self, records: &[PropertyRecord]) -> Result<u64, HarvestError>;
}
