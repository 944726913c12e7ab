//! PostgreSQL-backed record store.
//!
//! Storage is append-only: every run writes fresh rows stamped with that
//! run's capture date, so the table accumulates a daily history of the
//! register rather than a mutable mirror of it.

use crate::error::HarvestError;
use crate::portal::models::PropertyRecord;
use crate::store::RecordStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, info};

const CREATE_PROPERTIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS properties (
    id             BIGSERIAL PRIMARY KEY,
    property_type  TEXT NOT NULL,
    volume_no      TEXT NOT NULL,
    description    TEXT NOT NULL,
    street_address TEXT NOT NULL,
    extent         NUMERIC(14, 2) NOT NULL,
    market_value   NUMERIC(14, 2) NOT NULL,
    captured_on    DATE NOT NULL
)
"#;

const CREATE_CAPTURE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_properties_type_volume_date
    ON properties (property_type, volume_no, captured_on)
"#;

const INSERT_RECORD: &str = r#"
INSERT INTO properties
    (property_type, volume_no, description, street_address, extent, market_value, captured_on)
VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Opens a small connection pool against the given database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    /// Wraps an existing pool, for tests.
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the properties table and its lookup index if they are not
    /// there yet. Safe to run on every start.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_PROPERTIES_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create properties table")?;
        sqlx::query(CREATE_CAPTURE_INDEX)
            .execute(&self.pool)
            .await
            .context("Failed to create capture index")?;

        info!("database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn store_batch(&self, records: &[PropertyRecord]) -> Result<u64, HarvestError> {
        if records.is_empty() {
            return Ok(0);
        }

        // One wall-clock date for the whole batch, taken when it lands.
        let captured_on = Local::now().date_naive();

        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        for record in records {
            sqlx::query(INSERT_RECORD)
                .bind(&record.property_type)
                .bind(&record.volume_no)
                .bind(&record.description)
                .bind(&record.street_address)
                .bind(record.extent)
                .bind(record.market_value)
                .bind(captured_on)
                .execute(&mut *tx)
                .await
                .map_err(storage_err)?;
        }
        tx.commit().await.map_err(storage_err)?;

        debug!(rows = records.len(), %captured_on, "batch committed");
        Ok(records.len() as u64)
    }
}

fn storage_err(err: sqlx::Error) -> HarvestError {
    HarvestError::Storage(err.to_string())
}
