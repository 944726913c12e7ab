//! Database bootstrap command.

use crate::config::Config;
use crate::store::PgStore;
use anyhow::Result;
use tracing::info;

/// Creates the schema without running a harvest.
pub struct InitDbCommand {
    config: Config,
}

impl InitDbCommand {
    /// Creates a new init-db command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Connects and applies the schema. Safe to run repeatedly; existing
    /// tables are left alone.
    pub async fn execute(&self) -> Result<()> {
        let store = PgStore::connect(&self.config.database.connection_url()).await?;
        store.migrate().await?;
        info!("database ready");
        Ok(())
    }
}
