//! One-shot harvest run.

use crate::alert::{AlertSink, NoopAlerts, SmtpAlerts};
use crate::config::Config;
use crate::harvest::{CircuitBreaker, HarvestRunner, RunReport};
use crate::portal::scraper::{CombinationScraper, PortalScraper};
use crate::store::{PgStore, RecordStore};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Executes one full pass over the configured work set.
pub struct RunCommand {
    config: Config,
}

impl RunCommand {
    /// Creates a new run command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Builds the real pipeline and runs it once.
    ///
    /// Startup failures (bad config, unreachable database) abort the run
    /// with an error; failures of individual combinations are contained
    /// by the runner and land in the report instead.
    pub async fn execute(&self, cancel: CancellationToken) -> Result<RunReport> {
        if self.config.alerts.enabled {
            let alerts =
                SmtpAlerts::new(&self.config.alerts).context("Failed to configure alerting")?;
            self.execute_against(alerts, cancel).await
        } else {
            self.execute_against(NoopAlerts, cancel).await
        }
    }

    async fn execute_against<A: AlertSink>(
        &self,
        alerts: A,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let scraper =
            PortalScraper::new(&self.config.portal).context("Failed to create portal client")?;

        let store = match self.prepare_store().await {
            Ok(store) => store,
            Err(err) => {
                // The one failure worth waking someone for even before
                // any harvesting has happened.
                let body = format!("Run aborted before it started:\n{err:#}");
                alerts.notify("Harvest could not start", &body).await;
                return Err(err);
            }
        };

        Ok(self.execute_with(scraper, store, alerts, cancel).await)
    }

    async fn prepare_store(&self) -> Result<PgStore> {
        let store = PgStore::connect(&self.config.database.connection_url()).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Runs the pipeline over provided seams (for testing).
    pub async fn execute_with<S, R, A>(
        &self,
        scraper: S,
        store: R,
        alerts: A,
        cancel: CancellationToken,
    ) -> RunReport
    where
        S: CombinationScraper,
        R: RecordStore,
        A: AlertSink,
    {
        let combinations = self.config.portal.combinations();
        info!(
            property_types = self.config.portal.property_types.len(),
            volumes = combinations.len() / self.config.portal.property_types.len().max(1),
            "harvesting configured work set"
        );

        let breaker = CircuitBreaker::new(
            self.config.portal.breaker_threshold,
            Duration::from_secs(self.config.portal.breaker_recovery_secs),
        );

        HarvestRunner::new(scraper, store, alerts, breaker)
            .with_pacing(Duration::from_secs(self.config.portal.pace_secs))
            .with_cancellation(cancel)
            .run(&combinations)
            .await
    }
}
