//! The harvest pipeline: walks the work set combination by combination,
//! normalizes and stores what comes back, and keeps score for the run.

use crate::alert::AlertSink;
use crate::error::{HarvestError, SelectControl};
use crate::harvest::breaker::CircuitBreaker;
use crate::harvest::normalizer::normalize_batch;
use crate::portal::models::SearchCombination;
use crate::portal::scraper::CombinationScraper;
use crate::store::RecordStore;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What one run did, for the log line and the failure alert.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Size of the work set handed to the run.
    pub combinations: usize,
    /// Rows written to storage across all combinations.
    pub stored_records: u64,
    /// Combinations that produced nothing, including volumes the portal
    /// does not currently list.
    pub empty: usize,
    /// Combinations refused by the open circuit.
    pub skipped: usize,
    /// One line per failed combination.
    pub failures: Vec<String>,
    /// True when the run was stopped before reaching the end.
    pub cancelled: bool,
}

impl RunReport {
    fn new(combinations: usize) -> Self {
        Self { combinations, ..Default::default() }
    }

    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} combinations: {} records stored, {} empty, {} skipped, {} failed",
            self.combinations,
            self.stored_records,
            self.empty,
            self.skipped,
            self.failures.len()
        );
        if self.cancelled {
            summary.push_str(" (cancelled before completion)");
        }
        for failure in &self.failures {
            summary.push_str("\n  ");
            summary.push_str(failure);
        }
        summary
    }
}

/// How one combination ended, once benign outcomes are told apart from
/// real failures.
enum HarvestOutcome {
    Stored(u64),
    Empty,
    VolumeAbsent,
}

/// Drives a full run over injected scraper, store and alert seams.
pub struct HarvestRunner<S, R, A> {
    scraper: S,
    store: R,
    alerts: A,
    breaker: CircuitBreaker,
    pacing: Duration,
    cancel: CancellationToken,
}

impl<S, R, A> HarvestRunner<S, R, A>
where
    S: CombinationScraper,
    R: RecordStore,
    A: AlertSink,
{
    pub fn new(scraper: S, store: R, alerts: A, breaker: CircuitBreaker) -> Self {
        Self {
            scraper,
            store,
            alerts,
            breaker,
            pacing: Duration::from_secs(5),
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the pause between consecutive combinations.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Attaches a shutdown token; the run stops at the next boundary
    /// once it fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Processes the work set in order. One combination's failure is
    /// recorded and the run moves on; only the open circuit or a
    /// cancellation cuts the run short.
    pub async fn run(&self, combinations: &[SearchCombination]) -> RunReport {
        let mut report = RunReport::new(combinations.len());
        info!(combinations = combinations.len(), "starting harvest run");

        for (index, combination) in combinations.iter().enumerate() {
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                outcome = self.breaker.call(|| self.harvest_one(combination)) => outcome,
            };

            match outcome {
                Ok(HarvestOutcome::Stored(count)) => {
                    info!(combination = %combination, records = count, "combination stored");
                    report.stored_records += count;
                }
                Ok(HarvestOutcome::Empty) => {
                    debug!(combination = %combination, "no records for combination");
                    report.empty += 1;
                }
                Ok(HarvestOutcome::VolumeAbsent) => {
                    debug!(combination = %combination, "volume not listed this cycle");
                    report.empty += 1;
                }
                Err(HarvestError::CircuitOpen { remaining_secs }) => {
                    warn!(
                        combination = %combination,
                        remaining_secs,
                        "circuit open, skipping combination"
                    );
                    report.skipped += 1;
                }
                Err(err) => {
                    error!(combination = %combination, error = %err, "combination failed");
                    if err.should_alert() {
                        let body = format!("Combination {combination} failed:\n{err}");
                        self.alerts.notify("Harvest failure", &body).await;
                    }
                    report.failures.push(format!("{combination}: {err}"));
                }
            }

            if index + 1 < combinations.len() && !self.pause().await {
                report.cancelled = true;
                break;
            }
        }

        if report.failed() {
            let body = format!("Run finished with failures.\n\n{}", report.summary());
            self.alerts.notify("Harvest run completed with failures", &body).await;
        }
        info!("{}", report.summary());
        report
    }

    /// Scrape, normalize and store one combination.
    ///
    /// A volume the portal does not list is a benign outcome, not a
    /// failure; the portal's volume list genuinely shifts between
    /// cycles and the breaker must not trip over it.
    async fn harvest_one(
        &self,
        combination: &SearchCombination,
    ) -> Result<HarvestOutcome, HarvestError> {
        let raws = match self.scraper.scrape(combination).await {
            Ok(raws) => raws,
            Err(HarvestError::OptionNotFound { control: SelectControl::Volume, option }) => {
                debug!(combination = %combination, volume = %option, "volume absent from portal");
                return Ok(HarvestOutcome::VolumeAbsent);
            }
            Err(err) => return Err(err),
        };

        if raws.is_empty() {
            return Ok(HarvestOutcome::Empty);
        }

        let total = raws.len();
        let (records, dropped) = normalize_batch(raws, combination);
        if !dropped.is_empty() {
            warn!(
                combination = %combination,
                dropped = dropped.len(),
                of = total,
                "rows failed validation"
            );
        }
        if records.is_empty() {
            return Ok(HarvestOutcome::Empty);
        }

        let stored = self.store.store_batch(&records).await?;
        Ok(HarvestOutcome::Stored(stored))
    }

    /// Waits out the pacing gap; false means the run was cancelled.
    async fn pause(&self) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.pacing) => true,
        }
    }
}
