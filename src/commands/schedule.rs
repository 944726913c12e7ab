//! Long-running mode: one harvest per day at a configured local time.

use crate::commands::RunCommand;
use crate::config::Config;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveTime};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs the harvest daily until cancelled.
pub struct ScheduleCommand {
    config: Config,
}

impl ScheduleCommand {
    /// Creates a new schedule command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Sleeps until the configured time, runs, repeats.
    ///
    /// A failed run stops the scheduler: anything that aborts a run at
    /// startup (unreachable database, broken config) would abort every
    /// later run too, and a supervisor restart is more honest than a
    /// silent daily no-op. Failures of individual combinations do not
    /// fail the run and are only reported.
    pub async fn execute(&self, cancel: CancellationToken) -> Result<()> {
        let run_at = NaiveTime::parse_from_str(&self.config.schedule.run_at, "%H:%M")
            .with_context(|| format!("Invalid schedule time: {}", self.config.schedule.run_at))?;

        info!(run_at = %self.config.schedule.run_at, "scheduler started");

        loop {
            let wait = duration_until(run_at, Local::now());
            info!(wait_secs = wait.as_secs(), "sleeping until next run");

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("scheduler stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {}
            }

            let report = RunCommand::new(self.config.clone()).execute(cancel.clone()).await?;
            info!("{}", report.summary());

            if cancel.is_cancelled() {
                info!("scheduler stopped");
                return Ok(());
            }
        }
    }
}

/// Time until the next occurrence of `run_at` on the local clock: later
/// today if still ahead, otherwise tomorrow. Naive local arithmetic; a
/// DST change shifts one nominal gap by an hour, which a daily batch
/// job can live with.
fn duration_until(run_at: NaiveTime, now: DateTime<Local>) -> Duration {
    let today = now.date_naive().and_time(run_at);
    let next = if today > now.naive_local() { today } else { today + chrono::Duration::days(1) };
    (next - now.naive_local()).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn two_am() -> NaiveTime {
        NaiveTime::from_hms_opt(2, 0, 0).unwrap()
    }

    #[test]
    fn test_run_time_still_ahead_today() {
        let wait = duration_until(two_am(), local(2024, 3, 1, 1, 0, 0));
        assert_eq!(wait, Duration::from_secs(3600));
    }

    #[test]
    fn test_run_time_already_passed_waits_for_tomorrow() {
        let wait = duration_until(two_am(), local(2024, 3, 1, 3, 0, 0));
        assert_eq!(wait, Duration::from_secs(23 * 3600));
    }

    #[test]
    fn test_exactly_at_run_time_waits_a_full_day() {
        let wait = duration_until(two_am(), local(2024, 3, 1, 2, 0, 0));
        assert_eq!(wait, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_just_before_midnight() {
        let wait = duration_until(two_am(), local(2024, 3, 1, 23, 59, 30));
        assert_eq!(wait, Duration::from_secs(2 * 3600 + 30));
    }

    #[tokio::test]
    async fn test_unparseable_schedule_is_rejected() {
        let mut config = Config::default();
        config.schedule.run_at = "quarter past two".to_string();

        let err = ScheduleCommand::new(config)
            .execute(CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid schedule time"));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_the_wait() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        // Already-cancelled token: the scheduler must come straight back
        // instead of sleeping toward 02:00.
        let config = Config::default();
        ScheduleCommand::new(config).execute(cancel).await.unwrap();
    }
}
