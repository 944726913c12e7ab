//! Circuit breaker guarding the portal against retry storms.
//!
//! When the portal starts failing, hammering 178 combinations into it
//! one after another helps nobody. After a run of consecutive failures
//! the breaker opens and work is refused outright until a recovery
//! window has passed; then a single probe decides whether to resume.

use crate::error::HarvestError;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug)]
enum BreakerState {
    /// Normal operation, counting consecutive failures.
    Closed { failures: u32 },
    /// Tripped; refusing work until the recovery window passes.
    Open { since: Instant },
    /// One probe is in flight; everyone else is refused.
    HalfOpen,
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            state: Mutex::new(BreakerState::Closed { failures: 0 }),
        }
    }

    /// Runs `op` under the breaker's supervision.
    ///
    /// If the breaker is open the operation is not started at all and
    /// `CircuitOpen` comes back with the remaining wait. Otherwise the
    /// outcome of `op` feeds the failure count.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, HarvestError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, HarvestError>>,
    {
        self.admit()?;
        match op().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    /// Decides whether work may start right now.
    fn admit(&self) -> Result<(), HarvestError> {
        let mut state = self.lock();
        match *state {
            BreakerState::Closed { .. } => Ok(()),
            BreakerState::Open { since } => {
                let elapsed = since.elapsed();
                if elapsed >= self.recovery_timeout {
                    info!("recovery window passed, admitting one probe");
                    *state = BreakerState::HalfOpen;
                    Ok(())
                } else {
                    let remaining = self.recovery_timeout - elapsed;
                    Err(HarvestError::CircuitOpen { remaining_secs: remaining.as_secs() })
                }
            }
            BreakerState::HalfOpen => Err(HarvestError::CircuitOpen { remaining_secs: 0 }),
        }
    }

    fn record_success(&self) {
        let mut state = self.lock();
        if !matches!(*state, BreakerState::Closed { failures: 0 }) {
            if matches!(*state, BreakerState::HalfOpen) {
                info!("probe succeeded, circuit closed");
            }
            *state = BreakerState::Closed { failures: 0 };
        }
    }

    fn record_failure(&self) {
        let mut state = self.lock();
        match *state {
            BreakerState::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.failure_threshold {
                    warn!(failures, "circuit opened after consecutive failures");
                    *state = BreakerState::Open { since: Instant::now() };
                } else {
                    *state = BreakerState::Closed { failures };
                }
            }
            BreakerState::HalfOpen => {
                warn!("probe failed, circuit re-opened");
                *state = BreakerState::Open { since: Instant::now() };
            }
            BreakerState::Open { .. } => {}
        }
    }

    /// A poisoned lock only means another thread panicked mid-update;
    /// the state itself is a plain enum and stays usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
