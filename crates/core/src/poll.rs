//! Bounded polling for remote jobs.
//!
//! Every external job (transcripts, task executions) is observed by calling a
//! status endpoint until it reaches a terminal state. [`poll_until`] drives that
//! loop with a [`PollPolicy`]: exponential backoff, optional jitter, a per-wait
//! ceiling and a hard limit on attempts.

use std::{future::Future, time::Duration};

use rand::Rng;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    pub max_attempts: u32,
    /// Fraction of each wait that may be randomly shaved off, in `0.0..=1.0`.
    pub jitter: f64,
}

impl PollPolicy {
    pub fn transcription() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(30),
            multiplier: 1.5,
            max_attempts: 360,
            jitter: 0.2,
        }
    }

    pub fn analysis() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 1.5,
            max_attempts: 600,
            jitter: 0.2,
        }
    }

    /// Fixed interval, no jitter.
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
            max_attempts,
            jitter: 0.0,
        }
    }

    /// Wait before the poll following `attempt` (zero based), before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let secs = self.initial_interval.as_secs_f64() * factor;
        let capped = secs.min(self.max_interval.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.backoff(attempt);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || base.is_zero() {
            return base;
        }
        let shave = rand::rng().random_range(0.0..=jitter);
        base.mul_f64(1.0 - shave)
    }
}

/// Outcome of a single status check.
pub enum Attempt<T> {
    Ready(T),
    Pending(String),
}

/// Calls `check` until it returns [`Attempt::Ready`] or an error.
///
/// Errors from `check` end the loop immediately; terminal failures reported
/// by the service are expected to come back that way.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, what: &str, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>>>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 0..attempts {
        match check().await? {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Pending(status) => {
                if attempt + 1 == attempts {
                    break;
                }
                let wait = policy.delay(attempt);
                debug!(what, %status, attempt, wait_ms = wait.as_millis() as u64, "still pending");
                sleep(wait).await;
            }
        }
    }

    Err(Error::PollTimeout {
        what: what.to_string(),
        attempts,
    })
}
