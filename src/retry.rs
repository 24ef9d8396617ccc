//! Bounded retry with exponential backoff and jitter for transient service failures.
//!
//! The delay before retry `n` (1-based) is
//! `min(base_delay * 2^(n-1), max_delay) + random(0..=jitter)`.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use log::{error, warn};
use rand::{Rng, rng};
use tokio::time::sleep;

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub enum Attempt<E> {
    /// Worth retrying: timeouts, connection resets, throttling, server errors.
    Transient(E),
    /// Retrying cannot help: bad credentials, rejected request, malformed data.
    Fatal(E),
}

/// How often and how patiently an operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng().random_range(0..=max_ms))
    }
}

/// Runs `operation` until it succeeds, fails fatally, or exhausts `policy`.
///
/// `label` identifies the operation in log lines.
///
/// # Errors
///
/// Returns the error of the last attempt when it was fatal or when no retries remain.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, label: &str, mut operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
{
    let started = Instant::now();
    let mut attempt = 0_u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(Attempt::Fatal(err)) => return Err(err),
            Err(Attempt::Transient(err)) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    error!(
                        "{label} failed after {attempt} attempts in {:?}: {err}",
                        started.elapsed()
                    );
                    return Err(err);
                }

                let delay = policy.backoff(attempt) + policy.jitter();
                warn!(
                    "{label} attempt {attempt}/{} failed, retrying in {delay:?}: {err}",
                    policy.max_retries
                );
                sleep(delay).await;
            }
        }
    }
}
