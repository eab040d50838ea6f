//! Bounded retry for read requests.

use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::debug;

use crate::api::ApiError;

/// How often and how patiently to repeat a failed read.
///
/// The delay shrinks linearly: after attempt `n` of `attempts` the caller
/// waits `initial_delay × (attempts - n) / attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,

    /// Delay after the first failure
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Try once and never retry.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            attempts: 1,
            initial_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after attempt `attempt` (1-based) failed.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let attempts = self.attempts.max(1);
        let remaining = attempts.saturating_sub(attempt);

        self.initial_delay
            .checked_mul(remaining)
            .and_then(|delay| delay.checked_div(attempts))
            .unwrap_or(Duration::ZERO)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts.
///
/// # Errors
///
/// Returns the last error `operation` produced.
pub async fn with_backoff<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < attempts => {
                let delay = policy.delay_after(attempt);

                debug!(attempt, attempts, ?delay, "retrying request: {error}");

                sleep(delay).await;

                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
