//! Retry logic.
//!
//! # Responsibilities
//! - Merge a per-request retry policy with the strategy defaults
//! - Re-invoke a failing async operation up to the attempt budget
//! - Wait a linearly growing delay between attempts
//!
//! # Design Decisions
//! - Only the error of the last attempt is surfaced
//! - Delays are `tokio::time::sleep`, other tasks keep running
//! - Callers decide what is safe to retry by choosing the attempt count

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::backoff::linear_backoff;

/// Default number of attempts (no retry).
pub const DEFAULT_ATTEMPTS: u32 = 1;

/// Default base delay between attempts.
pub const DEFAULT_BACKOFF_MS: u64 = 200;

/// Per-request retry policy as it arrives on the wire.
///
/// Zero or missing values fall back to the strategy defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_ms: Option<u64>,
}

impl RetryPolicy {
    /// Policy with the given attempt budget and the default backoff.
    pub fn attempts(attempts: u32) -> Self {
        Self {
            attempts: Some(attempts),
            backoff_ms: None,
        }
    }

    /// Set the base backoff in milliseconds.
    pub fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = Some(backoff_ms);
        self
    }
}

/// Executes operations with retry and linear backoff.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    default_attempts: u32,
    default_backoff: Duration,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, Duration::from_millis(DEFAULT_BACKOFF_MS))
    }
}

impl RetryStrategy {
    pub fn new(default_attempts: u32, default_backoff: Duration) -> Self {
        Self {
            default_attempts: default_attempts.max(1),
            default_backoff,
        }
    }

    /// Resolve the attempt count and base backoff for a request.
    pub fn effective(&self, policy: Option<&RetryPolicy>) -> (u32, Duration) {
        let attempts = policy
            .and_then(|p| p.attempts)
            .filter(|attempts| *attempts > 0)
            .unwrap_or(self.default_attempts);
        let backoff = policy
            .and_then(|p| p.backoff_ms)
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(self.default_backoff);

        (attempts, backoff)
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    pub async fn execute<F, Fut, T, E>(
        &self,
        mut operation: F,
        policy: Option<&RetryPolicy>,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let (attempts, backoff) = self.effective(policy);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= attempts => return Err(error),
                Err(error) => {
                    let delay = linear_backoff(attempt, backoff);
                    tracing::debug!(
                        attempt,
                        max_attempts = attempts,
                        delay = ?delay,
                        error = %error,
                        "Retrying operation"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
