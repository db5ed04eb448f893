//! Timeout enforcement.
//!
//! # Responsibilities
//! - Resolve the deadline for an outbound call
//! - Wrap the call so it is dropped (cancelled) when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; nothing outlives the wrapped future
//! - Timeout errors are distinct from other errors
//! - Timed-out requests map to 504 Gateway Timeout upstream

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Deadline applied when a request does not carry its own.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// The wrapped operation did not finish in time.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("operation timed out after {0:?}")]
pub struct TimedOut(pub Duration);

/// Resolve a request deadline, falling back to `default`.
pub fn request_timeout(timeout_ms: Option<u64>, default: Duration) -> Duration {
    timeout_ms.map(Duration::from_millis).unwrap_or(default)
}

/// Run `future` with a deadline.
pub async fn enforce<F>(deadline: Duration, future: F) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| TimedOut(deadline))
}
