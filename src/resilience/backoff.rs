//! Linear backoff between retry attempts.

use std::time::Duration;

/// Delay to wait after the given (1-based) failed attempt.
///
/// The delay grows linearly: `base * attempt`. Attempt 0 never waits.
pub fn linear_backoff(attempt: u32, base: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    base.saturating_mul(attempt)
}
