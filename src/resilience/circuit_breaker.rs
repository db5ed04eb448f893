//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: downstream assumed down, requests fail fast
//! - Half-Open: a limited number of trial requests are admitted
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first request after the cooldown elapsed
//! Half-Open → Closed: any success
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - One breaker per proxy instance, shared by every destination
//! - A single success closes the breaker completely
//! - State lives behind a mutex; it is never held across an await

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Breaker tuning. Accepts camelCase on the wire and snake_case in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircuitBreakerOptions {
    /// Consecutive failures before the breaker opens.
    #[serde(alias = "failure_threshold")]
    pub failure_threshold: u32,

    /// How long the breaker stays open before admitting a trial request.
    #[serde(alias = "cooldown_ms")]
    pub cooldown_ms: u64,

    /// Trial requests admitted while half-open.
    #[serde(alias = "half_open_attempts")]
    pub half_open_attempts: u32,
}

impl Default for CircuitBreakerOptions {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_ms: 5_000,
            half_open_attempts: 1,
        }
    }
}

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    failures: u32,
    state: CircuitState,
    next_attempt_at: Option<Instant>,
    half_open_used: u32,
}

impl BreakerState {
    fn closed() -> Self {
        Self {
            failures: 0,
            state: CircuitState::Closed,
            next_attempt_at: None,
            half_open_used: 0,
        }
    }
}

/// Consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    options: CircuitBreakerOptions,
    state: Mutex<BreakerState>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerOptions::default())
    }
}

impl CircuitBreaker {
    pub fn new(options: CircuitBreakerOptions) -> Self {
        Self {
            options,
            state: Mutex::new(BreakerState::closed()),
        }
    }

    pub fn options(&self) -> &CircuitBreakerOptions {
        &self.options
    }

    /// Current state without triggering any transition.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures recorded so far.
    pub fn failure_count(&self) -> u32 {
        self.lock().failures
    }

    /// Decide whether a request may proceed.
    ///
    /// Moves an open breaker to half-open once the cooldown has elapsed, and
    /// counts admitted half-open trial requests.
    pub fn allow_request(&self) -> bool {
        let mut state = self.lock();

        match state.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooling = state
                    .next_attempt_at
                    .is_some_and(|next| Instant::now() < next);
                if cooling {
                    return false;
                }

                state.state = CircuitState::HalfOpen;
                state.half_open_used = 0;
                tracing::info!("Circuit breaker half-open, admitting trial request");
                true
            }
            CircuitState::HalfOpen => {
                if state.half_open_used >= self.options.half_open_attempts {
                    return false;
                }

                state.half_open_used += 1;
                true
            }
        }
    }

    /// Record a successful call. Always closes the breaker.
    pub fn record_success(&self) {
        let mut state = self.lock();
        if state.state != CircuitState::Closed {
            tracing::info!(previous = ?state.state, "Circuit breaker closed");
        }
        *state = BreakerState::closed();
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut state = self.lock();

        if state.state == CircuitState::HalfOpen {
            self.trip(&mut state);
            return;
        }

        state.failures = state.failures.saturating_add(1);
        if state.failures >= self.options.failure_threshold {
            self.trip(&mut state);
        }
    }

    fn trip(&self, state: &mut BreakerState) {
        let cooldown = Duration::from_millis(self.options.cooldown_ms);
        *state = BreakerState {
            failures: self.options.failure_threshold,
            state: CircuitState::Open,
            next_attempt_at: Some(Instant::now() + cooldown),
            half_open_used: 0,
        };
        tracing::warn!(
            failure_threshold = self.options.failure_threshold,
            cooldown_ms = self.options.cooldown_ms,
            "Circuit breaker opened"
        );
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
