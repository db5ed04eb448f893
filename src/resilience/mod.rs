//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call:
//!     → circuit_breaker.rs (fail fast while the downstream is failing)
//!     → retries.rs (re-run with backoff.rs delays up to the attempt budget)
//!     → timeouts.rs (enforce the per-call deadline)
//!     → outcome fed back into circuit_breaker.rs
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Backoff is linear and deterministic
//! - Circuit breaker prevents hammering a failing dependency

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerOptions, CircuitState};
pub use retries::{RetryPolicy, RetryStrategy};
