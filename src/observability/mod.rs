//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! Logs go to stdout, JSON lines when `observability.json` is set. The
//! Prometheus recorder is only installed when `observability.metrics_enabled`
//! is true; until then the `metrics` macros are no-ops.

pub mod logging;
pub mod metrics;
