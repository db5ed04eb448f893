//! QA relay library.
//!
//! Backend relay for the QA manager web app: forwards calls to third-party
//! APIs (Slack, BrowserStack, arbitrary HTTP) through a resilient outbound
//! proxy with caching, retries, timeouts and a circuit breaker.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod relay;
pub mod resilience;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{ExternalApi, ExternalApiProxy};
