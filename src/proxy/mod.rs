//! Outbound HTTP proxy.
//!
//! # Data Flow
//! ```text
//! ExternalApiRequest
//!     → external.rs (breaker gate, cache lookup)
//!     → retries (resilience) around client.rs
//!     → client.rs (body encoding, deadline, Transport)
//!     → cache.rs write-back on 2xx/3xx
//!     → ExternalApiResponse
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod external;
pub mod types;

pub use cache::ResponseCache;
pub use client::{HttpClient, ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use error::{ProxyError, ProxyResult, TransportError};
pub use external::{ExternalApi, ExternalApiProxy, DEFAULT_CACHE_TTL};
pub use types::{CachePolicy, ExternalApiRequest, ExternalApiResponse, HttpMethod, QueryValue};
