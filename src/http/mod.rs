//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, access log, body limit)
//!     → cors.rs (origin allow list, preflight)
//!     → handlers.rs (request.rs extracts JSON, relay service does the work)
//!     → response.rs (errors as {"error": ...})
//!     → Send to client
//! ```

pub mod cors;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::JsonBody;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
