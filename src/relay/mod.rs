//! QA relay use cases.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → forward.rs      (validated pass-through to any http/https URL)
//!     → slack.rs        (summary formatters → webhook POST)
//!                         summary.rs, event_summary.rs, environment_summary.rs
//!                         share text.rs
//!     → browserstack.rs (authenticated, cached GETs)
//!     → automation.rs   (in-memory execution log)
//!
//! Every outbound call goes through the shared ExternalApi.
//! ```
//!
//! # Design Decisions
//! - Services own no sockets; they build `ExternalApiRequest`s
//! - Errors carry the status the HTTP layer should answer with

pub mod automation;
pub mod browserstack;
pub mod environment_summary;
pub mod event_summary;
pub mod forward;
pub mod slack;
pub mod summary;
mod text;

use thiserror::Error;

use crate::proxy::ProxyError;

pub use automation::{AutomationExecution, AutomationExecutionPayload, ExecutionRepository, InMemoryExecutionRepository};
pub use browserstack::{BrowserstackBuild, BrowserstackGateway};
pub use forward::{ForwardRequestInput, ForwardRequestService};
pub use environment_summary::{EnvironmentSummaryFormatter, EnvironmentSummaryPayload};
pub use event_summary::{EventSummaryFormatter, EventSummaryPayload};
pub use slack::{EnvironmentSummaryService, EventSummaryService, SlackNotifier, TaskSummaryService};
pub use summary::{TaskSummaryFormatter, TaskSummaryPayload};

/// Failure of a relay use case.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The caller sent something unusable.
    #[error("{0}")]
    BadRequest(String),

    /// A required integration has no credentials or endpoint.
    #[error("{0}")]
    NotConfigured(&'static str),

    /// The third party rejected our credentials.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// The third party answered, but not successfully or not as expected.
    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl RelayError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        RelayError::BadRequest(message.into())
    }

    /// HTTP status the error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::BadRequest(_) => 400,
            RelayError::Unauthorized(_) => 401,
            RelayError::NotConfigured(_) => 503,
            RelayError::Upstream(_) => 502,
            RelayError::Proxy(e) => e.status_code(),
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Path segment accepted as a third-party identifier.
pub(crate) fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
