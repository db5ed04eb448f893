//! Failure kinds of the outbound pipeline.

use thiserror::Error;

/// Transport-level failure (DNS, refused connection, TLS, broken body).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// Errors raised by the external API proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The circuit breaker rejected the call.
    #[error("External API temporarily unavailable.")]
    CircuitOpen,

    /// No response within the request deadline.
    #[error("External request timed out.")]
    Timeout,

    /// The destination could not be reached.
    #[error("Failed to reach external API.")]
    Unreachable(#[source] TransportError),

    /// The body did not match its declared JSON content type.
    #[error("External API returned an invalid JSON body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request could not be built (bad URL, unencodable body).
    #[error("Invalid external request: {0}")]
    InvalidRequest(String),
}

impl ProxyError {
    /// HTTP status class the error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::CircuitOpen => 503,
            ProxyError::Timeout => 504,
            ProxyError::Unreachable(_) | ProxyError::Decode(_) => 502,
            ProxyError::InvalidRequest(_) => 400,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::CircuitOpen => "circuit_open",
            ProxyError::Timeout => "timeout",
            ProxyError::Unreachable(_) => "unreachable",
            ProxyError::Decode(_) => "decode",
            ProxyError::InvalidRequest(_) => "invalid_request",
        }
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
