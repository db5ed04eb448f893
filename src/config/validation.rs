//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, breaker thresholds ≥ 1)
//! - Check that addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.proxy.timeout_ms == 0 {
        errors.push(ValidationError::new("proxy.timeout_ms", "must be greater than 0"));
    }

    if config.proxy.retry.attempts == 0 {
        errors.push(ValidationError::new("proxy.retry.attempts", "must be at least 1"));
    }

    let breaker = &config.proxy.circuit_breaker;
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "proxy.circuit_breaker.failure_threshold",
            "must be at least 1",
        ));
    }
    if breaker.half_open_attempts == 0 {
        errors.push(ValidationError::new(
            "proxy.circuit_breaker.half_open_attempts",
            "must be at least 1",
        ));
    }

    if let Some(webhook) = config.slack.webhook_url.as_deref() {
        check_http_url("slack.webhook_url", webhook, &mut errors);
    }
    if let Some(webhook) = config.slack.environment_webhook_url.as_deref() {
        check_http_url("slack.environment_webhook_url", webhook, &mut errors);
    }
    check_http_url(
        "browserstack.automate_base_url",
        &config.browserstack.automate_base_url,
        &mut errors,
    );
    check_http_url(
        "browserstack.app_automate_base_url",
        &config.browserstack.app_automate_base_url,
        &mut errors,
    );

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}
