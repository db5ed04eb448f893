//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::resilience::circuit_breaker::CircuitBreakerOptions;
use crate::resilience::retries::{DEFAULT_ATTEMPTS, DEFAULT_BACKOFF_MS};
use crate::resilience::timeouts::DEFAULT_REQUEST_TIMEOUT_MS;

/// Root configuration for the QA relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Browser origins allowed to call the relay.
    pub cors: CorsConfig,

    /// Slack webhook integration.
    pub slack: SlackConfig,

    /// BrowserStack REST API integration.
    pub browserstack: BrowserstackConfig,

    /// Outbound proxy defaults.
    pub proxy: ProxySettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// CORS allow list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins echoed back in `Access-Control-Allow-Origin`.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "https://qualitydigital-qamanager.vercel.app".to_string(),
            ],
        }
    }
}

/// Slack integration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SlackConfig {
    /// Incoming webhook for task and event summaries. Unset disables those routes.
    pub webhook_url: Option<String>,
    /// Separate channel for environment summaries.
    pub environment_webhook_url: Option<String>,
}

impl SlackConfig {
    /// Webhook for environment summaries, falling back to `webhook_url`.
    pub fn environment_webhook(&self) -> Option<&str> {
        self.environment_webhook_url
            .as_deref()
            .or(self.webhook_url.as_deref())
    }
}

/// BrowserStack integration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserstackConfig {
    pub username: Option<String>,
    pub access_key: Option<String>,

    /// Automate API root (builds, sessions, browsers).
    pub automate_base_url: String,

    /// App Automate API root.
    pub app_automate_base_url: String,
}

impl Default for BrowserstackConfig {
    fn default() -> Self {
        Self {
            username: None,
            access_key: None,
            automate_base_url: "https://api.browserstack.com/automate".to_string(),
            app_automate_base_url: "https://api-cloud.browserstack.com/app-automate".to_string(),
        }
    }
}

impl BrowserstackConfig {
    /// Both credentials, when both are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.access_key.as_deref()) {
            (Some(username), Some(access_key)) => Some((username, access_key)),
            _ => None,
        }
    }
}

/// Defaults for the outbound proxy pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Deadline for a call that names none, in milliseconds.
    pub timeout_ms: u64,

    /// TTL for cacheable responses that name none, in milliseconds.
    pub default_cache_ttl_ms: u64,

    pub retry: RetrySettings,

    /// Shared breaker guarding every outbound call.
    pub circuit_breaker: CircuitBreakerOptions,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            default_cache_ttl_ms: 30_000,
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerOptions::default(),
        }
    }
}

/// Retry defaults applied when a request carries no policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Render logs as JSON lines.
    pub json: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}
