//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Full startup path: file (or defaults), environment overrides, validation.
pub fn load(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay deployment environment variables on `config`.
///
/// `lookup` returns the raw value of a variable; blank values count as unset.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    if let Some(port) = var("PORT") {
        config.listener.bind_address = format!("0.0.0.0:{}", port);
    }

    if let Some(origins) = var("ALLOWED_ORIGINS") {
        let origins: Vec<String> = origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
        if !origins.is_empty() {
            config.cors.allowed_origins = origins;
        }
    }

    if let Some(webhook) =
        var("SLACK_TASK_SUMMARY_WEBHOOK_URL").or_else(|| var("SLACK_EVENT_SUMMARY_WEBHOOK_URL"))
    {
        config.slack.webhook_url = Some(webhook);
    }

    if let Some(webhook) = var("SLACK_ENVIRONMENT_SUMMARY_WEBHOOK_URL") {
        config.slack.environment_webhook_url = Some(webhook);
    }

    if let Some(username) = var("BROWSERSTACK_USERNAME") {
        config.browserstack.username = Some(username);
    }

    if let Some(access_key) = var("BROWSERSTACK_ACCESS_KEY") {
        config.browserstack.access_key = Some(access_key);
    }

    if var("RELAY_ENV").as_deref() == Some("production") {
        config.observability.json = true;
    }
}
