//! Slack incoming-webhook delivery.

use std::sync::Arc;

use serde_json::json;
use url::Url;

use crate::proxy::{CachePolicy, ExternalApi, ExternalApiRequest};
use crate::relay::environment_summary::{EnvironmentSummaryFormatter, EnvironmentSummaryPayload};
use crate::relay::event_summary::{EventSummaryFormatter, EventSummaryPayload};
use crate::relay::summary::{TaskSummaryFormatter, TaskSummaryPayload};
use crate::relay::{RelayError, RelayResult};
use crate::resilience::RetryPolicy;

const NOT_CONFIGURED: &str = "Slack integration is not configured.";

/// Posts plain-text messages to a Slack webhook.
#[derive(Clone)]
pub struct SlackNotifier {
    api: Arc<dyn ExternalApi>,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(api: Arc<dyn ExternalApi>, webhook_url: Option<String>) -> Self {
        Self { api, webhook_url }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Post `text` to the configured webhook.
    pub async fn send_message(&self, text: &str) -> RelayResult<()> {
        let webhook = self
            .webhook_url
            .as_deref()
            .ok_or(RelayError::NotConfigured(NOT_CONFIGURED))?;
        self.send_message_to(webhook, text).await
    }

    /// Post `text` to an explicit webhook.
    pub async fn send_message_to(&self, webhook: &str, text: &str) -> RelayResult<()> {
        // Webhook posts are not idempotent: one attempt, never cached.
        let request = ExternalApiRequest::post(webhook)
            .json(json!({ "text": text }))
            .cache(CachePolicy::disabled())
            .retry(RetryPolicy::attempts(1));

        let response = self.api.send(request).await?;
        if !response.is_success() {
            tracing::warn!(status = response.status, "Slack webhook rejected message");
            return Err(RelayError::Upstream(format!(
                "Slack webhook responded with status {}",
                response.status
            )));
        }

        tracing::info!("Slack message delivered");
        Ok(())
    }
}

/// Formats and delivers QA task summaries.
#[derive(Clone)]
pub struct TaskSummaryService {
    formatter: TaskSummaryFormatter,
    notifier: SlackNotifier,
}

impl TaskSummaryService {
    pub fn new(notifier: SlackNotifier) -> Self {
        Self {
            formatter: TaskSummaryFormatter,
            notifier,
        }
    }

    pub async fn send_task_summary(&self, payload: &TaskSummaryPayload) -> RelayResult<()> {
        let message = match payload.message.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => {
                let has_title = payload
                    .scenario
                    .as_ref()
                    .and_then(|scenario| scenario.title.as_deref())
                    .is_some_and(|title| !title.trim().is_empty());
                if !has_title {
                    return Err(RelayError::bad_request("Scenario title is required."));
                }
                self.formatter.build_message(payload)
            }
        };

        match payload
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
        {
            Some(webhook) => {
                validate_webhook(webhook)?;
                self.notifier.send_message_to(webhook, &message).await
            }
            None => self.notifier.send_message(&message).await,
        }
    }
}

/// Formats and delivers QA event announcements.
#[derive(Clone)]
pub struct EventSummaryService {
    formatter: EventSummaryFormatter,
    notifier: SlackNotifier,
}

impl EventSummaryService {
    pub fn new(notifier: SlackNotifier) -> Self {
        Self {
            formatter: EventSummaryFormatter,
            notifier,
        }
    }

    pub async fn send_event_summary(&self, payload: &EventSummaryPayload) -> RelayResult<()> {
        if !self.notifier.is_configured() {
            return Err(RelayError::NotConfigured(NOT_CONFIGURED));
        }

        let has_name = payload
            .event_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());
        if !has_name {
            return Err(RelayError::bad_request("Event name is required."));
        }

        let message = self.formatter.build_message(payload);
        self.notifier.send_message(&message).await
    }
}

/// Formats and delivers per-environment reports, usually to their own channel.
#[derive(Clone)]
pub struct EnvironmentSummaryService {
    formatter: EnvironmentSummaryFormatter,
    notifier: SlackNotifier,
}

impl EnvironmentSummaryService {
    pub fn new(notifier: SlackNotifier) -> Self {
        Self {
            formatter: EnvironmentSummaryFormatter,
            notifier,
        }
    }

    pub async fn send_environment_summary(&self, payload: &EnvironmentSummaryPayload) -> RelayResult<()> {
        if !self.notifier.is_configured() {
            return Err(RelayError::NotConfigured(NOT_CONFIGURED));
        }

        let environment = payload
            .environment
            .as_ref()
            .filter(|environment| environment.has_id())
            .ok_or_else(|| RelayError::bad_request("Environment data is required."))?;

        let message = self.formatter.build_message(environment);
        self.notifier.send_message(&message).await
    }
}

fn validate_webhook(webhook: &str) -> RelayResult<()> {
    match Url::parse(webhook) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(RelayError::bad_request("Invalid Slack webhook URL.")),
    }
}
