//! BrowserStack Automate and App Automate REST API.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::schema::BrowserstackConfig;
use crate::proxy::{CachePolicy, ExternalApi, ExternalApiRequest};
use crate::relay::{is_safe_id, RelayError, RelayResult};
use crate::resilience::RetryPolicy;

const NOT_CONFIGURED: &str = "BrowserStack integration is not configured.";
const INVALID_CREDENTIALS: &str = "Invalid BrowserStack credentials.";
const CACHE_TTL_MS: u64 = 30_000;
const ATTEMPTS: u32 = 2;

/// A build from the Automate builds listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserstackBuild {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BuildEnvelope {
    automation_build: Option<RawBuild>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBuild {
    hashed_id: Option<String>,
    name: Option<String>,
    status: Option<String>,
    duration: Option<f64>,
    build_tag: Option<String>,
    public_url: Option<String>,
    devices: Option<Vec<Value>>,
    created_at: Option<String>,
    started_at: Option<String>,
}

impl RawBuild {
    fn into_build(self) -> Option<BrowserstackBuild> {
        let id = self.hashed_id.filter(|id| !id.is_empty())?;
        Some(BrowserstackBuild {
            id,
            name: self.name,
            status: self.status,
            duration: self.duration,
            build_tag: self.build_tag,
            public_url: self.public_url,
            devices: self.devices,
            created_at: self.created_at,
            started_at: self.started_at,
        })
    }
}

/// Authenticated, cached access to BrowserStack.
#[derive(Clone)]
pub struct BrowserstackGateway {
    api: Arc<dyn ExternalApi>,
    authorization: Option<String>,
    automate_base_url: String,
    app_automate_base_url: String,
}

impl BrowserstackGateway {
    pub fn new(api: Arc<dyn ExternalApi>, config: &BrowserstackConfig) -> Self {
        let authorization = config.credentials().map(|(username, access_key)| {
            format!("Basic {}", STANDARD.encode(format!("{}:{}", username, access_key)))
        });

        Self {
            api,
            authorization,
            automate_base_url: config.automate_base_url.trim_end_matches('/').to_string(),
            app_automate_base_url: config.app_automate_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.authorization.is_some()
    }

    async fn fetch_json(&self, url: String) -> RelayResult<Value> {
        let authorization = self
            .authorization
            .as_deref()
            .ok_or(RelayError::NotConfigured(NOT_CONFIGURED))?;

        let request = ExternalApiRequest::get(url)
            .header("Authorization", authorization)
            .header("Accept", "application/json")
            .cache(CachePolicy::enabled_for(CACHE_TTL_MS))
            .retry(RetryPolicy::attempts(ATTEMPTS));

        let response = self.api.send(request).await?;
        match response.status {
            401 => Err(RelayError::Unauthorized(INVALID_CREDENTIALS)),
            status if !response.is_success() => {
                tracing::warn!(status, "BrowserStack request failed");
                Err(RelayError::Upstream(format!(
                    "BrowserStack request failed with status {}",
                    status
                )))
            }
            _ => Ok(response.data),
        }
    }

    fn automate(&self, path: &str) -> String {
        format!("{}{}", self.automate_base_url, path)
    }

    fn app_automate(&self, path: &str) -> String {
        format!("{}{}", self.app_automate_base_url, path)
    }

    /// Automate builds, reduced to those carrying an id.
    pub async fn list_builds(&self) -> RelayResult<Vec<BrowserstackBuild>> {
        let payload = self.fetch_json(self.automate("/builds.json")).await?;
        let entries = match payload {
            Value::Array(entries) => entries,
            _ => return Err(RelayError::Upstream("Unexpected BrowserStack response.".into())),
        };

        Ok(entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<BuildEnvelope>(entry).ok())
            .filter_map(|envelope| envelope.automation_build)
            .filter_map(RawBuild::into_build)
            .collect())
    }

    pub async fn get_build(&self, build_id: &str) -> RelayResult<Value> {
        let id = checked_id(build_id)?;
        self.fetch_json(self.automate(&format!("/builds/{}.json", id))).await
    }

    pub async fn list_build_sessions(&self, build_id: &str) -> RelayResult<Value> {
        let id = checked_id(build_id)?;
        self.fetch_json(self.automate(&format!("/builds/{}/sessions.json", id)))
            .await
    }

    pub async fn get_session(&self, session_id: &str) -> RelayResult<Value> {
        let id = checked_id(session_id)?;
        self.fetch_json(self.automate(&format!("/sessions/{}.json", id))).await
    }

    /// Raw text logs of an Automate session, returned as a JSON string.
    pub async fn get_session_logs(&self, session_id: &str) -> RelayResult<Value> {
        let id = checked_id(session_id)?;
        self.fetch_json(self.automate(&format!("/sessions/{}/logs", id))).await
    }

    pub async fn list_browsers(&self) -> RelayResult<Value> {
        self.fetch_json(self.automate("/browsers.json")).await
    }

    pub async fn list_app_builds(&self) -> RelayResult<Value> {
        self.fetch_json(self.app_automate("/builds.json")).await
    }

    pub async fn list_app_build_sessions(&self, build_id: &str) -> RelayResult<Value> {
        let id = checked_id(build_id)?;
        self.fetch_json(self.app_automate(&format!("/builds/{}/sessions.json", id)))
            .await
    }

    pub async fn get_app_session(&self, session_id: &str) -> RelayResult<Value> {
        let id = checked_id(session_id)?;
        self.fetch_json(self.app_automate(&format!("/sessions/{}.json", id)))
            .await
    }

    /// HAR network capture of an App Automate session.
    pub async fn get_app_session_network_logs(&self, session_id: &str) -> RelayResult<Value> {
        let id = checked_id(session_id)?;
        self.fetch_json(self.app_automate(&format!("/sessions/{}/networklogs", id)))
            .await
    }
}

fn checked_id(id: &str) -> RelayResult<&str> {
    if is_safe_id(id) {
        Ok(id)
    } else {
        Err(RelayError::bad_request("Invalid BrowserStack identifier."))
    }
}
