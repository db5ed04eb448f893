//! Registry of automation runs reported by CI jobs.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::relay::{RelayError, RelayResult};

/// Body of `POST /automation/executions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutomationExecutionPayload {
    pub username: Option<String>,
    pub password: Option<String>,
    pub status: Option<String>,
    pub provider: Option<String>,
    pub execution_id: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub details: Option<Map<String, Value>>,
}

/// A stored run. The password is kept but never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationExecution {
    pub id: String,
    pub received_at: String,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl AutomationExecution {
    /// Validate a payload and stamp it with an id and receive time.
    pub fn from_payload(payload: AutomationExecutionPayload) -> RelayResult<Self> {
        let username = payload.username.as_deref().map(str::trim).unwrap_or_default();
        let password = payload.password.as_deref().map(str::trim).unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Err(RelayError::bad_request("Username and password are required."));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            received_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            username: username.to_string(),
            password: password.to_string(),
            status: payload.status,
            provider: payload.provider,
            execution_id: payload.execution_id,
            started_at: payload.started_at,
            finished_at: payload.finished_at,
            details: payload.details,
        })
    }
}

/// Storage port for automation runs.
#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    async fn save(&self, execution: AutomationExecution) -> RelayResult<()>;
    async fn list(&self) -> RelayResult<Vec<AutomationExecution>>;
}

/// Process-local store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryExecutionRepository {
    executions: RwLock<Vec<AutomationExecution>>,
}

impl InMemoryExecutionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionRepository for InMemoryExecutionRepository {
    async fn save(&self, execution: AutomationExecution) -> RelayResult<()> {
        self.executions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(execution);
        Ok(())
    }

    async fn list(&self) -> RelayResult<Vec<AutomationExecution>> {
        Ok(self
            .executions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> AutomationExecutionPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_credentials_required() {
        let err = AutomationExecution::from_payload(payload(json!({"username": "ci", "password": "  "})))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        assert!(AutomationExecution::from_payload(payload(json!({"password": "x"}))).is_err());
    }

    #[test]
    fn test_execution_is_stamped_and_hides_password() {
        let execution = AutomationExecution::from_payload(payload(json!({
            "username": " ci-bot ",
            "password": "hunter2",
            "status": "passed",
            "executionId": "run-9",
            "details": {"suite": "smoke"}
        })))
        .unwrap();

        assert!(Uuid::parse_str(&execution.id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&execution.received_at).is_ok());
        assert_eq!(execution.username, "ci-bot");

        let wire = serde_json::to_value(&execution).unwrap();
        assert!(wire.get("password").is_none());
        assert_eq!(wire["executionId"], json!("run-9"));
        assert_eq!(wire["receivedAt"], json!(execution.received_at));
        assert_eq!(wire["details"]["suite"], json!("smoke"));
    }

    #[tokio::test]
    async fn test_repository_keeps_insertion_order() {
        let repository = InMemoryExecutionRepository::new();
        for name in ["a", "b"] {
            let execution = AutomationExecution::from_payload(payload(json!({
                "username": name,
                "password": "p"
            })))
            .unwrap();
            repository.save(execution).await.unwrap();
        }

        let listed = repository.list().await.unwrap();
        let names: Vec<&str> = listed.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
