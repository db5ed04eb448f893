//! Slack text for a QA session summary.

use serde::{Deserialize, Serialize};

const NOT_INFORMED: &str = "Não informado";

/// Body of `POST /slack/task-summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskSummaryPayload {
    /// Ready-made message; sent verbatim when non-blank.
    pub message: Option<String>,
    pub scenario: Option<ScenarioInfo>,
    pub environment_summary: Option<EnvironmentSummary>,
    /// Per-call webhook override.
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioInfo {
    pub title: Option<String>,
}

/// Session figures collected by the QA manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentSummary {
    pub total_time: Option<String>,
    pub total_time_ms: Option<f64>,
    pub scenarios_count: Option<i64>,
    pub executed_scenarios_count: Option<i64>,
    pub executed_scenarios_message: Option<String>,
    pub storyfix_count: Option<i64>,
    pub jira: Option<String>,
    pub suite_name: Option<String>,
    pub suite_details: Option<String>,
    pub participants_count: Option<i64>,
    pub monitored_urls: Option<Vec<Option<String>>>,
    pub attendees: Option<Vec<Option<Attendee>>>,
}

/// A participant, either free text or a name/email pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attendee {
    Label(String),
    Person {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
}

impl Attendee {
    fn display(&self) -> String {
        match self {
            Attendee::Label(label) => label.trim().to_string(),
            Attendee::Person { name, email } => {
                let name = text(name);
                let email = text(email);
                match (name.is_empty(), email.is_empty()) {
                    (false, false) => format!("{} ({})", name, email),
                    (false, true) => name,
                    _ => email,
                }
            }
        }
    }
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn count(value: Option<i64>) -> String {
    value.filter(|n| *n >= 0).unwrap_or(0).to_string()
}

/// `HH:MM:SS`, or empty for a missing or negative duration.
fn format_duration_hms(milliseconds: Option<f64>) -> String {
    let Some(ms) = milliseconds.filter(|ms| ms.is_finite() && *ms >= 0.0) else {
        return String::new();
    };

    let total_seconds = (ms / 1000.0).floor() as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

/// Builds the Portuguese Slack summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskSummaryFormatter;

impl TaskSummaryFormatter {
    pub fn build_message(&self, payload: &TaskSummaryPayload) -> String {
        let default_summary = EnvironmentSummary::default();
        let summary = payload.environment_summary.as_ref().unwrap_or(&default_summary);

        let mut lines: Vec<String> = vec!["✨ *Resumo de QA*".to_string(), String::new()];
        let push_field = |lines: &mut Vec<String>, label: &str, value: &str| {
            let value = value.trim();
            let value = if value.is_empty() { NOT_INFORMED } else { value };
            lines.push(format!("• *{}:* {}", label, value));
        };

        let mut total_time = text(&summary.total_time);
        if total_time.is_empty() {
            total_time = format_duration_hms(summary.total_time_ms);
        }
        if total_time.is_empty() {
            total_time = "00:00:00".to_string();
        }
        push_field(&mut lines, "Tempo total", &total_time);

        push_field(&mut lines, "Cenários", &count(summary.scenarios_count));

        let mut executed = text(&summary.executed_scenarios_message);
        if executed.is_empty() {
            if let Some(n) = summary.executed_scenarios_count {
                let noun = if n == 1 { "cenário executado" } else { "cenários executados" };
                executed = format!("{} {}", n, noun);
            }
        }
        if !executed.is_empty() {
            push_field(&mut lines, "Execução", &executed);
        }

        push_field(&mut lines, "Storyfix registrados", &count(summary.storyfix_count));
        push_field(&mut lines, "Jira", &text(&summary.jira));

        let mut suite = text(&summary.suite_name);
        if suite.is_empty() {
            suite = NOT_INFORMED.to_string();
        }
        let details = text(&summary.suite_details);
        if !details.is_empty() {
            suite = format!("{} — {}", suite, details);
        }
        push_field(&mut lines, "Suíte", &suite);

        push_field(&mut lines, "Participantes", &count(summary.participants_count));

        let urls: Vec<String> = summary
            .monitored_urls
            .iter()
            .flatten()
            .map(text)
            .filter(|url| !url.is_empty())
            .collect();
        if urls.is_empty() {
            push_field(&mut lines, "URLs monitoradas", NOT_INFORMED);
        } else {
            lines.push("• *🌐 URLs monitoradas:*".to_string());
            lines.extend(urls.into_iter().map(|url| format!("  - {}", url)));
        }

        let attendees: Vec<String> = summary
            .attendees
            .iter()
            .flatten()
            .flatten()
            .map(Attendee::display)
            .filter(|entry| !entry.is_empty())
            .collect();

        lines.push(String::new());
        lines.push("👥 *Quem está participando*".to_string());
        if attendees.is_empty() {
            lines.push(format!("• {}", NOT_INFORMED));
        } else {
            lines.extend(attendees.into_iter().map(|entry| format!("• {}", entry)));
        }

        lines.join("\n")
    }
}
