//! Slack text closing out a single QA environment.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::relay::text::{
    dedupe, first_present, format_duration_ms, format_percentage, format_timestamp, is_truthy, slack_link, strip_emails,
};

/// Body of `POST /slack/environment-summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentSummaryPayload {
    pub environment: Option<EnvironmentSnapshot>,
}

/// State of an environment as the QA manager sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentSnapshot {
    pub id: Option<Value>,
    pub label: Option<String>,
    pub identifier: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub status_label: Option<String>,
    pub stage_label: Option<String>,
    pub moment_label: Option<String>,
    pub test_moment_label: Option<String>,
    pub test_type: Option<String>,
    pub release: Option<String>,
    pub suite_name: Option<String>,
    pub store_name: Option<String>,
    pub organization_name: Option<String>,
    pub scenario_metrics: Option<ScenarioMetrics>,
    pub testing_duration_label: Option<String>,
    pub testing_duration_ms: Option<f64>,
    pub testing_start_label: Option<String>,
    pub testing_started_at: Option<Value>,
    pub testing_end_label: Option<String>,
    pub testing_completed_at: Option<Value>,
    pub participants: Vec<Option<Participant>>,
    pub urls: Vec<Value>,
    pub bug_count: Option<f64>,
    pub bug_label: Option<String>,
    pub bug_label_plural: Option<String>,
    pub task_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioMetrics {
    pub total_tests: Option<f64>,
    pub completed_tests: Option<f64>,
    pub in_progress_tests: Option<f64>,
    pub blocked_tests: Option<f64>,
    pub pending_tests: Option<f64>,
    pub success_rate: Option<f64>,
    pub failure_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Participant {
    Label(String),
    Profile {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "displayName")]
        display_name: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
}

impl Participant {
    fn display(&self) -> String {
        match self {
            Participant::Label(text) => strip_emails(text),
            Participant::Profile {
                label,
                name,
                display_name,
                email,
            } => {
                // First field that is present at all, even if blank.
                let chosen = label.as_deref().or(name.as_deref()).or(display_name.as_deref()).or(email.as_deref());
                strip_emails(chosen.unwrap_or_default())
            }
        }
    }
}

impl EnvironmentSnapshot {
    /// An environment is only summarized once it has an id.
    pub fn has_id(&self) -> bool {
        is_truthy(self.id.as_ref())
    }
}

fn count(value: Option<f64>) -> f64 {
    value.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Builds the Portuguese environment report.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSummaryFormatter;

impl EnvironmentSummaryFormatter {
    pub fn build_message(&self, env: &EnvironmentSnapshot) -> String {
        let label = first_present([env.label.as_deref(), env.identifier.as_deref()]);
        let label = if label.is_empty() { "Ambiente".to_string() } else { label };

        let mut lines = vec![format!(":white_check_mark: *Resumo do ambiente {}*", label)];

        let kind = first_present([env.kind.as_deref()]);
        if !kind.is_empty() {
            lines.push(format!("🏷️ *Tipo:* {}", kind));
        }

        let location: Vec<String> = [env.store_name.as_deref(), env.organization_name.as_deref()]
            .into_iter()
            .map(|part| first_present([part]))
            .filter(|part| !part.is_empty())
            .collect();
        if !location.is_empty() {
            lines.push(format!("📍 *Local:* {}", location.join(" • ")));
        }

        let context: Vec<String> = [
            ("Status", first_present([env.status_label.as_deref(), env.status.as_deref()])),
            ("Etapa", first_present([env.stage_label.as_deref()])),
            ("Tipo de teste", first_present([env.test_type.as_deref()])),
            ("Momento", first_present([env.test_moment_label.as_deref(), env.moment_label.as_deref()])),
            ("Release", first_present([env.release.as_deref()])),
            ("Suite", first_present([env.suite_name.as_deref()])),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| format!("*{}:* {}", name, value))
        .collect();
        if !context.is_empty() {
            lines.push(format!("🧭 *Contexto:* {}", context.join(" • ")));
        }

        let metrics = env.scenario_metrics.clone().unwrap_or_default();
        let total = count(metrics.total_tests);
        if total > 0.0 {
            let mut parts = vec![format!("*Concluídos:* {}/{}", count(metrics.completed_tests), total)];
            for (name, value) in [
                ("Em andamento", metrics.in_progress_tests),
                ("Bloqueados", metrics.blocked_tests),
                ("Pendentes", metrics.pending_tests),
            ] {
                let value = count(value);
                if value > 0.0 {
                    parts.push(format!("*{}:* {}", name, value));
                }
            }
            lines.push(format!("📊 *Cenários:* {}", parts.join(" • ")));
        }

        let rates: Vec<String> = [
            ("Sucesso", format_percentage(metrics.success_rate)),
            ("Falha", format_percentage(metrics.failure_rate)),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| format!("*{}:* {}", name, value))
        .collect();
        if !rates.is_empty() {
            lines.push(format!("📈 *Indicadores:* {}", rates.join(" • ")));
        }

        if let Some(bugs) = env.bug_count.filter(|n| n.is_finite() && *n >= 0.0) {
            let noun = if bugs == 1.0 {
                first_present([env.bug_label.as_deref(), Some("bug")])
            } else {
                first_present([env.bug_label_plural.as_deref(), Some("bugs")])
            };
            lines.push(format!("🐞 *Bugs:* {} {}", bugs, noun));
        }

        let mut duration = first_present([env.testing_duration_label.as_deref()]);
        if duration.is_empty() {
            duration = format_duration_ms(env.testing_duration_ms);
        }
        if !duration.is_empty() {
            lines.push(format!("⏱️ *Duração:* {}", duration));
        }

        let mut started = first_present([env.testing_start_label.as_deref()]);
        if started.is_empty() {
            started = format_timestamp(env.testing_started_at.as_ref());
        }
        let mut completed = first_present([env.testing_end_label.as_deref()]);
        if completed.is_empty() {
            completed = format_timestamp(env.testing_completed_at.as_ref());
        }
        let timeline: Vec<String> = [("Início", started), ("Conclusão", completed)]
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| format!("*{}:* {}", name, value))
            .collect();
        if !timeline.is_empty() {
            lines.push(format!("🕒 *Linha do tempo:* {}", timeline.join(" • ")));
        }

        let participants = dedupe(env.participants.iter().flatten().map(Participant::display));
        if !participants.is_empty() {
            lines.push(format!("👥 *Participantes:* {}", participants.join(" • ")));
        }

        let urls: Vec<String> = env
            .urls
            .iter()
            .enumerate()
            .map(|(index, url)| slack_link(url.as_str().unwrap_or_default(), &format!("URL de teste {}", index + 1)))
            .filter(|link| !link.is_empty())
            .collect();
        if !urls.is_empty() {
            lines.push(format!("🌐 *URLs de teste:* {}", urls.join(" · ")));
        }

        let task = slack_link(env.task_url.as_deref().unwrap_or_default(), "Abrir tarefa");
        if !task.is_empty() {
            lines.push(format!("🗂️ *Tarefa:* {}", task));
        }

        lines.join("\n")
    }
}
