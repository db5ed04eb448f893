//! Slack text announcing a QA event and who covers each store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::relay::text::{dedupe, first_present, single_line, single_line_opt, slack_link, slack_mention_id, strip_emails};

const RESPONSIBLE: &str = "Responsável";
const NO_RESPONSIBLE: &str = "Responsável não informado";

/// Body of `POST /slack/event-summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventSummaryPayload {
    pub event_name: Option<String>,
    pub execution_window: Option<String>,
    pub test_types: Vec<Value>,
    pub stores: Vec<Option<EventStore>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventStore {
    pub name: Option<String>,
    pub responsibles: Vec<Option<Responsible>>,
    pub tasks: Vec<Value>,
    pub environments: Vec<Option<StoreEnvironment>>,
}

/// A store environment with its own Jira links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreEnvironment {
    pub label: Option<String>,
    pub name: Option<String>,
    pub identifier: Option<String>,
    pub task_url: Option<String>,
    pub jira_task_url: Option<String>,
    pub jira_url: Option<String>,
    pub tasks: Vec<TaskLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskLink {
    Url(String),
    Entry {
        #[serde(default)]
        url: Option<String>,
    },
    Other(Value),
}

/// Someone covering a store: free text or a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Responsible {
    Label(String),
    Profile(ResponsibleProfile),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponsibleProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub label: Option<String>,
    pub mention: Option<String>,
    pub slack: Option<String>,
    pub slack_id: Option<String>,
    pub handle: Option<String>,
    pub username: Option<String>,
    pub uid: Option<String>,
}

impl Responsible {
    /// Slack mention when one can be found, otherwise the name without emails.
    fn label(&self) -> String {
        match self {
            Responsible::Label(text) => {
                let normalized = single_line(text);
                if normalized.is_empty() {
                    return RESPONSIBLE.to_string();
                }
                let mention = slack_mention_id(&normalized);
                if !mention.is_empty() {
                    return format!("<@{}>", mention);
                }
                non_empty_or(strip_emails(&normalized), RESPONSIBLE)
            }
            Responsible::Profile(profile) => {
                let candidates = [
                    &profile.mention,
                    &profile.slack,
                    &profile.slack_id,
                    &profile.handle,
                    &profile.username,
                    &profile.uid,
                    &profile.label,
                    &profile.name,
                ];
                let mention = candidates
                    .iter()
                    .map(|candidate| slack_mention_id(candidate.as_deref().unwrap_or_default()))
                    .find(|id| !id.is_empty());
                if let Some(mention) = mention {
                    return format!("<@{}>", mention);
                }

                let label = strip_emails(profile.label.as_deref().unwrap_or_default());
                if !label.is_empty() {
                    return label;
                }
                non_empty_or(strip_emails(profile.name.as_deref().unwrap_or_default()), RESPONSIBLE)
            }
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

impl StoreEnvironment {
    fn jira_links(&self) -> Vec<String> {
        let mut candidates = vec![
            single_line_opt(self.task_url.as_deref()),
            single_line_opt(self.jira_task_url.as_deref()),
            single_line_opt(self.jira_url.as_deref()),
        ];
        candidates.extend(self.tasks.iter().map(|task| match task {
            TaskLink::Url(url) => single_line(url),
            TaskLink::Entry { url } => single_line_opt(url.as_deref()),
            TaskLink::Other(_) => String::new(),
        }));

        let urls = dedupe(candidates);
        let numbered = urls.len() > 1;
        urls.iter()
            .enumerate()
            .map(|(index, url)| {
                let label = if numbered { format!("Jira {}", index + 1) } else { "Jira".to_string() };
                slack_link(url, &label)
            })
            .filter(|link| !link.is_empty())
            .collect()
    }
}

impl EventStore {
    fn lines(&self) -> String {
        let name = non_empty_or(single_line_opt(self.name.as_deref()), "Loja");

        let responsibles = dedupe(self.responsibles.iter().map(|entry| match entry {
            Some(responsible) => responsible.label(),
            None => RESPONSIBLE.to_string(),
        }));
        let responsible_text = if responsibles.is_empty() {
            NO_RESPONSIBLE.to_string()
        } else {
            responsibles.join(", ")
        };

        let mut parts = vec![format!("• *{}:* {}", name, responsible_text)];

        let environment_lines: Vec<String> = self
            .environments
            .iter()
            .enumerate()
            .filter_map(|(index, environment)| {
                let environment = environment.as_ref()?;
                let links = environment.jira_links();
                if links.is_empty() {
                    return None;
                }
                let label = first_present([
                    environment.label.as_deref(),
                    environment.name.as_deref(),
                    environment.identifier.as_deref(),
                ]);
                let label = non_empty_or(label, &format!("Ambiente {}", index + 1));
                Some(format!("   ↳ 🔗 {}: {}", label, links.join(" | ")))
            })
            .collect();

        let store_tasks: Vec<String> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(index, task)| slack_link(task.as_str().unwrap_or_default(), &format!("Jira {}", index + 1)))
            .filter(|link| !link.is_empty())
            .collect();

        if !environment_lines.is_empty() {
            parts.extend(environment_lines);
        } else if !store_tasks.is_empty() {
            let noun = if store_tasks.len() > 1 { "Tarefas" } else { "Tarefa" };
            parts.push(format!("   ↳ 🔗 {}: {}", noun, store_tasks.join(" | ")));
        }

        parts.join("\n")
    }
}

/// Builds the Portuguese event announcement.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventSummaryFormatter;

impl EventSummaryFormatter {
    pub fn build_message(&self, payload: &EventSummaryPayload) -> String {
        let title = non_empty_or(single_line_opt(payload.event_name.as_deref()), "Evento de QA");
        let execution = single_line_opt(payload.execution_window.as_deref());

        let test_types = dedupe(
            payload
                .test_types
                .iter()
                .map(|kind| single_line(kind.as_str().unwrap_or_default())),
        )
        .join(" / ");

        let info = if execution.is_empty() {
            ":mega: *INFORMATIVO*".to_string()
        } else {
            format!(":mega: *INFORMATIVO {}*", execution)
        };

        let mut description = if test_types.is_empty() {
            format!("*{}*", title)
        } else {
            format!("*{}* - _{}_", title, test_types)
        };
        if !description.ends_with('.') {
            description.push('.');
        }

        let mut lines = vec![
            info,
            format!("🧪 {}", description),
            "🧾 *Ambientes e responsáveis:*".to_string(),
        ];

        let stores: Vec<String> = payload
            .stores
            .iter()
            .map(|store| match store {
                Some(store) => store.lines(),
                None => EventStore::default().lines(),
            })
            .collect();
        if stores.is_empty() {
            lines.push(format!("• *Loja:* {}", NO_RESPONSIBLE));
        } else {
            lines.extend(stores);
        }

        lines.join("\n")
    }
}
