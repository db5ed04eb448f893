//! Text helpers shared by the Slack message builders.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde_json::Value;

static SLACK_USER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]+$").expect("Slack user id regex should compile"));
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@([^>]+)>").expect("mention regex should compile"));
static BARE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("bare email regex should compile"));
static ANGLE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^@>][^>]*>").expect("angle link regex should compile"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[\w.+-]+@[\w.-]+\.[A-Za-z]{2,}\b").expect("email regex should compile")
});
static EMPTY_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\)|\[\s*\]").expect("bracket regex should compile"));
static TRAILING_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*[-\x{2013}\x{2014},:|]\s*$").expect("separator regex should compile")
});

/// Collapse runs of whitespace and trim.
pub(crate) fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn single_line_opt(value: Option<&str>) -> String {
    value.map(single_line).unwrap_or_default()
}

/// First non-blank candidate, normalized.
pub(crate) fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> String {
    candidates
        .into_iter()
        .map(single_line_opt)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// Slack user id referenced by `value`, if it looks like a mention.
///
/// Accepts raw ids (`U123ABC`), `<@U123ABC>` and `@handle`. Plain names and
/// email addresses yield an empty string.
pub(crate) fn slack_mention_id(value: &str) -> String {
    let normalized = single_line(value);
    if normalized.is_empty() {
        return String::new();
    }

    if SLACK_USER_ID.is_match(&normalized) {
        return normalized;
    }

    if let Some(id) = MENTION.captures(&normalized).and_then(|c| c.get(1)) {
        return id.as_str().trim().to_string();
    }

    let sanitized = match normalized.find('<') {
        Some(index) => normalized[..index].trim(),
        None => normalized.as_str(),
    };
    if sanitized.is_empty() {
        return String::new();
    }

    let candidate = sanitized.trim_start_matches('@').trim();
    if candidate.is_empty() || candidate.contains(char::is_whitespace) || BARE_EMAIL.is_match(candidate) {
        return String::new();
    }

    if normalized.starts_with('@') || normalized.contains('@') || sanitized != normalized {
        return candidate.to_string();
    }

    String::new()
}

/// Drop email addresses and `<...>` links (but not mentions) from a label.
pub(crate) fn strip_emails(value: &str) -> String {
    let normalized = single_line(value);
    if normalized.is_empty() {
        return String::new();
    }

    let without_links = ANGLE_LINK.replace_all(&normalized, "");
    let without_emails = EMAIL.replace_all(without_links.trim(), "");
    let without_brackets = EMPTY_BRACKETS.replace_all(&without_emails, " ");
    let collapsed = single_line(&without_brackets);

    TRAILING_SEPARATOR.replace(&collapsed, "").trim().to_string()
}

/// Normalized, non-blank, first-seen order.
pub(crate) fn dedupe(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for item in items {
        let normalized = single_line(&item);
        if !normalized.is_empty() && !result.contains(&normalized) {
            result.push(normalized);
        }
    }
    result
}

/// `<url|label>`, or empty when `url` is blank.
pub(crate) fn slack_link(url: &str, label: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }

    let label = single_line(label);
    let label = if label.is_empty() { url } else { label.as_str() };
    format!("<{}|{}>", url, label)
}

/// One decimal place, `87.5%` or `90%`.
pub(crate) fn format_percentage(value: Option<f64>) -> String {
    match value.filter(|n| n.is_finite() && *n >= 0.0) {
        Some(n) => format!("{}%", (n * 10.0).round() / 10.0),
        None => String::new(),
    }
}

/// `42s`, `15min`, `2h`, `1h 5min`.
pub(crate) fn format_duration_ms(value: Option<f64>) -> String {
    let Some(ms) = value.filter(|ms| ms.is_finite() && *ms > 0.0) else {
        return String::new();
    };

    if ms < 60_000.0 {
        let seconds = (ms / 1000.0).round() as u64;
        return if seconds > 0 { format!("{}s", seconds) } else { String::new() };
    }

    let total_minutes = (ms / 60_000.0).round() as u64;
    let (hours, minutes) = (total_minutes / 60, total_minutes % 60);
    match (hours, minutes) {
        (0, _) => format!("{}min", total_minutes),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}min", h, m),
    }
}

/// Epoch milliseconds (number or numeric string) rendered as São Paulo
/// local time, `dd/mm/yyyy, HH:MM:SS`.
pub(crate) fn format_timestamp(value: Option<&Value>) -> String {
    let millis = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(millis) = millis.filter(|ms| ms.is_finite() && *ms > 0.0) else {
        return String::new();
    };

    // America/Sao_Paulo has no daylight saving time.
    let sao_paulo = FixedOffset::west_opt(3 * 3600);
    match (DateTime::from_timestamp_millis(millis as i64), sao_paulo) {
        (Some(utc), Some(offset)) => utc.with_timezone(&offset).format("%d/%m/%Y, %H:%M:%S").to_string(),
        _ => String::new(),
    }
}

/// JavaScript-style truthiness for loosely typed identifiers.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
