//! HTTP surface of the relay, driven in-process with a scripted external API.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use qa_relay::config::RelayConfig;
use qa_relay::proxy::{ExternalApi, ExternalApiRequest, ExternalApiResponse, ProxyError, ProxyResult};
use qa_relay::HttpServer;

/// Answers every call with the next scripted outcome and keeps the requests.
struct ScriptedApi {
    outcome: Mutex<Option<ProxyResult<ExternalApiResponse>>>,
    sent: Mutex<Vec<ExternalApiRequest>>,
}

impl ScriptedApi {
    fn replying(status: u16, data: Value) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Some(Ok(ExternalApiResponse {
                status,
                data,
                headers: BTreeMap::from([("content-type".to_string(), "application/json".to_string())]),
                from_cache: false,
            }))),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn failing(error: ProxyError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Some(Err(error))),
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ExternalApi for ScriptedApi {
    async fn send(&self, request: ExternalApiRequest) -> ProxyResult<ExternalApiResponse> {
        self.sent.lock().unwrap().push(request);
        match self.outcome.lock().unwrap().as_ref() {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(ProxyError::CircuitOpen)) => Err(ProxyError::CircuitOpen),
            Some(Err(ProxyError::Timeout)) => Err(ProxyError::Timeout),
            _ => Err(ProxyError::InvalidRequest("unscripted".into())),
        }
    }
}

fn config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.slack.webhook_url = Some("https://hooks.slack.com/services/T/B/X".into());
    config.browserstack.username = Some("qa".into());
    config.browserstack.access_key = Some("key".into());
    config.security.max_body_size = 1024;
    config
}

fn app(config: RelayConfig, api: Arc<ScriptedApi>) -> Router {
    HttpServer::with_external_api(config, api).router()
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, headers, body) = call(app(config(), ScriptedApi::replying(200, json!({}))), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_unknown_route_and_wrong_method() {
    let api = ScriptedApi::replying(200, json!({}));

    let (status, _, body) = call(app(config(), api.clone()), get("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Not found."}));

    let (status, _, body) = call(app(config(), api), get("/proxy/forward")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({"error": "Method not allowed."}));
}

#[tokio::test]
async fn test_cors_allow_list() {
    let api = ScriptedApi::replying(200, json!({}));

    let allowed = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = call(app(config(), api.clone()), allowed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["access-control-allow-origin"], "http://localhost:5173");
    assert_eq!(headers["access-control-allow-methods"], "GET,POST,OPTIONS");

    let denied = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = call(app(config(), api.clone()), denied).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": "CORS origin not allowed."}));

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/proxy/forward")
        .header(header::ORIGIN, "https://qualitydigital-qamanager.vercel.app")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = call(app(config(), api), preflight).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
}

#[tokio::test]
async fn test_forward_replies_with_upstream_status() {
    let api = ScriptedApi::replying(201, json!({"id": 7}));
    let body = json!({
        "url": "https://api.example.com/items",
        "method": "post",
        "body": {"name": "x"},
        "cache": {"enabled": false}
    });

    let (status, _, reply) = call(app(config(), api.clone()), post_json("/proxy/forward", body.to_string())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["data"], json!({"id": 7}));
    assert_eq!(reply["fromCache"], json!(false));
    assert_eq!(reply["headers"]["content-type"], json!("application/json"));

    let sent = api.sent.lock().unwrap();
    assert_eq!(sent[0].url, "https://api.example.com/items");
    assert_eq!(sent[0].body, Some(json!({"name": "x"})));
}

#[tokio::test]
async fn test_forward_validation_and_body_errors() {
    let api = ScriptedApi::replying(200, json!({}));

    let (status, _, body) = call(
        app(config(), api.clone()),
        post_json("/proxy/forward", r#"{"url":"ftp://x","method":"GET"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Only HTTP/HTTPS protocols are supported."}));

    let (status, _, body) = call(app(config(), api.clone()), post_json("/proxy/forward", "{oops")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid JSON payload."}));

    let oversized = format!(r#"{{"url":"https://x","method":"GET","body":"{}"}}"#, "a".repeat(4096));
    let (status, _, body) = call(app(config(), api.clone()), post_json("/proxy/forward", oversized)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, json!({"error": "Payload too large."}));

    assert!(api.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_proxy_failures_map_to_status() {
    let body = r#"{"url":"https://api.example.com","method":"GET"}"#;

    let (status, _, reply) = call(
        app(config(), ScriptedApi::failing(ProxyError::CircuitOpen)),
        post_json("/proxy/forward", body),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply, json!({"error": "External API temporarily unavailable."}));

    let (status, _, _) = call(
        app(config(), ScriptedApi::failing(ProxyError::Timeout)),
        post_json("/proxy/forward", body),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_task_summary_route() {
    let api = ScriptedApi::replying(200, json!("ok"));
    let payload = json!({
        "scenario": {"title": "Checkout"},
        "environmentSummary": {"scenariosCount": 3}
    });

    let (status, _, body) = call(
        app(config(), api.clone()),
        post_json("/slack/task-summary", payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Slack task summary sent."}));
    let sent = api.sent.lock().unwrap();
    assert_eq!(sent[0].url, "https://hooks.slack.com/services/T/B/X");
    let text = sent[0].body.as_ref().unwrap()["text"].as_str().unwrap().to_string();
    assert!(text.contains("• *Cenários:* 3"));
}

#[tokio::test]
async fn test_task_summary_requires_title_and_config() {
    let api = ScriptedApi::replying(200, json!("ok"));

    let (status, _, body) = call(app(config(), api.clone()), post_json("/slack/task-summary", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Scenario title is required."}));

    let mut unconfigured = config();
    unconfigured.slack.webhook_url = None;
    let (status, _, body) = call(
        app(unconfigured, api),
        post_json("/slack/task-summary", r#"{"scenario":{"title":"x"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Slack integration is not configured."}));
}

#[tokio::test]
async fn test_browserstack_routes() {
    let api = ScriptedApi::replying(
        200,
        json!([{"automation_build": {"hashed_id": "b1", "name": "Nightly"}}]),
    );

    let (status, _, body) = call(app(config(), api.clone()), get("/browserstack/builds")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": "b1", "name": "Nightly"}]));

    let (status, _, _) = call(app(config(), api.clone()), get("/browserstack/app-automate/sessions/s-9")).await;
    assert_eq!(status, StatusCode::OK);

    let urls: Vec<String> = api.sent.lock().unwrap().iter().map(|r| r.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            "https://api.browserstack.com/automate/builds.json",
            "https://api-cloud.browserstack.com/app-automate/sessions/s-9.json",
        ]
    );

    let mut unconfigured = config();
    unconfigured.browserstack.access_key = None;
    let (status, _, body) = call(app(unconfigured, api), get("/browserstack/browsers")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "BrowserStack integration is not configured."}));
}

#[tokio::test]
async fn test_automation_executions_round_trip() {
    let app = app(config(), ScriptedApi::replying(200, json!({})));

    let (status, _, created) = call(
        app.clone(),
        post_json(
            "/automation/executions",
            r#"{"username":"ci","password":"secret","status":"passed","provider":"github"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].is_string());
    assert!(created["receivedAt"].is_string());

    let (status, _, _) = call(app.clone(), post_json("/automation/executions", r#"{"username":"ci"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, listed) = call(app, get("/automation/executions")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], created["id"]);
    assert_eq!(listed[0]["provider"], json!("github"));
    assert!(listed[0].get("password").is_none());
}

#[tokio::test]
async fn test_event_summary_route() {
    let api = ScriptedApi::replying(200, json!("ok"));
    let payload = json!({
        "eventName": "Black Friday",
        "executionWindow": "24/11 00h",
        "stores": [{"name": "Loja Centro", "responsibles": ["<@U01AAA>"]}]
    });

    let (status, _, body) = call(
        app(config(), api.clone()),
        post_json("/slack/event-summary", payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Slack event summary sent."}));
    let sent = api.sent.lock().unwrap();
    assert_eq!(sent[0].url, "https://hooks.slack.com/services/T/B/X");
    let text = sent[0].body.as_ref().unwrap()["text"].as_str().unwrap().to_string();
    assert!(text.starts_with(":mega: *INFORMATIVO 24/11 00h*"));
    assert!(text.contains("• *Loja Centro:* <@U01AAA>"));
}

#[tokio::test]
async fn test_event_summary_validation_and_config() {
    let api = ScriptedApi::replying(200, json!("ok"));

    let (status, _, body) = call(
        app(config(), api.clone()),
        post_json("/slack/event-summary", r#"{"eventName":"  "}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Event name is required."}));

    let mut unconfigured = config();
    unconfigured.slack.webhook_url = None;
    let (status, _, body) = call(app(unconfigured, api.clone()), post_json("/slack/event-summary", "{}")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Slack integration is not configured."}));

    assert!(api.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_environment_summary_route() {
    let api = ScriptedApi::replying(200, json!("ok"));
    let mut config = config();
    config.slack.environment_webhook_url = Some("https://hooks.slack.com/services/T/B/ENV".into());
    let payload = json!({"environment": {"id": "env-1", "label": "Staging", "bugCount": 2}});

    let (status, _, body) = call(
        app(config, api.clone()),
        post_json("/slack/environment-summary", payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Slack environment summary sent."}));
    let sent = api.sent.lock().unwrap();
    assert_eq!(sent[0].url, "https://hooks.slack.com/services/T/B/ENV");
    let text = sent[0].body.as_ref().unwrap()["text"].as_str().unwrap().to_string();
    assert_eq!(
        text,
        ":white_check_mark: *Resumo do ambiente Staging*\n🐞 *Bugs:* 2 bugs"
    );
}

#[tokio::test]
async fn test_environment_summary_validation_and_config() {
    let api = ScriptedApi::replying(200, json!("ok"));

    let (status, _, body) = call(
        app(config(), api.clone()),
        post_json("/slack/environment-summary", r#"{"environment":{"label":"Staging"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Environment data is required."}));

    let mut unconfigured = config();
    unconfigured.slack.webhook_url = None;
    let (status, _, body) = call(
        app(unconfigured, api.clone()),
        post_json("/slack/environment-summary", r#"{"environment":{"id":"env-1"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Slack integration is not configured."}));

    assert!(api.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_browserstack_session_log_routes() {
    let api = ScriptedApi::replying(200, json!("2024-03-01 12:00:00 REQUEST [GET /wd/hub/status]"));

    let (status, _, body) = call(app(config(), api.clone()), get("/browserstack/sessions/s-1/logs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("2024-03-01 12:00:00 REQUEST [GET /wd/hub/status]"));

    let (status, _, _) = call(
        app(config(), api.clone()),
        get("/browserstack/app-automate/sessions/s-2/networklogs"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = call(app(config(), api.clone()), get("/browserstack/sessions/s.json/logs")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let urls: Vec<String> = api.sent.lock().unwrap().iter().map(|r| r.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            "https://api.browserstack.com/automate/sessions/s-1/logs",
            "https://api-cloud.browserstack.com/app-automate/sessions/s-2/networklogs",
        ]
    );
}
