//! Single outbound HTTP call.
//!
//! # Responsibilities
//! - Serialize the request body according to its content type
//! - Enforce the request deadline around the transport call
//! - Decode the response body (JSON or text)
//! - Normalize transport failures into tagged `ProxyError`s
//!
//! # Design Decisions
//! - The network is reached through the `Transport` trait so tests can
//!   substitute an in-memory fake
//! - A decode failure is reported, never retried here

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::proxy::error::{ProxyError, ProxyResult, TransportError};
use crate::proxy::types::{normalize_headers, HttpMethod};
use crate::resilience::timeouts::{self, DEFAULT_REQUEST_TIMEOUT_MS};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Wire-ready request handed to a transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

/// Raw response read from a transport.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

/// The "perform fetch" capability.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport used in production.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("qa-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Repeated header names (e.g. `set-cookie`) are joined with `", "`.
fn collect_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        collected
            .entry(name.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}

/// Request accepted by `HttpClient::request`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout_ms: Option<u64>,
}

/// Decoded response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub data: Value,
    pub headers: BTreeMap<String, String>,
}

/// HTTP client with deadline enforcement and content-type aware bodies.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    default_timeout: Duration,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            default_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }

    /// Client over a fresh `reqwest` transport.
    pub fn with_reqwest() -> ProxyResult<Self> {
        let transport = ReqwestTransport::new().map_err(ProxyError::Unreachable)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Deadline used when a request carries none.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub async fn request(&self, request: HttpRequest) -> ProxyResult<HttpResponse> {
        let deadline = timeouts::request_timeout(request.timeout_ms, self.default_timeout);
        let headers = normalize_headers(request.headers);
        let body = serialize_body(&headers, request.body.as_ref())?;
        let transport_request = TransportRequest {
            url: request.url,
            method: request.method,
            headers,
            body,
        };

        let response = match timeouts::enforce(deadline, self.transport.perform(transport_request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                tracing::debug!(error = %error, "Transport failure");
                return Err(ProxyError::Unreachable(error));
            }
            Err(elapsed) => {
                tracing::debug!(deadline = ?elapsed.0, "Outbound call timed out");
                return Err(ProxyError::Timeout);
            }
        };

        let data = decode_body(&response)?;
        Ok(HttpResponse {
            status: response.status,
            data,
            headers: response.headers,
        })
    }
}

fn header_value<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn is_json(headers: &BTreeMap<String, String>) -> bool {
    header_value(headers, "content-type").is_some_and(|ct| ct.contains(JSON_CONTENT_TYPE))
}

fn serialize_body(headers: &BTreeMap<String, String>, body: Option<&Value>) -> ProxyResult<Option<Vec<u8>>> {
    let body = match body {
        None | Some(Value::Null) => return Ok(None),
        Some(body) => body,
    };

    if is_json(headers) {
        return serde_json::to_vec(body)
            .map(Some)
            .map_err(|e| ProxyError::InvalidRequest(e.to_string()));
    }

    match body {
        Value::String(raw) => Ok(Some(raw.clone().into_bytes())),
        other => Ok(Some(other.to_string().into_bytes())),
    }
}

fn decode_body(response: &TransportResponse) -> ProxyResult<Value> {
    if is_json(&response.headers) {
        return serde_json::from_slice(&response.body).map_err(ProxyError::Decode);
    }

    Ok(Value::String(String::from_utf8_lossy(&response.body).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Transport returning a canned response and remembering what it was sent.
    struct CannedTransport {
        response: TransportResponse,
        delay: Option<Duration>,
        seen: Mutex<Vec<TransportRequest>>,
    }

    impl CannedTransport {
        fn new(status: u16, content_type: &str, body: &str) -> Self {
            let mut headers = BTreeMap::new();
            headers.insert("content-type".to_string(), content_type.to_string());
            Self {
                response: TransportResponse {
                    status,
                    headers,
                    body: body.as_bytes().to_vec(),
                },
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.response.clone())
        }
    }

    struct RefusingTransport;

    #[async_trait]
    impl Transport for RefusingTransport {
        async fn perform(&self, _request: TransportRequest) -> Result<TransportResponse, TransportError> {
            Err(TransportError::new("connection refused"))
        }
    }

    fn request(headers: &[(&str, &str)], body: Option<Value>) -> HttpRequest {
        HttpRequest {
            url: Url::parse("https://api.example.com/test").unwrap(),
            method: HttpMethod::Post,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body,
            timeout_ms: None,
        }
    }

    #[tokio::test]
    async fn test_json_body_serialized_and_decoded() {
        let transport = Arc::new(CannedTransport::new(201, "application/json; charset=utf-8", r#"{"id":7}"#));
        let client = HttpClient::new(transport.clone());

        let response = client
            .request(request(&[("Content-Type", "application/json")], Some(json!({"name": "x"}))))
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.data, json!({"id": 7}));

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].body.as_deref(), Some(br#"{"name":"x"}"#.as_slice()));
    }

    #[tokio::test]
    async fn test_content_type_lookup_is_case_insensitive() {
        let transport = Arc::new(CannedTransport::new(200, "text/plain", "ok"));
        let client = HttpClient::new(transport.clone());

        client
            .request(request(&[("CONTENT-TYPE", "application/json")], Some(json!("quoted"))))
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].body.as_deref(), Some(br#""quoted""#.as_slice()));
    }

    #[tokio::test]
    async fn test_transport_sees_one_content_type() {
        let transport = Arc::new(CannedTransport::new(200, "application/json", "{}"));
        let client = HttpClient::new(transport.clone());

        client
            .request(request(
                &[("content-type", "text/plain"), ("Content-Type", "application/json")],
                Some(json!({"a": 1})),
            ))
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        let content_types: Vec<&String> = seen[0]
            .headers
            .keys()
            .filter(|name| name.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
    }

    #[test]
    fn test_repeated_response_headers_are_joined() {
        use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, SET_COOKIE};

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let collected = collect_headers(&headers);

        assert_eq!(collected["set-cookie"], "a=1; Path=/, b=2");
        assert_eq!(collected["content-type"], "text/plain");
    }

    #[tokio::test]
    async fn test_non_json_body_passes_through() {
        let transport = Arc::new(CannedTransport::new(200, "text/plain", "pong"));
        let client = HttpClient::new(transport.clone());

        let response = client
            .request(request(&[("Content-Type", "text/plain")], Some(json!("ping"))))
            .await
            .unwrap();

        assert_eq!(response.data, json!("pong"));
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].body.as_deref(), Some(b"ping".as_slice()));
    }

    #[tokio::test]
    async fn test_null_body_is_not_sent() {
        let transport = Arc::new(CannedTransport::new(204, "text/plain", ""));
        let client = HttpClient::new(transport.clone());

        client.request(request(&[], Some(Value::Null))).await.unwrap();

        assert!(transport.seen.lock().unwrap()[0].body.is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let transport = Arc::new(CannedTransport::new(200, "application/json", "{not json"));
        let client = HttpClient::new(transport);

        let err = client.request(request(&[], None)).await.unwrap_err();
        assert!(matches!(err, ProxyError::Decode(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_unreachable() {
        let client = HttpClient::new(Arc::new(RefusingTransport));

        let err = client.request(request(&[], None)).await.unwrap_err();
        assert!(matches!(err, ProxyError::Unreachable(_)));
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_transport_times_out() {
        let mut canned = CannedTransport::new(200, "text/plain", "late");
        canned.delay = Some(Duration::from_secs(30));
        let client = HttpClient::new(Arc::new(canned));

        let mut slow = request(&[], None);
        slow.timeout_ms = Some(50);
        let err = client.request(slow).await.unwrap_err();

        assert!(matches!(err, ProxyError::Timeout));
        assert_eq!(err.status_code(), 504);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timeout_applies() {
        let mut canned = CannedTransport::new(200, "text/plain", "late");
        canned.delay = Some(Duration::from_secs(11));
        let client = HttpClient::new(Arc::new(canned));

        let err = client.request(request(&[], None)).await.unwrap_err();
        assert!(matches!(err, ProxyError::Timeout));
    }
}
