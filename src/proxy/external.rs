//! The external API proxy: breaker → cache → retry(client) → bookkeeping.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::config::schema::ProxySettings;
use crate::observability::metrics;
use crate::proxy::cache::ResponseCache;
use crate::proxy::client::{HttpClient, HttpRequest};
use crate::proxy::error::{ProxyError, ProxyResult};
use crate::proxy::types::{ExternalApiRequest, ExternalApiResponse};
use crate::resilience::{CircuitBreaker, RetryStrategy};

/// TTL for cacheable responses whose policy names none.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Anything that can forward an `ExternalApiRequest`.
#[async_trait]
pub trait ExternalApi: Send + Sync {
    async fn send(&self, request: ExternalApiRequest) -> ProxyResult<ExternalApiResponse>;
}

/// Resilient proxy for outbound calls.
///
/// Owns one cache and one circuit breaker shared by every destination.
pub struct ExternalApiProxy {
    client: HttpClient,
    cache: ResponseCache,
    retry: RetryStrategy,
    breaker: CircuitBreaker,
    default_cache_ttl: Duration,
}

impl ExternalApiProxy {
    pub fn new(client: HttpClient, breaker: CircuitBreaker) -> Self {
        Self {
            client,
            cache: ResponseCache::new(),
            retry: RetryStrategy::default(),
            breaker,
            default_cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Build the production proxy from configuration.
    pub fn from_settings(settings: &ProxySettings) -> ProxyResult<Self> {
        let client = HttpClient::with_reqwest()?
            .with_default_timeout(Duration::from_millis(settings.timeout_ms));
        Ok(Self::new(client, CircuitBreaker::new(settings.circuit_breaker))
            .with_retry_strategy(RetryStrategy::new(
                settings.retry.attempts,
                Duration::from_millis(settings.retry.backoff_ms),
            ))
            .with_default_cache_ttl(Duration::from_millis(settings.default_cache_ttl_ms)))
    }

    pub fn with_retry_strategy(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_default_cache_ttl(mut self, ttl: Duration) -> Self {
        self.default_cache_ttl = ttl;
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    async fn forward(&self, request: &ExternalApiRequest, url: &Url) -> ProxyResult<ExternalApiResponse> {
        tracing::info!(url = %url, method = %request.method, "proxy.forward.request");

        let response = self
            .client
            .request(HttpRequest {
                url: url.clone(),
                method: request.method,
                headers: request.headers.clone(),
                body: request.body.clone(),
                timeout_ms: request.timeout_ms,
            })
            .await?;

        tracing::info!(
            url = %url,
            method = %request.method,
            status = response.status,
            "proxy.forward.response"
        );

        Ok(ExternalApiResponse {
            status: response.status,
            data: response.data,
            headers: response.headers,
            from_cache: false,
        })
    }

    fn fail(&self, request: &ExternalApiRequest, error: ProxyError, started: Instant) -> ProxyError {
        tracing::error!(
            url = %request.url,
            method = %request.method,
            error = %error,
            kind = error.kind(),
            "proxy.forward.failed"
        );
        self.breaker.record_failure();
        metrics::record_proxy_request(request.method.as_str(), error.kind(), started);
        error
    }
}

#[async_trait]
impl ExternalApi for ExternalApiProxy {
    async fn send(&self, request: ExternalApiRequest) -> ProxyResult<ExternalApiResponse> {
        let started = Instant::now();

        if !self.breaker.allow_request() {
            tracing::error!(url = %request.url, "proxy.circuit.open");
            metrics::record_circuit_rejection();
            return Err(ProxyError::CircuitOpen);
        }

        let cache_key = resolve_cache_key(&request);
        if let Some(key) = cache_key.as_deref() {
            if let Some(mut cached) = self.cache.get(key) {
                tracing::info!(url = %request.url, method = %request.method, "proxy.cache.hit");
                metrics::record_cache_hit();
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let url = match build_url_with_query(&request) {
            Ok(url) => url,
            Err(error) => return Err(self.fail(&request, error, started)),
        };

        let outcome = self
            .retry
            .execute(|| self.forward(&request, &url), request.retry.as_ref())
            .await;

        match outcome {
            Ok(response) => {
                if let Some(key) = cache_key {
                    if (200..400).contains(&response.status) {
                        let ttl = request
                            .cache
                            .as_ref()
                            .and_then(|policy| policy.ttl_ms)
                            .map(Duration::from_millis)
                            .unwrap_or(self.default_cache_ttl);
                        self.cache.set(key, response.clone(), ttl);
                    }
                }

                self.breaker.record_success();
                metrics::record_proxy_request(request.method.as_str(), "success", started);
                Ok(response)
            }
            Err(error) => Err(self.fail(&request, error, started)),
        }
    }
}

/// Cache key for a request, if it should be cached at all.
pub(crate) fn resolve_cache_key(request: &ExternalApiRequest) -> Option<String> {
    let policy = request.cache.as_ref()?;

    if policy.enabled == Some(false) {
        return None;
    }

    if let Some(key) = policy.key.as_deref().filter(|key| !key.is_empty()) {
        return Some(key.to_string());
    }

    if policy.enabled != Some(true) {
        return None;
    }

    let query = Value::Object(
        request
            .query_params
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect(),
    );
    let body = request
        .body
        .clone()
        .unwrap_or_else(|| Value::Object(Default::default()));

    Some(format!(
        "{}:{}:{}:{}",
        request.method,
        request.url,
        canonical_json(&query),
        canonical_json(&body)
    ))
}

/// JSON text with object keys sorted at every level.
pub(crate) fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let fields: Vec<String> = entries
                .into_iter()
                .map(|(key, value)| format!("{}:{}", Value::String(key.clone()), canonical_json(value)))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

/// Destination URL with the request's query parameters applied.
///
/// A parameter replaces the first same-named pair already present in the URL,
/// in place, and drops any later repeats. New names are appended.
pub(crate) fn build_url_with_query(request: &ExternalApiRequest) -> ProxyResult<Url> {
    let mut url = Url::parse(&request.url)
        .map_err(|e| ProxyError::InvalidRequest(format!("invalid url '{}': {}", request.url, e)))?;

    if request.query_params.is_empty() {
        return Ok(url);
    }

    let mut placed: HashSet<&str> = HashSet::new();
    let mut merged: Vec<(String, String)> = Vec::new();
    for (name, value) in url.query_pairs() {
        match request.query_params.get_key_value(name.as_ref()) {
            Some((key, replacement)) => {
                if placed.insert(key.as_str()) {
                    merged.push((key.clone(), replacement.to_string()));
                }
            }
            None => merged.push((name.into_owned(), value.into_owned())),
        }
    }
    for (name, value) in &request.query_params {
        if !placed.contains(name.as_str()) {
            merged.push((name.clone(), value.to_string()));
        }
    }

    url.query_pairs_mut().clear().extend_pairs(merged);

    Ok(url)
}
