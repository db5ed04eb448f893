//! Generic pass-through to an arbitrary HTTP API.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::proxy::types::normalize_headers;
use crate::proxy::{CachePolicy, ExternalApi, ExternalApiRequest, ExternalApiResponse, HttpMethod, QueryValue};
use crate::relay::{RelayError, RelayResult};
use crate::resilience::{CircuitBreakerOptions, RetryPolicy};

/// Body of `POST /proxy/forward`. Same shape as `ExternalApiRequest`, but
/// `url` and `method` may be missing and are checked here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwardRequestInput {
    pub url: Option<String>,
    pub method: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, QueryValue>,
    pub body: Option<Value>,
    pub timeout_ms: Option<u64>,
    pub cache: Option<CachePolicy>,
    pub retry: Option<RetryPolicy>,
    pub circuit_breaker: Option<CircuitBreakerOptions>,
}

#[derive(Clone)]
pub struct ForwardRequestService {
    api: Arc<dyn ExternalApi>,
}

impl ForwardRequestService {
    pub fn new(api: Arc<dyn ExternalApi>) -> Self {
        Self { api }
    }

    pub async fn execute(&self, input: ForwardRequestInput) -> RelayResult<ExternalApiResponse> {
        let request = into_request(input)?;
        Ok(self.api.send(request).await?)
    }
}

fn into_request(input: ForwardRequestInput) -> RelayResult<ExternalApiRequest> {
    let url = input.url.as_deref().map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return Err(RelayError::bad_request("Destination URL is required."));
    }

    let method = input
        .method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| RelayError::bad_request("HTTP method is required."))?;
    let method: HttpMethod = method
        .parse()
        .map_err(|_| RelayError::bad_request(format!("Unsupported HTTP method '{}'.", method)))?;

    let parsed = Url::parse(url).map_err(|_| RelayError::bad_request("Invalid destination URL."))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RelayError::bad_request("Only HTTP/HTTPS protocols are supported."));
    }

    Ok(ExternalApiRequest {
        url: url.to_string(),
        method,
        headers: normalize_headers(input.headers),
        query_params: input.query_params,
        body: input.body,
        timeout_ms: input.timeout_ms,
        cache: input.cache,
        retry: input.retry,
        circuit_breaker: input.circuit_breaker,
    })
}
