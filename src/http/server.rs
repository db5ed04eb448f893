//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, body limit, CORS, metrics)
//! - Build the relay services on top of one shared external API proxy
//! - Bind server to listener and drain on shutdown

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::cors::{cors_middleware, CorsPolicy};
use crate::http::handlers;
use crate::observability::metrics;
use crate::proxy::{ExternalApi, ExternalApiProxy, ProxyError};
use crate::relay::{
    BrowserstackGateway, EnvironmentSummaryService, EventSummaryService, ExecutionRepository, ForwardRequestService,
    InMemoryExecutionRepository, SlackNotifier, TaskSummaryService,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forward: ForwardRequestService,
    pub task_summary: TaskSummaryService,
    pub event_summary: EventSummaryService,
    pub environment_summary: EnvironmentSummaryService,
    pub browserstack: BrowserstackGateway,
    pub executions: Arc<dyn ExecutionRepository>,
}

impl AppState {
    /// Wire every relay service to `api`.
    pub fn new(config: &RelayConfig, api: Arc<dyn ExternalApi>) -> Self {
        let notifier = SlackNotifier::new(api.clone(), config.slack.webhook_url.clone());
        let environment_notifier = SlackNotifier::new(
            api.clone(),
            config.slack.environment_webhook().map(str::to_string),
        );
        Self {
            forward: ForwardRequestService::new(api.clone()),
            task_summary: TaskSummaryService::new(notifier.clone()),
            event_summary: EventSummaryService::new(notifier),
            environment_summary: EnvironmentSummaryService::new(environment_notifier),
            browserstack: BrowserstackGateway::new(api, &config.browserstack),
            executions: Arc::new(InMemoryExecutionRepository::new()),
        }
    }
}

/// HTTP server for the QA relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a server whose outbound calls go through a fresh `ExternalApiProxy`.
    pub fn new(config: RelayConfig) -> Result<Self, ProxyError> {
        let proxy = ExternalApiProxy::from_settings(&config.proxy)?;
        tracing::info!(
            timeout_ms = config.proxy.timeout_ms,
            failure_threshold = config.proxy.circuit_breaker.failure_threshold,
            cooldown_ms = config.proxy.circuit_breaker.cooldown_ms,
            "External API proxy ready"
        );
        Ok(Self::with_external_api(config, proxy.into_shared()))
    }

    /// Create a server over any `ExternalApi` implementation.
    pub fn with_external_api(config: RelayConfig, api: Arc<dyn ExternalApi>) -> Self {
        let state = AppState::new(&config, api);
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let cors = Arc::new(CorsPolicy::new(config.cors.allowed_origins.clone()));

        Router::new()
            .route("/health", get(handlers::health))
            .route("/proxy/forward", post(handlers::forward))
            .route("/slack/task-summary", post(handlers::task_summary))
            .route("/slack/event-summary", post(handlers::event_summary))
            .route("/slack/environment-summary", post(handlers::environment_summary))
            .route("/browserstack/builds", get(handlers::list_builds))
            .route("/browserstack/builds/{id}", get(handlers::get_build))
            .route("/browserstack/builds/{id}/sessions", get(handlers::list_build_sessions))
            .route("/browserstack/sessions/{id}", get(handlers::get_session))
            .route("/browserstack/sessions/{id}/logs", get(handlers::get_session_logs))
            .route("/browserstack/browsers", get(handlers::list_browsers))
            .route("/browserstack/app-automate/builds", get(handlers::list_app_builds))
            .route(
                "/browserstack/app-automate/builds/{id}/sessions",
                get(handlers::list_app_build_sessions),
            )
            .route("/browserstack/app-automate/sessions/{id}", get(handlers::get_app_session))
            .route(
                "/browserstack/app-automate/sessions/{id}/networklogs",
                get(handlers::get_app_session_network_logs),
            )
            .route(
                "/automation/executions",
                post(handlers::register_execution).get(handlers::list_executions),
            )
            .fallback(handlers::not_found)
            .method_not_allowed_fallback(handlers::method_not_allowed)
            .with_state(state)
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
            .layer(middleware::from_fn(track_metrics))
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            allowed_origins = ?self.config.cors.allowed_origins,
            slack = self.config.slack.webhook_url.is_some(),
            browserstack = self.config.browserstack.credentials().is_some(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().clone();

    let response = next.run(req).await;
    let status = response.status().as_u16();

    metrics::record_http_request(&route, status);
    tracing::debug!(
        method = %method,
        route = %route,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request handled"
    );

    response
}
