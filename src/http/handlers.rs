//! Route handlers. Each one unpacks the request, calls a relay service and
//! renders its result as JSON.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::http::request::JsonBody;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::relay::{
    AutomationExecution, AutomationExecutionPayload, BrowserstackBuild, EnvironmentSummaryPayload, EventSummaryPayload,
    ForwardRequestInput, TaskSummaryPayload,
};

type ApiResult<T> = Result<T, ApiError>;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Replies with the upstream status and its decoded body.
pub async fn forward(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ForwardRequestInput>,
) -> ApiResult<Response> {
    let response = state.forward.execute(input).await?;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    Ok((
        status,
        Json(json!({
            "data": response.data,
            "headers": response.headers,
            "fromCache": response.from_cache,
        })),
    )
        .into_response())
}

pub async fn task_summary(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TaskSummaryPayload>,
) -> ApiResult<Json<Value>> {
    state.task_summary.send_task_summary(&payload).await?;
    Ok(Json(json!({ "message": "Slack task summary sent." })))
}

pub async fn event_summary(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<EventSummaryPayload>,
) -> ApiResult<Json<Value>> {
    state.event_summary.send_event_summary(&payload).await?;
    Ok(Json(json!({ "message": "Slack event summary sent." })))
}

pub async fn environment_summary(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<EnvironmentSummaryPayload>,
) -> ApiResult<Json<Value>> {
    state.environment_summary.send_environment_summary(&payload).await?;
    Ok(Json(json!({ "message": "Slack environment summary sent." })))
}

pub async fn list_builds(State(state): State<AppState>) -> ApiResult<Json<Vec<BrowserstackBuild>>> {
    Ok(Json(state.browserstack.list_builds().await?))
}

pub async fn get_build(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    Ok(Json(state.browserstack.get_build(&id).await?))
}

pub async fn list_build_sessions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.browserstack.list_build_sessions(&id).await?))
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    Ok(Json(state.browserstack.get_session(&id).await?))
}

pub async fn get_session_logs(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    Ok(Json(state.browserstack.get_session_logs(&id).await?))
}

pub async fn list_browsers(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(state.browserstack.list_browsers().await?))
}

pub async fn list_app_builds(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(state.browserstack.list_app_builds().await?))
}

pub async fn list_app_build_sessions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.browserstack.list_app_build_sessions(&id).await?))
}

pub async fn get_app_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.browserstack.get_app_session(&id).await?))
}

pub async fn get_app_session_network_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.browserstack.get_app_session_network_logs(&id).await?))
}

pub async fn register_execution(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AutomationExecutionPayload>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let execution = AutomationExecution::from_payload(payload)?;
    let reply = json!({ "id": execution.id, "receivedAt": execution.received_at });

    tracing::info!(id = %execution.id, username = %execution.username, "Automation execution registered");
    state.executions.save(execution).await?;

    Ok((StatusCode::CREATED, Json(reply)))
}

pub async fn list_executions(State(state): State<AppState>) -> ApiResult<Json<Vec<AutomationExecution>>> {
    Ok(Json(state.executions.list().await?))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
