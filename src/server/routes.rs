//! Route handlers.
//!
//! Every handler answers `200 OK`; outcomes, including failures, are carried
//! in the JSON body. That includes a project segment that cannot be decoded.

use axum::Json;
use axum::extract::State;
use issues_lib::ApiResponse;
use serde::Serialize;
use tracing::debug;

use super::AppState;
use super::payload::{ProjectPath, QueryPairs, RequestPayload};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// `GET /api/issues/{project}?field=value...`
pub async fn list_issues(
    State(state): State<AppState>,
    ProjectPath(project): ProjectPath,
    QueryPairs(query): QueryPairs,
) -> Json<ApiResponse> {
    debug!(%project, filters = query.len(), "GET issues");
    Json(state.service.list(&project, query).await)
}

/// `POST /api/issues/{project}`
pub async fn create_issue(
    State(state): State<AppState>,
    ProjectPath(project): ProjectPath,
    RequestPayload(payload): RequestPayload,
) -> Json<ApiResponse> {
    debug!(%project, fields = payload.len(), "POST issue");
    Json(state.service.create(&project, &payload).await)
}

/// `PUT /api/issues/{project}`
pub async fn update_issue(
    State(state): State<AppState>,
    ProjectPath(project): ProjectPath,
    RequestPayload(payload): RequestPayload,
) -> Json<ApiResponse> {
    debug!(%project, fields = payload.len(), "PUT issue");
    Json(state.service.update(&project, &payload).await)
}

/// `DELETE /api/issues/{project}`
pub async fn delete_issue(
    State(state): State<AppState>,
    ProjectPath(project): ProjectPath,
    RequestPayload(payload): RequestPayload,
) -> Json<ApiResponse> {
    debug!(%project, "DELETE issue");
    Json(state.service.delete(&project, &payload).await)
}
