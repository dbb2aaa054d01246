//! v1 endpoint handlers: flat JSON bodies, no version parameter.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tokio::sync::RwLock;

use super::authorize;
use crate::mock_server::state::MockState;

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"code": 404, "message": format!("{what} not found")})),
    )
        .into_response()
}

/// GET /v1/orgs
pub async fn list_orgs(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
) -> Response {
    let state = state.read().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    Json(json!({"orgs": state.orgs})).into_response()
}

/// GET /v1/org/{org_id}/projects
pub async fn list_projects(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
) -> Response {
    let state = state.read().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    if !state.has_org(&org_id) {
        return not_found("Org");
    }
    let projects = state.projects.get(&org_id).cloned().unwrap_or_default();
    Json(json!({"org": {"id": org_id}, "projects": projects})).into_response()
}

/// GET /v1/org/{org_id}/project/{id}
pub async fn get_project(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path((org_id, id)): Path<(String, String)>,
) -> Response {
    let state = state.read().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    match MockState::find(&state.projects, &org_id, &id) {
        Some(project) => Json(project.clone()).into_response(),
        None => not_found("Project"),
    }
}

/// DELETE /v1/org/{org_id}/project/{id}
pub async fn delete_project(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path((org_id, id)): Path<(String, String)>,
) -> Response {
    let mut state = state.write().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    if MockState::remove(&mut state.projects, &org_id, &id) {
        StatusCode::OK.into_response()
    } else {
        not_found("Project")
    }
}
