//! REST endpoint handlers: JSON:API documents, mandatory `version`,
//! cursor pagination keyed on record ids.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use super::authorize;
use crate::mock_server::state::{record_id, MockState};
use crate::ApiVersion;

/// Query parameters accepted by REST endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct RestQuery {
    pub version: Option<String>,
    pub limit: Option<usize>,
    pub starting_after: Option<String>,
    pub ending_before: Option<String>,
}

/// JSON:API create/update document.
#[derive(Debug, Deserialize)]
pub struct Document {
    pub data: DocumentData,
}

#[derive(Debug, Deserialize)]
pub struct DocumentData {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

fn error(status: StatusCode, detail: &str) -> Response {
    (
        status,
        Json(json!({
            "jsonapi": {"version": "1.0"},
            "errors": [{"status": status.as_u16().to_string(), "detail": detail}]
        })),
    )
        .into_response()
}

#[allow(clippy::result_large_err)]
fn check(state: &MockState, headers: &HeaderMap, query: &RestQuery) -> Result<String, Response> {
    authorize(state, headers)?;
    let Some(version) = &query.version else {
        return Err(error(StatusCode::BAD_REQUEST, "the version query parameter is required"));
    };
    version
        .parse::<ApiVersion>()
        .map_err(|_| error(StatusCode::BAD_REQUEST, "invalid version"))?;
    Ok(version.clone())
}

/// Slice `records` by cursor and build the JSON:API list document.
#[allow(clippy::result_large_err)]
fn cursor_page(
    records: &[Value],
    query: &RestQuery,
    path: &str,
    version: &str,
    default_limit: usize,
) -> Result<Value, Response> {
    let limit = query.limit.unwrap_or(default_limit).max(1);
    let position = |cursor: &str| {
        records
            .iter()
            .position(|r| record_id(r) == Some(cursor))
            .ok_or_else(|| error(StatusCode::BAD_REQUEST, "invalid cursor"))
    };

    let (start, end) = match (&query.starting_after, &query.ending_before) {
        (Some(after), _) => {
            let start = position(after)? + 1;
            (start, (start + limit).min(records.len()))
        }
        (None, Some(before)) => {
            let end = position(before)?;
            (end.saturating_sub(limit), end)
        }
        (None, None) => (0, limit.min(records.len())),
    };

    let link = |extra: Option<(&str, &str)>| {
        let mut link = format!("/rest/{path}?version={version}&limit={limit}");
        if let Some((key, value)) = extra {
            link.push_str(&format!("&{key}={}", urlencoding::encode(value)));
        }
        link
    };
    let mut links = Map::new();
    links.insert("self".into(), Value::String(link(None)));
    links.insert("first".into(), Value::String(link(None)));
    if end < records.len() && end > 0 {
        if let Some(id) = record_id(&records[end - 1]) {
            links.insert("next".into(), Value::String(link(Some(("starting_after", id)))));
        }
    }
    if start > 0 && start < records.len() {
        if let Some(id) = record_id(&records[start]) {
            links.insert("prev".into(), Value::String(link(Some(("ending_before", id)))));
        }
    }

    Ok(json!({
        "jsonapi": {"version": "1.0"},
        "data": records[start..end].to_vec(),
        "links": links,
    }))
}

/// GET /rest/self
pub async fn get_self(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Query(query): Query<RestQuery>,
) -> Response {
    let state = state.read().await;
    if let Err(rejected) = check(&state, &headers, &query) {
        return rejected;
    }
    match &state.user {
        Some(user) => Json(json!({"jsonapi": {"version": "1.0"}, "data": user})).into_response(),
        None => error(StatusCode::NOT_FOUND, "user not found"),
    }
}

/// GET /rest/orgs/{org_id}/targets
pub async fn list_targets(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
    Query(query): Query<RestQuery>,
) -> Response {
    list(&state, &headers, &query, &org_id, "targets").await
}

/// GET /rest/orgs/{org_id}/targets/{id}
pub async fn get_target(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path((org_id, id)): Path<(String, String)>,
    Query(query): Query<RestQuery>,
) -> Response {
    fetch(&state, &headers, &query, &org_id, &id, "targets").await
}

/// GET /rest/orgs/{org_id}/collections
pub async fn list_collections(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
    Query(query): Query<RestQuery>,
) -> Response {
    list(&state, &headers, &query, &org_id, "collections").await
}

/// GET /rest/orgs/{org_id}/collections/{id}
pub async fn get_collection(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path((org_id, id)): Path<(String, String)>,
    Query(query): Query<RestQuery>,
) -> Response {
    fetch(&state, &headers, &query, &org_id, &id, "collections").await
}

/// POST /rest/orgs/{org_id}/collections
pub async fn create_collection(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
    Query(query): Query<RestQuery>,
    Json(document): Json<Document>,
) -> Response {
    let mut state = state.write().await;
    if let Err(rejected) = check(&state, &headers, &query) {
        return rejected;
    }
    if document.data.resource_type != "collection" {
        return error(StatusCode::CONFLICT, "resource type must be 'collection'");
    }
    let record = state.create_collection(&org_id, document.data.attributes);
    (
        StatusCode::CREATED,
        Json(json!({"jsonapi": {"version": "1.0"}, "data": record})),
    )
        .into_response()
}

/// PATCH /rest/orgs/{org_id}/collections/{id}
pub async fn update_collection(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path((org_id, id)): Path<(String, String)>,
    Query(query): Query<RestQuery>,
    Json(document): Json<Document>,
) -> Response {
    let mut state = state.write().await;
    if let Err(rejected) = check(&state, &headers, &query) {
        return rejected;
    }
    match state.update_collection(&org_id, &id, document.data.attributes) {
        Some(record) => Json(json!({"jsonapi": {"version": "1.0"}, "data": record})).into_response(),
        None => error(StatusCode::NOT_FOUND, "collection not found"),
    }
}

/// DELETE /rest/orgs/{org_id}/collections/{id}
pub async fn delete_collection(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path((org_id, id)): Path<(String, String)>,
    Query(query): Query<RestQuery>,
) -> Response {
    let mut state = state.write().await;
    if let Err(rejected) = check(&state, &headers, &query) {
        return rejected;
    }
    if MockState::remove(&mut state.collections, &org_id, &id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error(StatusCode::NOT_FOUND, "collection not found")
    }
}

async fn list(
    state: &RwLock<MockState>,
    headers: &HeaderMap,
    query: &RestQuery,
    org_id: &str,
    table: &str,
) -> Response {
    let state = state.read().await;
    let version = match check(&state, headers, query) {
        Ok(version) => version,
        Err(rejected) => return rejected,
    };
    let records = match table {
        "targets" => state.targets.get(org_id),
        _ => state.collections.get(org_id),
    };
    let path = format!("orgs/{org_id}/{table}");
    match cursor_page(
        records.map(Vec::as_slice).unwrap_or_default(),
        query,
        &path,
        &version,
        state.default_limit,
    ) {
        Ok(document) => Json(document).into_response(),
        Err(rejected) => rejected,
    }
}

async fn fetch(
    state: &RwLock<MockState>,
    headers: &HeaderMap,
    query: &RestQuery,
    org_id: &str,
    id: &str,
    table: &str,
) -> Response {
    let state = state.read().await;
    if let Err(rejected) = check(&state, headers, query) {
        return rejected;
    }
    let records = match table {
        "targets" => &state.targets,
        _ => &state.collections,
    };
    match MockState::find(records, org_id, id) {
        Some(record) => Json(json!({"jsonapi": {"version": "1.0"}, "data": record})).into_response(),
        None => error(StatusCode::NOT_FOUND, &format!("{table} '{id}' not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"id": format!("r{i}")})).collect()
    }

    fn query(limit: usize, after: Option<&str>, before: Option<&str>) -> RestQuery {
        RestQuery {
            version: Some("2024-10-15".into()),
            limit: Some(limit),
            starting_after: after.map(String::from),
            ending_before: before.map(String::from),
        }
    }

    #[test]
    fn test_cursor_page_forward() {
        let all = records(5);
        let page = cursor_page(&all, &query(2, None, None), "things", "2024-10-15", 10).unwrap();
        assert_eq!(page["data"].as_array().unwrap().len(), 2);
        assert!(page["links"]["next"].as_str().unwrap().contains("starting_after=r1"));
        assert!(page["links"].get("prev").is_none());

        let last = cursor_page(&all, &query(2, Some("r3"), None), "things", "2024-10-15", 10).unwrap();
        assert_eq!(last["data"], json!([{"id": "r4"}]));
        assert!(last["links"].get("next").is_none());
        assert!(last["links"]["prev"].as_str().unwrap().contains("ending_before=r4"));
    }

    #[test]
    fn test_cursor_page_backward() {
        let all = records(5);
        let page = cursor_page(&all, &query(2, None, Some("r4")), "things", "2024-10-15", 10).unwrap();
        assert_eq!(page["data"], json!([{"id": "r2"}, {"id": "r3"}]));
        assert!(page["links"]["prev"].as_str().unwrap().contains("ending_before=r2"));
    }

    #[test]
    fn test_cursor_page_unknown_cursor() {
        assert!(cursor_page(&records(3), &query(2, Some("zz"), None), "t", "2024-10-15", 10).is_err());
    }
}
