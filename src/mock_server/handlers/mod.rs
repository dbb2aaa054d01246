//! HTTP handlers for mock Snyk endpoints.

mod rest;
mod v1;

pub use rest::*;
pub use v1::*;

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::MockState;

/// Reject requests without the configured token.
#[allow(clippy::result_large_err)]
pub(crate) fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(token) = &state.required_token else {
        return Ok(());
    };
    let expected = format!("token {token}");
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"code": 401, "message": "Invalid auth token provided"})),
        )
            .into_response()),
    }
}
