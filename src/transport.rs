//! Authenticated HTTP transport bound to one API generation.
//!
//! A [`Transport`] is the resolved configuration a [`Manager`](crate::Manager)
//! talks through: base URL, generation and (for REST) version. It holds no
//! per-call state and is safe to share between concurrent traversals. It
//! never retries; see [`RetryPolicy`](crate::RetryPolicy) for a caller-side
//! wrapper.

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use url::Url;

use crate::client::Credential;
use crate::descriptor::Generation;
use crate::error::{Result, SnykError};
use crate::version::ApiVersion;

const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// A decoded HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body; `null` when the body was empty.
    pub body: Value,
}

/// HTTP transport for one API generation.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    credential: Credential,
    generation: Generation,
    base_url: Arc<Url>,
    version: Option<ApiVersion>,
}

impl Transport {
    pub(crate) fn new(
        http: Client,
        credential: Credential,
        generation: Generation,
        base_url: Arc<Url>,
        version: Option<ApiVersion>,
    ) -> Self {
        Self {
            http,
            credential,
            generation,
            base_url,
            version,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The REST version injected into calls, if any.
    pub fn version(&self) -> Option<ApiVersion> {
        self.version
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fail unless this transport can issue REST calls.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a REST transport without a version.
    pub fn ensure_version(&self) -> Result<()> {
        if self.generation == Generation::Rest && self.version.is_none() {
            return Err(SnykError::config(
                "REST API calls require a version: configure one on the client or pin it on the resource",
            ));
        }
        Ok(())
    }

    /// Build the request URL.
    ///
    /// `path` may be relative to the base URL, carry its own query string
    /// (server-provided links) or be absolute. Query keys already present
    /// in `path` take precedence over `query`. REST URLs always end up with
    /// a `version` parameter.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)?
        } else {
            self.base_url.join(self.strip_base_segment(path.trim_start_matches('/')))?
        };

        let present: HashSet<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        let mut extra: Vec<(String, String)> = query
            .iter()
            .filter(|(k, _)| !present.contains(k))
            .cloned()
            .collect();

        if self.generation == Generation::Rest
            && !present.contains("version")
            && !extra.iter().any(|(k, _)| k == "version")
        {
            self.ensure_version()?;
            if let Some(version) = self.version {
                extra.push(("version".to_string(), version.to_string()));
            }
        }

        if !extra.is_empty() {
            url.query_pairs_mut().extend_pairs(extra);
        }
        Ok(url)
    }

    /// Links such as `/rest/orgs/...` repeat the last base URL segment.
    fn strip_base_segment<'a>(&self, path: &'a str) -> &'a str {
        let last = self
            .base_url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last());
        match last {
            Some(segment) => path
                .strip_prefix(segment)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(path),
            None => path,
        }
    }

    /// Issue a request.
    ///
    /// # Errors
    ///
    /// - `Configuration` for a REST call without a version or a bad URL
    /// - `Transport` for network failures
    /// - `Api` for 4xx/5xx statuses
    /// - `Protocol` for a success body that is not JSON
    #[tracing::instrument(skip(self, query, body), fields(generation = %self.generation))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<RawResponse> {
        let url = self.url_for(path, query)?;
        tracing::debug!(url = %url, "sending request");

        let mut request = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, self.credential.header_value()?);

        if let Some(body) = body {
            let content_type = match self.generation {
                Generation::Rest => JSON_API_CONTENT_TYPE,
                Generation::V1 => "application/json",
            };
            let bytes = serde_json::to_vec(body)
                .map_err(|e| SnykError::protocol(format!("failed to encode request body: {e}")))?;
            request = request.header(CONTENT_TYPE, content_type).body(bytes);
        }

        let response = request.send().await?;
        Self::check_response(response).await
    }

    /// GET with query parameters.
    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<RawResponse> {
        self.request(Method::GET, path, query, None).await
    }

    /// Decode the body and convert error statuses.
    async fn check_response(response: Response) -> Result<RawResponse> {
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        if status.is_success() {
            let body = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).map_err(|e| {
                    SnykError::protocol(format!("response body is not valid JSON: {e}"))
                })?
            };
            return Ok(RawResponse {
                status,
                headers,
                body,
            });
        }

        let retry_after_secs = headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        let message = extract_error_message(&body, status);
        tracing::debug!(status = status.as_u16(), %message, "request failed");

        Err(SnykError::Api {
            status: status.as_u16(),
            message,
            body,
            retry_after_secs,
        })
    }
}

/// Pull a human-readable message out of a v1 or JSON:API error body.
fn extract_error_message(body: &Value, status: StatusCode) -> String {
    if let Some(first) = body
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
    {
        if let Some(detail) = first.get("detail").and_then(Value::as_str) {
            return detail.to_string();
        }
        if let Some(title) = first.get("title").and_then(Value::as_str) {
            return title.to_string();
        }
    }
    for key in ["message", "error"] {
        if let Some(msg) = body.get(key).and_then(Value::as_str) {
            return msg.to_string();
        }
    }
    match body {
        Value::String(text) if !text.is_empty() => text.clone(),
        _ => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(generation: Generation, base: &str, version: Option<&str>) -> Transport {
        Transport::new(
            Client::new(),
            Credential::new("token"),
            generation,
            Arc::new(Url::parse(base).unwrap()),
            version.map(|v| v.parse().unwrap()),
        )
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_rest_url_gets_version() {
        let t = transport(Generation::Rest, "https://api.snyk.io/rest/", Some("2024-10-15"));
        let url = t.url_for("orgs/o1/targets", &params(&[("limit", "10")])).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.snyk.io/rest/orgs/o1/targets?limit=10&version=2024-10-15"
        );
    }

    #[test]
    fn test_rest_url_without_version_fails() {
        let t = transport(Generation::Rest, "https://api.snyk.io/rest/", None);
        let err = t.url_for("orgs/o1/targets", &[]).unwrap_err();
        assert!(matches!(err, SnykError::Configuration(_)));
    }

    #[test]
    fn test_existing_version_is_kept() {
        let t = transport(Generation::Rest, "https://api.snyk.io/rest/", None);
        let url = t.url_for("orgs/o1/targets?version=2022-02-16~experimental", &[]).unwrap();
        assert_eq!(url.query(), Some("version=2022-02-16~experimental"));
    }

    #[test]
    fn test_path_query_wins_over_params() {
        let t = transport(Generation::Rest, "https://api.snyk.io/rest/", Some("2024-10-15"));
        let url = t
            .url_for("orgs/o1/projects?limit=100", &params(&[("limit", "10")]))
            .unwrap();
        let limits: Vec<_> = url.query_pairs().filter(|(k, _)| k == "limit").collect();
        assert_eq!(limits.len(), 1);
        assert_eq!(limits[0].1, "100");
    }

    #[test]
    fn test_link_with_repeated_base_segment() {
        let t = transport(Generation::Rest, "https://api.snyk.io/rest/", Some("2024-10-15"));
        let url = t.url_for("/rest/orgs/o1/targets?starting_after=abc", &[]).unwrap();
        assert_eq!(url.path(), "/rest/orgs/o1/targets");

        let url = t.url_for("/orgs/o1/targets", &[]).unwrap();
        assert_eq!(url.path(), "/rest/orgs/o1/targets");
    }

    #[test]
    fn test_absolute_url() {
        let t = transport(Generation::Rest, "https://api.snyk.io/rest/", Some("2024-10-15"));
        let url = t.url_for("https://api.eu.snyk.io/rest/self", &[]).unwrap();
        assert_eq!(url.host_str(), Some("api.eu.snyk.io"));
        assert!(url.query().unwrap().contains("version=2024-10-15"));
    }

    #[test]
    fn test_v1_never_gets_version() {
        let t = transport(Generation::V1, "https://api.snyk.io/v1/", None);
        let url = t.url_for("orgs", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.snyk.io/v1/orgs");
        assert!(t.ensure_version().is_ok());
    }

    #[test]
    fn test_error_message_extraction() {
        let jsonapi = serde_json::json!({"errors": [{"title": "Bad", "detail": "Org not found"}]});
        assert_eq!(extract_error_message(&jsonapi, StatusCode::NOT_FOUND), "Org not found");

        let v1 = serde_json::json!({"message": "Invalid token"});
        assert_eq!(extract_error_message(&v1, StatusCode::UNAUTHORIZED), "Invalid token");

        assert_eq!(
            extract_error_message(&Value::Null, StatusCode::BAD_GATEWAY),
            "HTTP 502 Bad Gateway"
        );
    }
}
