//! Mock Snyk API server.
//!
//! Provides an axum-based HTTP server that simulates both Snyk API
//! generations on one port: v1 under `/v1`, REST under `/rest`.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::{DefaultScenario, Fixtures};
use super::handlers;
use super::state::MockState;
use crate::{ApiVersion, Result, SnykClient};

/// REST version sent by clients built with [`MockServer::client`].
pub const MOCK_API_VERSION: &str = "2024-10-15";

/// A mock Snyk API server for testing.
///
/// The server runs in the background and can be used to test the client
/// against a realistic, stateful API implementation.
pub struct MockServer {
    url: String,
    handle: JoinHandle<()>,
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    pub async fn start() -> Self {
        Self::with_state(Self::state_from_scenario(Fixtures::default_scenario())).await
    }

    /// Start a mock server with empty state.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    pub async fn with_state(state: MockState) -> Self {
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            url: format!("http://{addr}"),
            handle,
            state: shared_state,
        }
    }

    /// Base URL of the server, without a generation prefix.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn v1_url(&self) -> String {
        format!("{}/v1", self.url)
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest", self.url)
    }

    /// A client pointed at this server with [`MOCK_API_VERSION`] configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn client(&self, token: &str) -> Result<SnykClient> {
        SnykClient::builder(token)
            .v1_url(self.v1_url())
            .rest_url(self.rest_url())
            .version(MOCK_API_VERSION.parse::<ApiVersion>()?)
            .build()
    }

    /// Shared state that tests may modify while the server runs.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server. Aborts the server task.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    fn state_from_scenario(scenario: DefaultScenario) -> MockState {
        let mut state = MockState::new().with_user(scenario.user);
        for org in scenario.orgs {
            state = state.with_org(org);
        }
        for (org_id, project) in scenario.projects {
            state = state.with_project(&org_id, project);
        }
        for (org_id, target) in scenario.targets {
            state = state.with_target(&org_id, target);
        }
        for (org_id, collection) in scenario.collections {
            state = state.with_collection(&org_id, collection);
        }
        state
    }

    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        Router::new()
            // v1
            .route("/v1/orgs", get(handlers::list_orgs))
            .route("/v1/org/:org_id/projects", get(handlers::list_projects))
            .route(
                "/v1/org/:org_id/project/:id",
                get(handlers::get_project).delete(handlers::delete_project),
            )
            // REST
            .route("/rest/self", get(handlers::get_self))
            .route("/rest/orgs/:org_id/targets", get(handlers::list_targets))
            .route("/rest/orgs/:org_id/targets/:id", get(handlers::get_target))
            .route(
                "/rest/orgs/:org_id/collections",
                post(handlers::create_collection).get(handlers::list_collections),
            )
            .route(
                "/rest/orgs/:org_id/collections/:id",
                get(handlers::get_collection)
                    .patch(handlers::update_collection)
                    .delete(handlers::delete_collection),
            )
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{List, ListQuery, Organization, PathParams};

    #[tokio::test]
    async fn test_server_starts_and_responds() {
        let server = MockServer::start().await;

        let response = reqwest::Client::new()
            .get(format!("{}/health", server.url()))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "ok");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_orgs_with_client() {
        let server = MockServer::start().await;
        let client = server.client("test-token").unwrap();

        let orgs = Organization::list_all(&client, &PathParams::new(), &ListQuery::default())
            .await
            .expect("Failed to list orgs");

        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[0].name, "Acme");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_rest_requires_version() {
        let server = MockServer::start().await;

        let response = reqwest::Client::new()
            .get(format!("{}/rest/orgs/org-1/targets", server.url()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["errors"][0]["detail"].as_str().unwrap().contains("version"));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_required_token() {
        let server = MockServer::with_state(MockState::new().with_required_token("secret")).await;

        let denied = server.client("wrong").unwrap().organizations().unwrap();
        let err = denied.list(&ListQuery::default()).await.unwrap_err();
        assert_eq!(err.status(), Some(401));

        let allowed = server.client("secret").unwrap().organizations().unwrap();
        assert!(allowed.list(&ListQuery::default()).await.unwrap().is_empty());

        server.shutdown().await;
    }
}
