//! In-memory Snyk API for end-to-end tests.
//!
//! One axum server answers both generations: v1 under `/v1` (flat bodies,
//! no version) and REST under `/rest` (JSON:API documents, mandatory
//! `version`, cursor pagination). Records live in [`MockState`] and
//! survive across requests, so write operations are visible to later
//! traversals.
//!
//! ```ignore
//! use snykapi::mock_server::MockServer;
//! use snykapi::ListQuery;
//!
//! #[tokio::test]
//! async fn lists_default_orgs() {
//!     let server = MockServer::start().await;
//!     let client = server.client("test-token").unwrap();
//!
//!     let orgs = client.organizations().unwrap().list(&ListQuery::default()).await.unwrap();
//!     assert_eq!(orgs[0].attr_str("name"), Some("Acme"));
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::{DefaultScenario, Fixtures};
pub use server::{MockServer, MOCK_API_VERSION};
pub use state::MockState;
