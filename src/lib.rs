//! Snyk API client library.
//!
//! A Rust library for the two generations of the Snyk API: the flat v1 API
//! and the versioned, JSON:API based REST API. Resources are described by
//! [`EndpointDescriptor`]s; a [`Manager`] turns a descriptor into list, get
//! and write operations with pagination and relationship hydration handled
//! for you.
//!
//! # Quick Start
//!
//! ```no_run
//! use snykapi::{List, ListQuery, Organization, PathParams, SnykClient};
//!
//! #[tokio::main]
//! async fn main() -> snykapi::Result<()> {
//!     // Create client from environment variables
//!     let client = SnykClient::from_env()?;
//!
//!     // Untyped models through a manager
//!     let orgs = client.organizations()?.list(&ListQuery::default()).await?;
//!     for org in &orgs {
//!         println!("{} {:?}", org.id, org.attr_str("name"));
//!     }
//!
//!     // Follow a relationship to the org's projects
//!     let projects = orgs[0].related(&client, "projects")?.list(&ListQuery::default()).await?;
//!     println!("Found {} projects", projects.len());
//!
//!     // Typed records through the traits
//!     let typed = Organization::list_all(&client, &PathParams::new(), &ListQuery::default()).await?;
//!     println!("Found {} organizations", typed.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`Transport`] builds URLs and performs requests for one generation
//! - [`Paginator`] drives offset, cursor or single-page traversal
//! - [`Collection`] is a lazy, restartable list request
//! - [`Hydrator`] turns raw records into [`Model`]s with [`Relationship`]s
//! - [`Manager`] exposes the operations of one resource
//!
//! The [`Get`], [`List`] and [`Update`] traits give typed access for the
//! models in this crate.
//!
//! # Configuration
//!
//! The client reads configuration from environment variables:
//!
//! - `SNYK_TOKEN` (required) - API token, sent as `Authorization: token <value>`
//! - `SNYK_API_URL` (optional) - v1 base URL (defaults to `https://api.snyk.io/v1`)
//! - `SNYK_REST_API_URL` (optional) - REST base URL (defaults to `https://api.snyk.io/rest`)
//! - `SNYK_API_VERSION` (optional) - REST version such as `2024-10-15` or `2023-09-11~beta`

mod client;
mod collection;
mod descriptor;
mod error;
mod hydrate;
mod manager;
mod models;
mod pagination;
mod retry;
mod traits;
mod transport;
mod version;

pub mod cli;
pub mod output;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use client::{ClientBuilder, Credential, SnykClient};
pub use error::{Result, SnykError};
pub use retry::{RetryPolicy, MAX_RETRY_DELAY};
pub use transport::{RawResponse, Transport};
pub use version::{ApiVersion, Stability};

// Descriptors
pub use descriptor::{
    EndpointDescriptor, Generation, Operations, PaginationKind, PathParams, RecordSource,
    Registry, RelationRule,
};

// Pagination and collections
pub use collection::{Collection, Traversal};
pub use pagination::{
    cursor_from_link, Advance, CursorPaginator, Direction, OffsetPaginator, Page, PageLinks, PageMeta,
    Paginator, DEFAULT_PER_PAGE,
};

// Models and managers
pub use hydrate::{Binding, Hydrator, Model, RelatedIds, Relationship};
pub use manager::{HydrationPolicy, ListQuery, Manager, Models};

// Re-export traits
pub use output::PrettyPrint;
pub use traits::{Get, List, Resource, Update};

// Re-export typed models
pub use models::{
    Group, IssueCounts, Organization, Project, ProjectCollection, ProjectCollectionUpdate,
    ProjectTag, Target,
};
