//! Snyk API client.
//!
//! Holds the credential, the HTTP connection pool, both base URLs and the
//! descriptor registry. Requests are issued through a [`Transport`]
//! resolved per API generation; resource operations live on [`Manager`].

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::collection::Collection;
use crate::descriptor::{Generation, PaginationKind, RecordSource, Registry};
use crate::error::{Result, SnykError};
use crate::hydrate::Model;
use crate::manager::{ListQuery, Manager};
use crate::pagination::Paginator;
use crate::transport::Transport;
use crate::version::ApiVersion;

const DEFAULT_V1_URL: &str = "https://api.snyk.io/v1";
const DEFAULT_REST_URL: &str = "https://api.snyk.io/rest";
const USER_AGENT: &str = concat!("snykapi/", env!("CARGO_PKG_VERSION"));

/// API token. Immutable, shared by every request of a client, never
/// printed.
#[derive(Clone)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    /// `Authorization` header value, marked sensitive.
    pub(crate) fn header_value(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("token {}", self.0))
            .map_err(|_| SnykError::config("API token contains invalid header characters"))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Snyk API client.
///
/// Cheaply cloneable; clones share the connection pool, credential and
/// registry.
///
/// # Example
///
/// ```no_run
/// use snykapi::SnykClient;
///
/// # fn example() -> snykapi::Result<()> {
/// // From SNYK_TOKEN / SNYK_API_URL / SNYK_REST_API_URL / SNYK_API_VERSION
/// let client = SnykClient::from_env()?;
///
/// // Or configure manually
/// let client = SnykClient::builder("your-token")
///     .version("2024-10-15".parse()?)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SnykClient {
    http: Client,
    credential: Credential,
    v1_url: Arc<Url>,
    rest_url: Arc<Url>,
    version: Option<ApiVersion>,
    registry: Arc<Registry>,
}

impl fmt::Debug for SnykClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnykClient")
            .field("v1_url", &self.v1_url.as_str())
            .field("rest_url", &self.rest_url.as_str())
            .field("version", &self.version.map(|v| v.to_string()))
            .finish_non_exhaustive()
    }
}

impl SnykClient {
    /// Create a client from environment variables.
    ///
    /// Uses `SNYK_TOKEN` for authentication, optionally `SNYK_API_URL`,
    /// `SNYK_REST_API_URL` and `SNYK_API_VERSION`.
    ///
    /// # Errors
    ///
    /// Returns an error if `SNYK_TOKEN` is not set or a value is invalid.
    pub fn from_env() -> Result<Self> {
        let token = env::var("SNYK_TOKEN").map_err(|_| {
            SnykError::config("SNYK_TOKEN environment variable not set")
        })?;

        let mut builder = Self::builder(token);
        if let Ok(url) = env::var("SNYK_API_URL") {
            builder = builder.v1_url(url);
        }
        if let Ok(url) = env::var("SNYK_REST_API_URL") {
            builder = builder.rest_url(url);
        }
        if let Ok(version) = env::var("SNYK_API_VERSION") {
            builder = builder.version(version.parse()?);
        }
        builder.build()
    }

    /// Start configuring a client.
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    /// Create a client with default URLs and no REST version.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: &str) -> Result<Self> {
        Self::builder(token).build()
    }

    pub fn v1_url(&self) -> &Url {
        &self.v1_url
    }

    pub fn rest_url(&self) -> &Url {
        &self.rest_url
    }

    /// The default REST version, if one was configured.
    pub fn version(&self) -> Option<ApiVersion> {
        self.version
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn shared_registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Resolve the transport for one API generation.
    ///
    /// `pinned` overrides the client default version for REST calls.
    pub fn transport(&self, generation: Generation, pinned: Option<ApiVersion>) -> Transport {
        match generation {
            Generation::V1 => Transport::new(
                self.http.clone(),
                self.credential.clone(),
                generation,
                Arc::clone(&self.v1_url),
                None,
            ),
            Generation::Rest => Transport::new(
                self.http.clone(),
                self.credential.clone(),
                generation,
                Arc::clone(&self.rest_url),
                pinned.or(self.version),
            ),
        }
    }

    /// Manager for a registered resource.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown resource names.
    pub fn manager(&self, resource: &str) -> Result<Manager> {
        let descriptor = self.registry.lookup(resource)?;
        Manager::new(self, descriptor)
    }

    /// V1 organizations.
    pub fn organizations(&self) -> Result<Manager> {
        self.manager("orgs")
    }

    /// REST groups.
    pub fn groups(&self) -> Result<Manager> {
        self.manager("groups")
    }

    /// The user owning the token.
    pub async fn me(&self) -> Result<Model> {
        self.manager("self")?.fetch().await
    }

    /// Collect the `data` of every page of a REST list, following cursors.
    ///
    /// # Errors
    ///
    /// Fails on the first page fetch or cursor error.
    pub async fn get_rest_pages(&self, path: &str, params: &ListQuery) -> Result<Vec<Value>> {
        let transport = self.transport(Generation::Rest, None);
        transport.ensure_version()?;
        Collection::new(
            transport,
            path,
            params.params().to_vec(),
            Paginator::for_kind(PaginationKind::Cursor, params),
            RecordSource::Data,
        )
        .collect_records()
        .await
    }

    /// Collect every record of an offset-paginated v1 list found under `key`.
    ///
    /// # Errors
    ///
    /// Fails on the first page fetch error or pagination violation.
    pub async fn get_v1_pages(
        &self,
        path: &str,
        key: &'static str,
        params: &ListQuery,
    ) -> Result<Vec<Value>> {
        Collection::new(
            self.transport(Generation::V1, None),
            path,
            params.params().to_vec(),
            Paginator::for_kind(PaginationKind::Offset, params),
            RecordSource::Key(key),
        )
        .collect_records()
        .await
    }
}

/// Builder for [`SnykClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    credential: Credential,
    v1_url: String,
    rest_url: String,
    version: Option<ApiVersion>,
    user_agent: String,
    timeout: Duration,
    registry: Option<Registry>,
}

impl ClientBuilder {
    fn new(token: impl Into<String>) -> Self {
        Self {
            credential: Credential::new(token),
            v1_url: DEFAULT_V1_URL.to_string(),
            rest_url: DEFAULT_REST_URL.to_string(),
            version: None,
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_secs(300),
            registry: None,
        }
    }

    #[must_use]
    pub fn v1_url(mut self, url: impl Into<String>) -> Self {
        self.v1_url = url.into();
        self
    }

    #[must_use]
    pub fn rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = url.into();
        self
    }

    /// Default REST version for resources that do not pin one.
    #[must_use]
    pub fn version(mut self, version: ApiVersion) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom descriptor table.
    #[must_use]
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if a base URL is invalid or the HTTP client cannot be
    /// built.
    pub fn build(self) -> Result<SnykClient> {
        let http = Client::builder()
            .user_agent(self.user_agent)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(self.timeout)
            .build()
            .map_err(SnykError::Transport)?;

        Ok(SnykClient {
            http,
            credential: self.credential,
            v1_url: Arc::new(parse_base_url(&self.v1_url)?),
            rest_url: Arc::new(parse_base_url(&self.rest_url)?),
            version: self.version,
            registry: Arc::new(self.registry.unwrap_or_default()),
        })
    }
}

/// Parse a base URL, ensuring it ends with `/` so relative paths join below it.
fn parse_base_url(base_url: &str) -> Result<Url> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    Ok(Url::parse(&normalized)?)
}
