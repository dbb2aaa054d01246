//! Caller-facing entry point per resource.
//!
//! A [`Manager`] binds one descriptor to one resolved [`Transport`] and the
//! parent path parameters. It keeps no state between calls and is cheap to
//! build, so relationships construct them on demand.

use futures::stream::{self, Stream};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::client::SnykClient;
use crate::collection::{Collection, Traversal};
use crate::descriptor::{EndpointDescriptor, Generation, PathParams, Registry};
use crate::error::{Result, SnykError};
use crate::hydrate::{Hydrator, Model};
use crate::pagination::{Direction, Paginator};
use crate::transport::Transport;

/// What a traversal does with a record that fails hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HydrationPolicy {
    /// Surface the error and end the traversal.
    #[default]
    Abort,
    /// Log a warning, drop the record and continue.
    Skip,
}

/// Options for one list traversal.
///
/// ```
/// use snykapi::{HydrationPolicy, ListQuery};
///
/// let query = ListQuery::new()
///     .param("origin", "github")
///     .with_limit(50)
///     .with_hydration(HydrationPolicy::Skip);
/// assert_eq!(query.limit(), Some(50));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    params: Vec<(String, String)>,
    per_page: Option<u32>,
    start_page: Option<u32>,
    limit: Option<u32>,
    direction: Direction,
    cursor: Option<String>,
    hydration: HydrationPolicy,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Offset page size.
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// First offset page to request.
    #[must_use]
    pub fn with_start_page(mut self, page: u32) -> Self {
        self.start_page = Some(page);
        self
    }

    /// REST `limit` (records per cursor page).
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Start a forward cursor traversal after `cursor`.
    #[must_use]
    pub fn starting_after(mut self, cursor: impl Into<String>) -> Self {
        self.direction = Direction::Forward;
        self.cursor = Some(cursor.into());
        self
    }

    /// Start a backward cursor traversal before `cursor`.
    #[must_use]
    pub fn ending_before(mut self, cursor: impl Into<String>) -> Self {
        self.direction = Direction::Backward;
        self.cursor = Some(cursor.into());
        self
    }

    /// Walk `links.prev` instead of `links.next`.
    #[must_use]
    pub fn backward(mut self) -> Self {
        self.direction = Direction::Backward;
        self
    }

    #[must_use]
    pub fn with_hydration(mut self, policy: HydrationPolicy) -> Self {
        self.hydration = policy;
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn per_page(&self) -> Option<u32> {
        self.per_page
    }

    pub fn start_page(&self) -> Option<u32> {
        self.start_page
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn hydration(&self) -> HydrationPolicy {
        self.hydration
    }
}

/// Operations on one resource within one parent scope.
#[derive(Debug, Clone)]
pub struct Manager {
    transport: Transport,
    descriptor: &'static EndpointDescriptor,
    registry: Arc<Registry>,
    scope: PathParams,
    link: Option<String>,
}

impl Manager {
    /// Bind a descriptor to the client's transport for its generation.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pinned version does not parse.
    pub fn new(client: &SnykClient, descriptor: &'static EndpointDescriptor) -> Result<Self> {
        let pinned = descriptor.pinned_version()?;
        Ok(Self {
            transport: client.transport(descriptor.generation, pinned),
            descriptor,
            registry: client.shared_registry(),
            scope: PathParams::new(),
            link: None,
        })
    }

    /// Bind one path parameter, e.g. `("org_id", "...")`.
    #[must_use]
    pub fn scoped(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.scope.insert(name, value);
        self
    }

    /// Bind several path parameters.
    #[must_use]
    pub fn with_scope(mut self, params: &PathParams) -> Self {
        for (name, value) in params.iter() {
            self.scope.insert(name, value);
        }
        self
    }

    /// Address a server-provided link instead of the descriptor template.
    #[must_use]
    pub fn for_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn descriptor(&self) -> &'static EndpointDescriptor {
        self.descriptor
    }

    pub fn scope(&self) -> &PathParams {
        &self.scope
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn collection_path(&self) -> Result<String> {
        match &self.link {
            Some(link) => Ok(link.clone()),
            None => self.descriptor.collection_path(&self.scope),
        }
    }

    pub(crate) fn hydrator(&self) -> Hydrator {
        Hydrator::new(self.descriptor, self.scope.clone(), Arc::clone(&self.registry))
    }

    fn require(&self, allowed: bool, operation: &str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(SnykError::config(format!(
                "resource '{}' does not support {operation}",
                self.descriptor.name
            )))
        }
    }

    fn not_found(&self, id: &str) -> impl FnOnce(SnykError) -> SnykError {
        let resource = self.descriptor.name.to_string();
        let id = id.to_string();
        move |err| match err {
            SnykError::Api { status: 404, .. } => SnykError::NotFound { resource, id },
            other => other,
        }
    }

    /// The raw collection behind [`Manager::all`]. No request is made.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a REST resource without a version
    /// or a path parameter missing from the scope.
    pub fn collection(&self, query: &ListQuery) -> Result<Collection> {
        self.transport.ensure_version()?;
        Ok(Collection::new(
            self.transport.clone(),
            self.collection_path()?,
            query.params().to_vec(),
            Paginator::for_kind(self.descriptor.pagination, query),
            self.descriptor.records,
        ))
    }

    /// Lazily traverse every record. Nothing is fetched until the first pull.
    ///
    /// # Errors
    ///
    /// Configuration errors are reported here, before any request.
    pub fn all(&self, query: &ListQuery) -> Result<Models> {
        let collection = self.collection(query)?;
        Ok(Models {
            traversal: collection.traverse(),
            hydrator: self.hydrator(),
            policy: query.hydration(),
            finished: false,
        })
    }

    /// Collect every record.
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Model>> {
        self.all(query)?.collect_all().await
    }

    /// Records whose attributes equal every given value. Matching is local.
    pub async fn filter(&self, query: &ListQuery, matches: &[(&str, Value)]) -> Result<Vec<Model>> {
        let mut models = self.all(query)?;
        let mut found = Vec::new();
        while let Some(model) = models.try_next().await? {
            if attributes_match(&model, matches) {
                found.push(model);
            }
        }
        Ok(found)
    }

    /// The first matching record; stops pulling once found.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when nothing matches.
    pub async fn first(&self, query: &ListQuery, matches: &[(&str, Value)]) -> Result<Model> {
        let mut models = self.all(query)?;
        while let Some(model) = models.try_next().await? {
            if attributes_match(&model, matches) {
                return Ok(model);
            }
        }
        Err(SnykError::NotFound {
            resource: self.descriptor.name.to_string(),
            id: "<first>".to_string(),
        })
    }

    /// Fetch one record by id.
    ///
    /// Resources without a single-record endpoint are searched through
    /// [`Manager::all`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on 404 or when the search finds nothing.
    #[tracing::instrument(skip(self), fields(resource = self.descriptor.name))]
    pub async fn get(&self, id: &str) -> Result<Model> {
        self.transport.ensure_version()?;
        if self.descriptor.item_path.is_none() {
            let mut models = self.all(&ListQuery::default())?;
            while let Some(model) = models.try_next().await? {
                if model.id == id {
                    return Ok(model);
                }
            }
            return Err(SnykError::NotFound {
                resource: self.descriptor.name.to_string(),
                id: id.to_string(),
            });
        }

        let path = self.descriptor.resource_path(&self.scope, id)?;
        let response = self
            .transport
            .get(&path, &[])
            .await
            .map_err(self.not_found(id))?;
        self.hydrate_single(response.body)
    }

    /// Fetch the manager's own address as a single record (to-one links,
    /// singleton resources such as `self`).
    pub async fn fetch(&self) -> Result<Model> {
        self.transport.ensure_version()?;
        let path = self.collection_path()?;
        let response = self.transport.get(&path, &[]).await?;
        self.hydrate_single(response.body)
    }

    /// Create a record. REST bodies are wrapped in a JSON:API envelope.
    pub async fn create(&self, attributes: Value) -> Result<Model> {
        self.require(self.descriptor.operations.create, "create")?;
        self.transport.ensure_version()?;
        let path = self.collection_path()?;
        let body = match self.descriptor.generation {
            Generation::Rest => json!({
                "data": {"type": self.descriptor.resource_type, "attributes": attributes}
            }),
            Generation::V1 => attributes,
        };
        let response = self
            .transport
            .request(Method::POST, &path, &[], Some(&body))
            .await?;
        tracing::debug!(resource = self.descriptor.name, "created record");
        self.hydrate_single(response.body)
    }

    /// Update a record: PATCH for REST, PUT for V1.
    pub async fn update(&self, id: &str, attributes: Value) -> Result<Model> {
        self.require(self.descriptor.operations.update, "update")?;
        self.transport.ensure_version()?;
        let path = self.descriptor.resource_path(&self.scope, id)?;
        let (method, body) = match self.descriptor.generation {
            Generation::Rest => (
                Method::PATCH,
                json!({
                    "data": {"type": self.descriptor.resource_type, "id": id, "attributes": attributes}
                }),
            ),
            Generation::V1 => (Method::PUT, attributes),
        };
        let response = self
            .transport
            .request(method, &path, &[], Some(&body))
            .await
            .map_err(self.not_found(id))?;
        self.hydrate_single(response.body)
    }

    /// Delete a record.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.require(self.descriptor.operations.delete, "delete")?;
        self.transport.ensure_version()?;
        let path = self.descriptor.resource_path(&self.scope, id)?;
        self.transport
            .request(Method::DELETE, &path, &[], None)
            .await
            .map_err(self.not_found(id))?;
        tracing::debug!(resource = self.descriptor.name, id, "deleted record");
        Ok(())
    }

    fn hydrate_single(&self, body: Value) -> Result<Model> {
        let record = match (self.descriptor.generation, body) {
            (Generation::Rest, Value::Object(mut document)) => match document.remove("data") {
                Some(record @ Value::Object(_)) => record,
                Some(_) => {
                    return Err(SnykError::protocol(
                        "expected a single resource object in `data`",
                    ))
                }
                None => return Err(SnykError::protocol("response has no `data` member")),
            },
            (Generation::V1, record @ Value::Object(_)) => record,
            (_, other) => {
                return Err(SnykError::protocol(format!(
                    "expected a JSON object, found {other}"
                )))
            }
        };
        self.hydrator().hydrate(record)
    }
}

fn attributes_match(model: &Model, matches: &[(&str, Value)]) -> bool {
    matches
        .iter()
        .all(|(name, expected)| match *name {
            "id" => expected.as_str() == Some(model.id.as_str()),
            _ => model.attr(name) == Some(expected),
        })
}

/// A lazy sequence of models from one traversal.
#[derive(Debug)]
pub struct Models {
    traversal: Traversal,
    hydrator: Hydrator,
    policy: HydrationPolicy,
    finished: bool,
}

impl Models {
    /// Next model, fetching pages on demand.
    ///
    /// # Errors
    ///
    /// Fetch, protocol and (under [`HydrationPolicy::Abort`]) hydration
    /// errors end the sequence.
    pub async fn try_next(&mut self) -> Result<Option<Model>> {
        while !self.finished {
            let Some(raw) = self.traversal.next_record().await? else {
                self.finished = true;
                break;
            };
            match self.hydrator.hydrate(raw) {
                Ok(model) => return Ok(Some(model)),
                Err(err) if self.policy == HydrationPolicy::Skip => {
                    tracing::warn!(error = %err, "skipping record that failed hydration");
                }
                Err(err) => {
                    self.finished = true;
                    return Err(err);
                }
            }
        }
        Ok(None)
    }

    /// Pages requested so far.
    pub fn pages_fetched(&self) -> u32 {
        self.traversal.pages_fetched()
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Model>> {
        stream::try_unfold(self, |mut models| async move {
            let next = models.try_next().await?;
            Ok::<_, SnykError>(next.map(|model| (model, models)))
        })
    }

    /// Drain the sequence.
    pub async fn collect_all(mut self) -> Result<Vec<Model>> {
        let mut models = Vec::new();
        while let Some(model) = self.try_next().await? {
            models.push(model);
        }
        Ok(models)
    }
}
