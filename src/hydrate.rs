//! Conversion of raw records into [`Model`]s.
//!
//! V1 records are flat objects whose relationships are declared by the
//! descriptor; REST records are JSON:API resource objects that carry their
//! own `relationships` and `links`. Either way, relationships become
//! deferred bindings that only touch the network when resolved.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::client::SnykClient;
use crate::descriptor::{
    EndpointDescriptor, Generation, PathParams, Registry, RelationRule, LINKED_RESOURCE,
};
use crate::error::{Result, SnykError};
use crate::manager::{ListQuery, Manager};

/// Ids referenced by a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RelatedIds {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

/// How a relationship reaches its related records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// The target's collection scoped under the parent's path parameters.
    Scoped(PathParams),
    /// A server-provided `links.related` URL.
    Link(String),
    /// Only ids are known; each is fetched from the target resource.
    Identified,
}

/// A deferred relationship of a [`Model`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub name: String,
    /// Resource type of the related records, when known.
    pub related_type: Option<String>,
    pub data: RelatedIds,
    /// Registry name of the related resource, when known.
    pub target: Option<&'static str>,
    pub binding: Binding,
    scope: PathParams,
}

impl Relationship {
    /// Related ids, in server order.
    pub fn ids(&self) -> Vec<&str> {
        match &self.data {
            RelatedIds::None => Vec::new(),
            RelatedIds::One(id) => vec![id.as_str()],
            RelatedIds::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }

    /// A manager addressing the related records. No request is made.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the related resource cannot be
    /// determined for an id-only relationship.
    pub fn manager(&self, client: &SnykClient) -> Result<Manager> {
        let descriptor: &'static EndpointDescriptor = match self.target {
            Some(target) => client.registry().lookup(target)?,
            None => &LINKED_RESOURCE,
        };
        match &self.binding {
            Binding::Scoped(params) => Ok(Manager::new(client, descriptor)?.with_scope(params)),
            Binding::Link(link) => Ok(Manager::new(client, descriptor)?.for_link(link.clone())),
            Binding::Identified => {
                if self.target.is_none() {
                    return Err(SnykError::config(format!(
                        "relationship '{}' has no known target resource",
                        self.name
                    )));
                }
                Ok(Manager::new(client, descriptor)?.with_scope(&self.scope))
            }
        }
    }

    /// Fetch the related records.
    ///
    /// # Errors
    ///
    /// Propagates the errors of the underlying fetches.
    pub async fn resolve(&self, client: &SnykClient) -> Result<Vec<Model>> {
        let manager = self.manager(client)?;
        match (&self.binding, &self.data) {
            (Binding::Link(_), RelatedIds::One(_)) => Ok(vec![manager.fetch().await?]),
            (Binding::Link(_) | Binding::Scoped(_), _) => manager.list(&ListQuery::default()).await,
            (Binding::Identified, _) => {
                let mut models = Vec::new();
                for id in self.ids() {
                    models.push(manager.get(id).await?);
                }
                Ok(models)
            }
        }
    }
}

/// A hydrated record.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub id: String,
    /// JSON:API type, or the descriptor's record kind for V1.
    pub resource_type: String,
    /// Registry name of the resource that produced this model.
    pub resource: &'static str,
    pub attributes: Map<String, Value>,
    pub relationships: BTreeMap<String, Relationship>,
    pub links: Map<String, Value>,
    /// JSON:API `meta`. Unrecognized top-level members of a REST record
    /// are kept in `attributes`.
    pub meta: Map<String, Value>,
    /// Path parameters of the collection this record came from.
    pub scope: PathParams,
}

impl Model {
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(Value::as_str)
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    /// Manager for a named relationship.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown relationship names.
    pub fn related(&self, client: &SnykClient, name: &str) -> Result<Manager> {
        self.relationship(name)
            .ok_or_else(|| {
                SnykError::config(format!(
                    "{} '{}' has no relationship '{name}'",
                    self.resource, self.id
                ))
            })?
            .manager(client)
    }

    /// Deserialize `id` plus the attributes into a typed record.
    ///
    /// # Errors
    ///
    /// Returns a hydration error when the attributes do not fit `T`.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T> {
        self.clone().into_typed()
    }

    /// Consuming form of [`Model::to_typed`].
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        let mut object = self.attributes;
        object
            .entry("id")
            .or_insert_with(|| Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(object))
            .map_err(|e| SnykError::hydration(std::any::type_name::<T>(), e.to_string()))
    }

    /// JSON view used for display.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        object.insert("type".to_string(), Value::String(self.resource_type.clone()));
        object.insert("attributes".to_string(), Value::Object(self.attributes.clone()));
        if !self.relationships.is_empty() {
            let relationships = self
                .relationships
                .iter()
                .map(|(name, rel)| {
                    let ids = rel.ids().into_iter().map(|id| Value::String(id.to_string()));
                    (name.clone(), Value::Array(ids.collect()))
                })
                .collect();
            object.insert("relationships".to_string(), Value::Object(relationships));
        }
        if !self.links.is_empty() {
            object.insert("links".to_string(), Value::Object(self.links.clone()));
        }
        Value::Object(object)
    }
}

/// Turns raw records of one resource and scope into models.
#[derive(Debug, Clone)]
pub struct Hydrator {
    descriptor: &'static EndpointDescriptor,
    scope: PathParams,
    registry: Arc<Registry>,
}

impl Hydrator {
    pub fn new(
        descriptor: &'static EndpointDescriptor,
        scope: PathParams,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            descriptor,
            scope,
            registry,
        }
    }

    /// Hydrate one raw record.
    ///
    /// # Errors
    ///
    /// Returns a hydration error when the record is not an object or lacks
    /// its id (or, for REST, its type).
    pub fn hydrate(&self, raw: Value) -> Result<Model> {
        let Value::Object(record) = raw else {
            return Err(SnykError::hydration("<record>", "record is not a JSON object"));
        };
        match self.descriptor.generation {
            Generation::V1 => self.hydrate_v1(record),
            Generation::Rest => self.hydrate_rest(record),
        }
    }

    fn hydrate_v1(&self, mut record: Map<String, Value>) -> Result<Model> {
        let id_field = self.descriptor.id_field;
        let id = match record.get(id_field) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(SnykError::hydration(id_field, "not a string or number")),
            None => return Err(SnykError::hydration(id_field, "missing")),
        };

        let mut relationships = BTreeMap::new();
        for rule in self.descriptor.relations {
            let relationship = match *rule {
                RelationRule::Child { name, target, param } => Relationship {
                    name: name.to_string(),
                    related_type: self.target_type(target),
                    data: RelatedIds::None,
                    target: Some(target),
                    binding: Binding::Scoped(self.scope.clone().with(param, id.as_str())),
                    scope: self.scope.clone(),
                },
                RelationRule::Reference { name, field, target } => Relationship {
                    name: name.to_string(),
                    related_type: self.target_type(target),
                    data: reference_ids(record.remove(field)),
                    target: Some(target),
                    binding: Binding::Identified,
                    scope: self.scope.clone(),
                },
            };
            relationships.insert(relationship.name.clone(), relationship);
        }

        Ok(Model {
            id,
            resource_type: self.descriptor.resource_type.to_string(),
            resource: self.descriptor.name,
            attributes: record,
            relationships,
            links: Map::new(),
            meta: Map::new(),
            scope: self.scope.clone(),
        })
    }

    fn hydrate_rest(&self, mut record: Map<String, Value>) -> Result<Model> {
        let id = match record.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(_) => return Err(SnykError::hydration("id", "not a non-empty string")),
            None => return Err(SnykError::hydration("id", "missing")),
        };
        let resource_type = match record.remove("type") {
            Some(Value::String(t)) if !t.is_empty() => t,
            Some(_) => return Err(SnykError::hydration("type", "not a non-empty string")),
            None => return Err(SnykError::hydration("type", "missing")),
        };
        let mut attributes = object_member(&mut record, "attributes")?;
        let links = object_member(&mut record, "links")?;
        let meta = object_member(&mut record, "meta")?;
        let raw_relationships = object_member(&mut record, "relationships")?;

        let mut relationships = BTreeMap::new();
        for (name, raw) in raw_relationships {
            let relationship = self.rest_relationship(&id, name, raw)?;
            relationships.insert(relationship.name.clone(), relationship);
        }
        for rule in self.descriptor.relations {
            if let RelationRule::Child { name, target, param } = *rule {
                relationships.entry(name.to_string()).or_insert_with(|| Relationship {
                    name: name.to_string(),
                    related_type: self.target_type(target),
                    data: RelatedIds::None,
                    target: Some(target),
                    binding: Binding::Scoped(self.scope.clone().with(param, id.as_str())),
                    scope: self.scope.clone(),
                });
            }
        }

        // Unrecognized top-level members; a declared attribute wins.
        for (name, value) in record {
            attributes.entry(name).or_insert(value);
        }

        Ok(Model {
            id,
            resource_type,
            resource: self.descriptor.name,
            attributes,
            relationships,
            links,
            meta,
            scope: self.scope.clone(),
        })
    }

    fn rest_relationship(&self, id: &str, name: String, raw: Value) -> Result<Relationship> {
        let field = format!("relationships.{name}");
        let Value::Object(mut raw) = raw else {
            return Err(SnykError::hydration(field, "not an object"));
        };

        let mut related_type = None;
        let data = match raw.remove("data") {
            None | Some(Value::Null) => RelatedIds::None,
            Some(Value::Object(identifier)) => {
                let (rel_id, rel_type) = identifier_of(&field, &identifier)?;
                related_type = rel_type;
                RelatedIds::One(rel_id)
            }
            Some(Value::Array(identifiers)) => {
                let mut ids = Vec::with_capacity(identifiers.len());
                for identifier in &identifiers {
                    let Value::Object(identifier) = identifier else {
                        return Err(SnykError::hydration(field, "data entry is not an object"));
                    };
                    let (rel_id, rel_type) = identifier_of(&field, identifier)?;
                    related_type = related_type.or(rel_type);
                    ids.push(rel_id);
                }
                RelatedIds::Many(ids)
            }
            Some(_) => return Err(SnykError::hydration(field, "data is not an object or array")),
        };

        let rule = self.descriptor.relation(&name);
        let target = rule.map(RelationRule::target).or_else(|| {
            related_type
                .as_deref()
                .and_then(|t| self.registry.by_type(t, &self.scope))
                .map(|d| d.name)
        });
        let related_link = raw
            .get("links")
            .and_then(|links| links.get("related"))
            .and_then(|related| match related {
                Value::String(href) => Some(href.clone()),
                Value::Object(o) => o.get("href").and_then(Value::as_str).map(String::from),
                _ => None,
            });

        let binding = match (related_link, rule) {
            (Some(link), _) => Binding::Link(link),
            (None, Some(RelationRule::Child { param, .. })) => {
                Binding::Scoped(self.scope.clone().with(*param, id))
            }
            (None, _) => Binding::Identified,
        };

        Ok(Relationship {
            name,
            related_type: related_type.or_else(|| target.and_then(|t| self.target_type(t))),
            data,
            target,
            binding,
            scope: self.scope.clone(),
        })
    }

    fn target_type(&self, target: &str) -> Option<String> {
        self.registry
            .lookup(target)
            .ok()
            .map(|d| d.resource_type.to_string())
    }
}

fn object_member(record: &mut Map<String, Value>, name: &str) -> Result<Map<String, Value>> {
    match record.remove(name) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(object)) => Ok(object),
        Some(_) => Err(SnykError::hydration(name, "not an object")),
    }
}

fn identifier_of(field: &str, identifier: &Map<String, Value>) -> Result<(String, Option<String>)> {
    let id = identifier
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SnykError::hydration(format!("{field}.data.id"), "missing"))?;
    let rel_type = identifier.get("type").and_then(Value::as_str).map(String::from);
    Ok((id.to_string(), rel_type))
}

/// Ids held by a V1 reference field: an object with `id`, or a bare id.
fn reference_ids(value: Option<Value>) -> RelatedIds {
    match value {
        Some(Value::String(id)) if !id.is_empty() => RelatedIds::One(id),
        Some(Value::Number(n)) => RelatedIds::One(n.to_string()),
        Some(Value::Object(object)) => match object.get("id") {
            Some(Value::String(id)) => RelatedIds::One(id.clone()),
            Some(Value::Number(n)) => RelatedIds::One(n.to_string()),
            _ => RelatedIds::None,
        },
        Some(Value::Array(items)) => RelatedIds::Many(
            items
                .into_iter()
                .filter_map(|item| match reference_ids(Some(item)) {
                    RelatedIds::One(id) => Some(id),
                    _ => None,
                })
                .collect(),
        ),
        _ => RelatedIds::None,
    }
}
