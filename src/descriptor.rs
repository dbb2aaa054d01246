//! Static resource descriptors.
//!
//! A descriptor tells the core where a resource lives, which API
//! generation serves it, how its lists paginate, where records sit in a
//! response body and which fields are relationships. Tables are plain
//! `static` data, usually emitted by a generator from the vendor's OpenAPI
//! document, and validated once through [`Registry::new`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::error::{Result, SnykError};
use crate::version::ApiVersion;

/// Which vendor API family serves a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    /// Legacy offset-paginated API under `/v1`.
    V1,
    /// Versioned JSON:API under `/rest`.
    Rest,
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("v1"),
            Self::Rest => f.write_str("rest"),
        }
    }
}

/// How a collection endpoint pages its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationKind {
    /// `page` / `perPage` query parameters.
    Offset,
    /// Opaque `starting_after` / `ending_before` tokens from `links`.
    Cursor,
    /// The endpoint returns everything in one response.
    None,
}

/// Where the records of a list response live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    /// JSON:API top-level `data` array.
    Data,
    /// A V1 object member, e.g. `{"orgs": [...]}`.
    Key(&'static str),
    /// The V1 body is itself the array.
    Root,
}

/// A relationship declared by a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationRule {
    /// Records of `target` scoped under this record: the record id is
    /// bound to the `param` placeholder of the target's path.
    Child {
        name: &'static str,
        target: &'static str,
        param: &'static str,
    },
    /// A V1 field embedding a related record (or its bare id).
    Reference {
        name: &'static str,
        field: &'static str,
        target: &'static str,
    },
}

impl RelationRule {
    /// The relationship name exposed on models.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Child { name, .. } | Self::Reference { name, .. } => name,
        }
    }

    /// The descriptor name of the related resource.
    pub const fn target(&self) -> &'static str {
        match self {
            Self::Child { target, .. } | Self::Reference { target, .. } => target,
        }
    }
}

/// Write operations a resource accepts. Listing is always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operations {
    pub get: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Operations {
    /// List and get only.
    pub const READ: Self = Self {
        get: true,
        create: false,
        update: false,
        delete: false,
    };

    /// Every operation.
    pub const ALL: Self = Self {
        get: true,
        create: true,
        update: true,
        delete: true,
    };

    /// Listing only (no single-resource endpoint).
    pub const LIST: Self = Self {
        get: false,
        create: false,
        update: false,
        delete: false,
    };

    #[must_use]
    pub const fn with_create(self) -> Self {
        Self {
            create: true,
            ..self
        }
    }

    #[must_use]
    pub const fn with_delete(self) -> Self {
        Self {
            delete: true,
            ..self
        }
    }
}

/// Static metadata for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Registry key, e.g. `"targets"`.
    pub name: &'static str,
    /// JSON:API `type` (REST) or record kind (V1), used for create bodies
    /// and relationship target lookup.
    pub resource_type: &'static str,
    pub generation: Generation,
    /// Collection path template, e.g. `"orgs/{org_id}/targets"`.
    pub path: &'static str,
    /// Single-resource template containing `{id}`.
    pub item_path: Option<&'static str>,
    /// Version pinned for this resource; overrides the client default.
    pub required_version: Option<&'static str>,
    pub pagination: PaginationKind,
    pub records: RecordSource,
    /// V1 field carrying the record id.
    pub id_field: &'static str,
    pub relations: &'static [RelationRule],
    pub operations: Operations,
}

impl EndpointDescriptor {
    /// A V1 resource listed in one response from `body[key]`.
    pub const fn v1(name: &'static str, resource_type: &'static str, path: &'static str) -> Self {
        Self {
            name,
            resource_type,
            generation: Generation::V1,
            path,
            item_path: None,
            required_version: None,
            pagination: PaginationKind::None,
            records: RecordSource::Key(name),
            id_field: "id",
            relations: &[],
            operations: Operations::LIST,
        }
    }

    /// A cursor-paginated REST resource.
    pub const fn rest(name: &'static str, resource_type: &'static str, path: &'static str) -> Self {
        Self {
            name,
            resource_type,
            generation: Generation::Rest,
            path,
            item_path: None,
            required_version: None,
            pagination: PaginationKind::Cursor,
            records: RecordSource::Data,
            id_field: "id",
            relations: &[],
            operations: Operations::LIST,
        }
    }

    #[must_use]
    pub const fn item(self, item_path: &'static str) -> Self {
        Self {
            item_path: Some(item_path),
            operations: Operations {
                get: true,
                ..self.operations
            },
            ..self
        }
    }

    #[must_use]
    pub const fn version(self, version: &'static str) -> Self {
        Self {
            required_version: Some(version),
            ..self
        }
    }

    #[must_use]
    pub const fn paginate(self, pagination: PaginationKind) -> Self {
        Self { pagination, ..self }
    }

    #[must_use]
    pub const fn records(self, records: RecordSource) -> Self {
        Self { records, ..self }
    }

    #[must_use]
    pub const fn id_field(self, id_field: &'static str) -> Self {
        Self { id_field, ..self }
    }

    #[must_use]
    pub const fn relations(self, relations: &'static [RelationRule]) -> Self {
        Self { relations, ..self }
    }

    #[must_use]
    pub const fn operations(self, operations: Operations) -> Self {
        Self { operations, ..self }
    }

    /// The pinned version, parsed.
    pub fn pinned_version(&self) -> Result<Option<ApiVersion>> {
        self.required_version.map(str::parse).transpose()
    }

    /// Find a relation rule by name.
    pub fn relation(&self, name: &str) -> Option<&'static RelationRule> {
        self.relations.iter().find(|r| r.name() == name)
    }

    /// Fill the collection template.
    pub fn collection_path(&self, params: &PathParams) -> Result<String> {
        fill_template(self.name, self.path, params, None)
    }

    /// Fill the single-resource template.
    pub fn resource_path(&self, params: &PathParams, id: &str) -> Result<String> {
        let template = self.item_path.ok_or_else(|| {
            SnykError::config(format!("resource '{}' has no single-resource path", self.name))
        })?;
        fill_template(self.name, template, params, Some(id))
    }
}

/// Descriptor used for managers bound to a server-provided link whose
/// target resource is not in the registry.
pub(crate) static LINKED_RESOURCE: EndpointDescriptor =
    EndpointDescriptor::rest("linked", "resource", "");

/// Values for path template placeholders, typically the ids of the
/// parent resources (`org_id`, `group_id`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(BTreeMap<String, String>);

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn placeholders(template: &str) -> Result<Vec<&str>> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| SnykError::config(format!("unclosed placeholder in '{template}'")))?;
        names.push(&after[..end]);
        rest = &after[end + 1..];
    }
    if rest.contains('}') {
        return Err(SnykError::config(format!("unbalanced '}}' in '{template}'")));
    }
    Ok(names)
}

fn fill_template(
    resource: &str,
    template: &str,
    params: &PathParams,
    id: Option<&str>,
) -> Result<String> {
    let mut path = template.to_string();
    for name in placeholders(template)? {
        let value = match (name, id) {
            ("id", Some(id)) => id,
            _ => params.get(name).ok_or_else(|| {
                SnykError::config(format!(
                    "resource '{resource}' requires path parameter '{name}'"
                ))
            })?,
        };
        path = path.replace(&format!("{{{name}}}"), &urlencoding::encode(value));
    }
    Ok(path)
}

/// A validated, read-only descriptor table.
#[derive(Debug, Clone)]
pub struct Registry {
    descriptors: &'static [EndpointDescriptor],
    by_name: HashMap<&'static str, usize>,
}

impl Registry {
    /// Validate a descriptor table.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if names collide, a relation points to
    /// an unknown resource, a placeholder is malformed, a pinned version does
    /// not parse, or a pagination kind does not belong to the generation.
    pub fn new(descriptors: &'static [EndpointDescriptor]) -> Result<Self> {
        let mut by_name = HashMap::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            if by_name.insert(descriptor.name, index).is_some() {
                return Err(SnykError::config(format!(
                    "duplicate resource descriptor '{}'",
                    descriptor.name
                )));
            }
        }

        let registry = Self {
            descriptors,
            by_name,
        };
        for descriptor in descriptors {
            registry.validate(descriptor)?;
        }
        Ok(registry)
    }

    /// The descriptor table shipped with the crate.
    pub fn builtin() -> Self {
        Self::new(BUILTIN).unwrap_or_else(|e| unreachable!("builtin descriptors are invalid: {e}"))
    }

    /// Look up a descriptor by name.
    pub fn lookup(&self, name: &str) -> Result<&'static EndpointDescriptor> {
        self.by_name
            .get(name)
            .map(|&i| &self.descriptors[i])
            .ok_or_else(|| SnykError::config(format!("unknown resource '{name}'")))
    }

    /// Find the REST descriptor that can fetch a record of this JSON:API
    /// type by id: it needs an item path whose other placeholders are all
    /// bound in `scope`.
    pub fn by_type(
        &self,
        resource_type: &str,
        scope: &PathParams,
    ) -> Option<&'static EndpointDescriptor> {
        self.descriptors.iter().find(|d| {
            d.generation == Generation::Rest
                && d.resource_type == resource_type
                && d.item_path.is_some_and(|item| {
                    placeholders(item).is_ok_and(|names| {
                        names
                            .iter()
                            .all(|name| *name == "id" || scope.get(name).is_some())
                    })
                })
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static EndpointDescriptor> {
        self.descriptors.iter()
    }

    fn validate(&self, d: &EndpointDescriptor) -> Result<()> {
        let fail = |reason: String| SnykError::config(format!("descriptor '{}': {reason}", d.name));

        match (d.generation, d.pagination) {
            (Generation::V1, PaginationKind::Cursor) => {
                return Err(fail("v1 resources cannot use cursor pagination".into()))
            }
            (Generation::Rest, PaginationKind::Offset) => {
                return Err(fail("REST resources cannot use offset pagination".into()))
            }
            _ => {}
        }
        match (d.generation, d.records) {
            (Generation::Rest, RecordSource::Data) | (Generation::V1, RecordSource::Key(_))
            | (Generation::V1, RecordSource::Root) => {}
            _ => return Err(fail("record source does not match the API generation".into())),
        }

        if d.required_version.is_some() && d.generation == Generation::V1 {
            return Err(fail("v1 resources are unversioned".into()));
        }
        d.pinned_version().map_err(|e| fail(e.to_string()))?;

        placeholders(d.path).map_err(|e| fail(e.to_string()))?;
        if let Some(item) = d.item_path {
            if !placeholders(item).map_err(|e| fail(e.to_string()))?.contains(&"id") {
                return Err(fail(format!("item path '{item}' lacks an {{id}} placeholder")));
            }
        }

        let mut seen = HashSet::new();
        for rule in d.relations {
            if !seen.insert(rule.name()) {
                return Err(fail(format!("duplicate relation '{}'", rule.name())));
            }
            let target = self
                .lookup(rule.target())
                .map_err(|_| fail(format!("relation '{}' targets unknown resource '{}'", rule.name(), rule.target())))?;
            if let RelationRule::Child { param, .. } = rule {
                if !placeholders(target.path)?.contains(param) {
                    return Err(fail(format!(
                        "relation '{}' binds '{param}' which '{}' does not use",
                        rule.name(),
                        target.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

const ORG_RELATIONS: &[RelationRule] = &[
    RelationRule::Child {
        name: "projects",
        target: "projects",
        param: "org_id",
    },
    RelationRule::Child {
        name: "members",
        target: "members",
        param: "org_id",
    },
    RelationRule::Child {
        name: "dependencies",
        target: "dependencies",
        param: "org_id",
    },
    RelationRule::Child {
        name: "targets",
        target: "targets",
        param: "org_id",
    },
    RelationRule::Child {
        name: "issues",
        target: "issues",
        param: "org_id",
    },
    RelationRule::Child {
        name: "collections",
        target: "collections",
        param: "org_id",
    },
    RelationRule::Child {
        name: "service_accounts",
        target: "service_accounts",
        param: "org_id",
    },
    RelationRule::Child {
        name: "invites",
        target: "invites",
        param: "org_id",
    },
    RelationRule::Child {
        name: "environments",
        target: "environments",
        param: "org_id",
    },
    RelationRule::Child {
        name: "apps",
        target: "apps",
        param: "org_id",
    },
    RelationRule::Child {
        name: "audit_logs",
        target: "audit_logs",
        param: "org_id",
    },
    RelationRule::Reference {
        name: "group",
        field: "group",
        target: "groups",
    },
];

const GROUP_RELATIONS: &[RelationRule] = &[RelationRule::Child {
    name: "orgs",
    target: "group_orgs",
    param: "group_id",
}];

static BUILTIN: &[EndpointDescriptor] = &[
    // v1
    EndpointDescriptor::v1("orgs", "org", "orgs").relations(ORG_RELATIONS),
    EndpointDescriptor::v1("projects", "project", "org/{org_id}/projects")
        .item("org/{org_id}/project/{id}")
        .operations(Operations::READ.with_delete()),
    EndpointDescriptor::v1("members", "member", "org/{org_id}/members").records(RecordSource::Root),
    EndpointDescriptor::v1("dependencies", "dependency", "org/{org_id}/dependencies")
        .paginate(PaginationKind::Offset)
        .records(RecordSource::Key("results")),
    // REST
    EndpointDescriptor::rest("targets", "target", "orgs/{org_id}/targets")
        .item("orgs/{org_id}/targets/{id}"),
    EndpointDescriptor::rest("rest_projects", "project", "orgs/{org_id}/projects")
        .item("orgs/{org_id}/projects/{id}"),
    EndpointDescriptor::rest("issues", "issue", "orgs/{org_id}/issues")
        .item("orgs/{org_id}/issues/{id}"),
    EndpointDescriptor::rest("groups", "group", "groups")
        .item("groups/{id}")
        .relations(GROUP_RELATIONS),
    EndpointDescriptor::rest("rest_orgs", "org", "orgs").item("orgs/{id}"),
    EndpointDescriptor::rest("group_orgs", "org", "groups/{group_id}/orgs"),
    EndpointDescriptor::rest("self", "user", "self").paginate(PaginationKind::None),
    EndpointDescriptor::rest("collections", "collection", "orgs/{org_id}/collections")
        .item("orgs/{org_id}/collections/{id}")
        .operations(Operations::ALL),
    EndpointDescriptor::rest("service_accounts", "service_account", "orgs/{org_id}/service_accounts")
        .item("orgs/{org_id}/service_accounts/{id}")
        .operations(Operations::READ.with_create().with_delete()),
    EndpointDescriptor::rest("invites", "org_invitation", "orgs/{org_id}/invites")
        .item("orgs/{org_id}/invites/{id}")
        .operations(Operations::LIST.with_create().with_delete()),
    EndpointDescriptor::rest("environments", "environment", "orgs/{org_id}/cloud/environments")
        .item("orgs/{org_id}/cloud/environments/{id}")
        .version("2023-04-28~beta")
        .operations(Operations::ALL),
    EndpointDescriptor::rest("apps", "app", "orgs/{org_id}/apps/creations")
        .item("orgs/{org_id}/apps/creations/{id}")
        .operations(Operations::READ.with_create().with_delete()),
    EndpointDescriptor::rest("audit_logs", "audit_log", "orgs/{org_id}/audit_logs/search")
        .version("2023-09-11~beta"),
];
