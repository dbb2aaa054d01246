//! Mock server state management.
//!
//! Records are stored in wire form: v1 records as flat objects, REST
//! records as JSON:API resource objects.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// Shared state for the mock server.
#[derive(Debug, Default)]
pub struct MockState {
    /// v1 organizations, in listing order.
    pub orgs: Vec<Value>,

    /// v1 projects per organization id.
    pub projects: BTreeMap<String, Vec<Value>>,

    /// REST targets per organization id.
    pub targets: BTreeMap<String, Vec<Value>>,

    /// REST collections per organization id.
    pub collections: BTreeMap<String, Vec<Value>>,

    /// REST `self` resource.
    pub user: Option<Value>,

    /// Optional authentication token. If set, requests must send
    /// `Authorization: token <value>`.
    pub required_token: Option<String>,

    /// Page size used when a REST request sends no `limit`.
    pub default_limit: usize,

    next_id: u64,
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self {
            default_limit: 10,
            ..Self::default()
        }
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    pub fn with_org(mut self, org: Value) -> Self {
        self.orgs.push(org);
        self
    }

    pub fn with_project(mut self, org_id: &str, project: Value) -> Self {
        self.projects.entry(org_id.to_string()).or_default().push(project);
        self
    }

    pub fn with_target(mut self, org_id: &str, target: Value) -> Self {
        self.targets.entry(org_id.to_string()).or_default().push(target);
        self
    }

    pub fn with_collection(mut self, org_id: &str, collection: Value) -> Self {
        self.collections
            .entry(org_id.to_string())
            .or_default()
            .push(collection);
        self
    }

    pub fn with_user(mut self, user: Value) -> Self {
        self.user = Some(user);
        self
    }

    /// Set the required authentication token.
    pub fn with_required_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    pub fn has_org(&self, org_id: &str) -> bool {
        self.orgs.iter().any(|o| record_id(o) == Some(org_id))
    }

    /// Find a record by id in a per-org table.
    pub fn find<'a>(
        table: &'a BTreeMap<String, Vec<Value>>,
        org_id: &str,
        id: &str,
    ) -> Option<&'a Value> {
        table
            .get(org_id)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)))
    }

    /// Remove a record by id; returns whether it existed.
    pub fn remove(table: &mut BTreeMap<String, Vec<Value>>, org_id: &str, id: &str) -> bool {
        let Some(records) = table.get_mut(org_id) else {
            return false;
        };
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        records.len() != before
    }

    /// Create a REST collection and return it.
    pub fn create_collection(&mut self, org_id: &str, attributes: Map<String, Value>) -> Value {
        self.next_id += 1;
        let record = serde_json::json!({
            "id": format!("col-new-{}", self.next_id),
            "type": "collection",
            "attributes": attributes,
        });
        self.collections
            .entry(org_id.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    /// Merge attributes into a REST collection and return its new state.
    pub fn update_collection(
        &mut self,
        org_id: &str,
        id: &str,
        attributes: Map<String, Value>,
    ) -> Option<Value> {
        let record = self
            .collections
            .get_mut(org_id)?
            .iter_mut()
            .find(|r| record_id(r) == Some(id))?;
        if let Some(Value::Object(existing)) = record.get_mut("attributes") {
            existing.extend(attributes);
        }
        Some(record.clone())
    }
}

pub(crate) fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server::Fixtures;

    #[test]
    fn test_state_find_and_remove() {
        let mut state = MockState::new()
            .with_project("org-1", Fixtures::v1_project("p1", "api"))
            .with_project("org-1", Fixtures::v1_project("p2", "web"));

        assert!(MockState::find(&state.projects, "org-1", "p2").is_some());
        assert!(MockState::find(&state.projects, "org-2", "p2").is_none());

        assert!(MockState::remove(&mut state.projects, "org-1", "p1"));
        assert!(!MockState::remove(&mut state.projects, "org-1", "p1"));
        assert_eq!(state.projects["org-1"].len(), 1);
    }

    #[test]
    fn test_state_create_and_update_collection() {
        let mut state = MockState::new();
        let mut attributes = Map::new();
        attributes.insert("name".into(), "Backend".into());
        let created = state.create_collection("org-1", attributes);
        let id = record_id(&created).unwrap().to_string();

        let mut change = Map::new();
        change.insert("name".into(), "Services".into());
        let updated = state.update_collection("org-1", &id, change).unwrap();
        assert_eq!(updated["attributes"]["name"], "Services");
        assert!(state.update_collection("org-1", "missing", Map::new()).is_none());
    }
}
