//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic wire records.

use serde_json::{json, Value};

/// Collection of fixture factories for test data.
pub struct Fixtures;

/// Data loaded by [`MockServer::start`](super::MockServer::start).
pub struct DefaultScenario {
    pub orgs: Vec<Value>,
    pub projects: Vec<(String, Value)>,
    pub targets: Vec<(String, Value)>,
    pub collections: Vec<(String, Value)>,
    pub user: Value,
}

impl Fixtures {
    /// A v1 organization, optionally inside a group.
    pub fn org(id: &str, name: &str, group_id: Option<&str>) -> Value {
        let mut org = json!({
            "id": id,
            "name": name,
            "slug": name.to_lowercase().replace(' ', "-"),
            "url": format!("https://app.snyk.io/org/{id}"),
        });
        if let Some(group_id) = group_id {
            org["group"] = json!({"id": group_id, "name": "Holding"});
        }
        org
    }

    /// A v1 project.
    pub fn v1_project(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "type": "npm",
            "origin": "github",
            "created": "2024-03-01T10:00:00.000Z",
            "totalDependencies": 42,
            "isMonitored": true,
            "issueCountsBySeverity": {"low": 3, "medium": 2, "high": 1, "critical": 0},
            "tags": [{"key": "team", "value": "platform"}],
        })
    }

    /// A REST target.
    pub fn target(id: &str, display_name: &str) -> Value {
        json!({
            "id": id,
            "type": "target",
            "attributes": {
                "display_name": display_name,
                "url": format!("https://github.com/acme/{display_name}"),
                "is_private": false,
                "created_at": "2024-03-01T10:00:00Z",
            },
            "relationships": {
                "integration": {"data": {"id": "int-1", "type": "integration"}},
            },
        })
    }

    /// A REST project collection.
    pub fn collection(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "type": "collection",
            "attributes": {"name": name, "is_generated": false},
        })
    }

    /// The REST `self` resource.
    pub fn user(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "type": "user",
            "attributes": {"name": name, "username": name.to_lowercase(), "email": "dev@acme.test"},
        })
    }

    /// Two organizations, three projects and 25 targets in `org-1`.
    pub fn default_scenario() -> DefaultScenario {
        let org_1 = "org-1".to_string();
        DefaultScenario {
            orgs: vec![
                Self::org("org-1", "Acme", Some("grp-1")),
                Self::org("org-2", "Acme Labs", None),
            ],
            projects: vec![
                (org_1.clone(), Self::v1_project("prj-1", "acme/api:package.json")),
                (org_1.clone(), Self::v1_project("prj-2", "acme/web:package.json")),
                (org_1.clone(), Self::v1_project("prj-3", "acme/cli:Cargo.toml")),
            ],
            targets: (1..=25)
                .map(|n| (org_1.clone(), Self::target(&format!("tgt-{n:02}"), &format!("repo-{n:02}"))))
                .collect(),
            collections: vec![(org_1, Self::collection("col-1", "Backend"))],
            user: Self::user("usr-1", "Dev"),
        }
    }
}
