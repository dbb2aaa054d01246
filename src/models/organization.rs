//! Organization model.

use serde::{Deserialize, Serialize};

use crate::client::SnykClient;
use crate::descriptor::PathParams;
use crate::error::Result;
use crate::manager::ListQuery;
use crate::traits::{List, Resource};

use super::{Project, Target};

/// A Snyk organization as listed by the v1 API.
///
/// The owning group is exposed as the `group` relationship of the
/// untyped [`Model`](crate::Model), not as a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    /// Web UI URL of the organization.
    #[serde(default)]
    pub url: Option<String>,
}

impl Resource for Organization {
    const RESOURCE: &'static str = "orgs";
}

impl Organization {
    /// Path parameters addressing resources below this organization.
    pub fn scope(&self) -> PathParams {
        PathParams::new().with("org_id", self.id.as_str())
    }

    /// All v1 projects of this organization.
    pub async fn projects(&self, client: &SnykClient) -> Result<Vec<Project>> {
        Project::list_all(client, &self.scope(), &ListQuery::default()).await
    }

    /// All REST targets of this organization.
    pub async fn targets(&self, client: &SnykClient) -> Result<Vec<Target>> {
        Target::list_all(client, &self.scope(), &ListQuery::default()).await
    }
}
