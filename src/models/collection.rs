//! Project collection model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::SnykClient;
use crate::descriptor::PathParams;
use crate::error::{Result, SnykError};
use crate::traits::{Resource, Update};

/// A named set of projects within an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCollection {
    pub id: String,
    pub name: String,
    /// Collections generated by Snyk cannot be edited.
    #[serde(default)]
    pub is_generated: bool,
}

/// Fields accepted when updating a collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectCollectionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Resource for ProjectCollection {
    const RESOURCE: &'static str = "collections";
}

impl ProjectCollection {
    /// Create a collection in the organization `org_id`.
    pub async fn create(client: &SnykClient, org_id: &str, name: &str) -> Result<Self> {
        client
            .manager(Self::RESOURCE)?
            .scoped("org_id", org_id)
            .create(serde_json::json!({ "name": name }))
            .await?
            .into_typed()
    }
}

#[async_trait]
impl Update for ProjectCollection {
    type Params = ProjectCollectionUpdate;

    async fn update(
        client: &SnykClient,
        scope: &PathParams,
        id: &str,
        params: Self::Params,
    ) -> Result<Self> {
        let attributes = serde_json::to_value(&params)
            .map_err(|e| SnykError::config(format!("cannot encode collection update: {e}")))?;
        client
            .manager(Self::RESOURCE)?
            .with_scope(scope)
            .update(id, attributes)
            .await?
            .into_typed()
    }
}
