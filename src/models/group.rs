//! Group model.

use serde::{Deserialize, Serialize};

use crate::client::SnykClient;
use crate::descriptor::PathParams;
use crate::error::Result;
use crate::hydrate::Model;
use crate::manager::ListQuery;
use crate::traits::Resource;

/// A REST group, the parent of organizations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

impl Resource for Group {
    const RESOURCE: &'static str = "groups";
}

impl Group {
    /// Organizations in this group.
    pub async fn orgs(&self, client: &SnykClient) -> Result<Vec<Model>> {
        client
            .manager("group_orgs")?
            .with_scope(&PathParams::new().with("group_id", self.id.as_str()))
            .list(&ListQuery::default())
            .await
    }
}
