//! Project model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::SnykClient;
use crate::error::Result;
use crate::traits::Resource;

/// A Snyk project as returned by the v1 API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,

    /// Package manager or scan type, e.g. `"npm"`, `"sast"`.
    #[serde(rename = "type", default)]
    pub project_type: Option<String>,

    /// Integration the project was imported from, e.g. `"github"`.
    #[serde(default)]
    pub origin: Option<String>,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_tested_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub total_dependencies: Option<u64>,

    #[serde(default)]
    pub issue_counts_by_severity: IssueCounts,

    #[serde(default)]
    pub is_monitored: Option<bool>,

    #[serde(default)]
    pub branch: Option<String>,

    #[serde(default)]
    pub browse_url: Option<String>,

    #[serde(default)]
    pub remote_repo_url: Option<String>,

    #[serde(default)]
    pub tags: Vec<ProjectTag>,
}

/// Issue counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    #[serde(default)]
    pub low: u32,
    #[serde(default)]
    pub medium: u32,
    #[serde(default)]
    pub high: u32,
    #[serde(default)]
    pub critical: u32,
}

impl IssueCounts {
    pub fn total(&self) -> u32 {
        self.low + self.medium + self.high + self.critical
    }
}

/// A `key=value` project tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTag {
    pub key: String,
    pub value: String,
}

impl Resource for Project {
    const RESOURCE: &'static str = "projects";
}

impl Project {
    /// Whether any high or critical issue is open.
    pub fn has_severe_issues(&self) -> bool {
        self.issue_counts_by_severity.high + self.issue_counts_by_severity.critical > 0
    }

    /// Delete this project from its organization.
    pub async fn delete(&self, client: &SnykClient, org_id: &str) -> Result<()> {
        client
            .manager(Self::RESOURCE)?
            .scoped("org_id", org_id)
            .delete(&self.id)
            .await
    }
}
