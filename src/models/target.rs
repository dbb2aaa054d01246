//! Target model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::Resource;

/// A REST target: the repository, image or other source projects are
/// imported from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource for Target {
    const RESOURCE: &'static str = "targets";
}
