//! Update trait for modifying records.

use async_trait::async_trait;

use crate::client::SnykClient;
use crate::descriptor::PathParams;
use crate::error::Result;

/// Update an existing record.
///
/// # Example
///
/// ```no_run
/// use snykapi::{PathParams, ProjectCollection, ProjectCollectionUpdate, SnykClient, Update};
///
/// # async fn example(client: SnykClient) -> snykapi::Result<()> {
/// let scope = PathParams::new().with("org_id", "my-org-id");
/// let updated = ProjectCollection::update(
///     &client,
///     &scope,
///     "collection-id",
///     ProjectCollectionUpdate { name: Some("Renamed".to_string()) },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Update: Sized {
    /// Fields accepted by the update.
    type Params: Send;

    /// Update the record and return its new state.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist, or the request error.
    async fn update(
        client: &SnykClient,
        scope: &PathParams,
        id: &str,
        params: Self::Params,
    ) -> Result<Self>;
}
