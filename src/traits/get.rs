//! Get trait for fetching single records.

use async_trait::async_trait;

use crate::client::SnykClient;
use crate::descriptor::PathParams;
use crate::error::Result;

use super::Resource;

/// Fetch a single record by id.
///
/// # Example
///
/// ```no_run
/// use snykapi::{Get, PathParams, SnykClient, Target};
///
/// # async fn example(client: SnykClient) -> snykapi::Result<()> {
/// let scope = PathParams::new().with("org_id", "my-org-id");
/// let target = Target::get(&client, &scope, "target-id").await?;
/// println!("{}", target.display_name);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Get: Sized {
    /// Fetch the record `id` under the parent `scope`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist, a hydration error
    /// if it does not fit the type, or the request error.
    async fn get(client: &SnykClient, scope: &PathParams, id: &str) -> Result<Self>;
}

#[async_trait]
impl<T: Resource> Get for T {
    async fn get(client: &SnykClient, scope: &PathParams, id: &str) -> Result<Self> {
        client
            .manager(T::RESOURCE)?
            .with_scope(scope)
            .get(id)
            .await?
            .into_typed()
    }
}
