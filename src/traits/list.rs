//! List trait for fetching collections of records.

use async_trait::async_trait;

use crate::client::SnykClient;
use crate::descriptor::PathParams;
use crate::error::Result;
use crate::manager::ListQuery;
use crate::pagination::{Page, PageMeta};

use super::Resource;

/// List records with pagination handled by the resource's descriptor.
///
/// # Example
///
/// ```no_run
/// use snykapi::{List, ListQuery, Organization, PathParams, SnykClient};
///
/// # async fn example(client: SnykClient) -> snykapi::Result<()> {
/// let orgs = Organization::list_all(&client, &PathParams::new(), &ListQuery::default()).await?;
/// println!("Found {} organizations", orgs.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait List: Sized + Send {
    /// Fetch only the first page.
    ///
    /// # Errors
    ///
    /// Returns the request, protocol or hydration error.
    async fn list_page(client: &SnykClient, scope: &PathParams, query: &ListQuery)
        -> Result<Page<Self>>;

    /// Fetch every page.
    ///
    /// # Errors
    ///
    /// Returns the first error of any page or record.
    async fn list_all(client: &SnykClient, scope: &PathParams, query: &ListQuery)
        -> Result<Vec<Self>>;
}

#[async_trait]
impl<T: Resource> List for T {
    async fn list_page(
        client: &SnykClient,
        scope: &PathParams,
        query: &ListQuery,
    ) -> Result<Page<Self>> {
        let manager = client.manager(T::RESOURCE)?.with_scope(scope);
        let mut traversal = manager.collection(query)?.traverse();
        let Some(page) = traversal.next_page().await? else {
            return Ok(Page::new(Vec::new(), PageMeta::Single));
        };
        let hydrator = manager.hydrator();
        let meta = page.meta.clone();
        let records = page
            .into_iter()
            .map(|raw| hydrator.hydrate(raw)?.into_typed())
            .collect::<Result<Vec<T>>>()?;
        Ok(Page::new(records, meta))
    }

    async fn list_all(
        client: &SnykClient,
        scope: &PathParams,
        query: &ListQuery,
    ) -> Result<Vec<Self>> {
        client
            .manager(T::RESOURCE)?
            .with_scope(scope)
            .list(query)
            .await?
            .into_iter()
            .map(|model| model.into_typed())
            .collect()
    }
}
