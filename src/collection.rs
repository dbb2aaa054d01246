//! Lazy, restartable collections of raw records.
//!
//! A [`Collection`] only describes a list request; nothing is fetched until
//! a [`Traversal`] started from it is pulled. Each traversal owns its
//! paginator and holds at most one page in memory.

use std::collections::VecDeque;

use futures::future::try_join_all;
use futures::stream::{self, Stream};
use serde_json::Value;

use crate::descriptor::RecordSource;
use crate::error::{Result, SnykError};
use crate::pagination::{Advance, OffsetPaginator, Page, PageMeta, Paginator};
use crate::transport::Transport;

const MAX_CONCURRENT_PAGES: usize = 16;

/// Take the records out of a list response body.
pub(crate) fn extract_records(body: Value, source: RecordSource) -> Result<Vec<Value>> {
    match source {
        RecordSource::Data => match body {
            Value::Object(mut object) => match object.remove("data") {
                Some(Value::Array(records)) => Ok(records),
                Some(other) => Err(SnykError::protocol(format!(
                    "expected `data` to be an array, found {}",
                    kind(&other)
                ))),
                None => Err(SnykError::protocol("list response has no `data` member")),
            },
            other => Err(SnykError::protocol(format!(
                "expected a JSON:API document, found {}",
                kind(&other)
            ))),
        },
        RecordSource::Key(key) => match body {
            Value::Null => Ok(Vec::new()),
            Value::Array(records) => Ok(records),
            Value::Object(mut object) => match object.remove(key) {
                None | Some(Value::Null) => Ok(Vec::new()),
                Some(Value::Array(records)) => Ok(records),
                Some(other) => Err(SnykError::protocol(format!(
                    "expected `{key}` to be an array, found {}",
                    kind(&other)
                ))),
            },
            other => Err(SnykError::protocol(format!(
                "expected an object with `{key}`, found {}",
                kind(&other)
            ))),
        },
        RecordSource::Root => match body {
            Value::Null => Ok(Vec::new()),
            Value::Array(records) => Ok(records),
            Value::Object(object) if object.is_empty() => Ok(Vec::new()),
            other => Err(SnykError::protocol(format!(
                "expected an array body, found {}",
                kind(&other)
            ))),
        },
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A list request that can be traversed any number of times.
///
/// Construction performs no I/O.
#[derive(Debug, Clone)]
pub struct Collection {
    transport: Transport,
    path: String,
    params: Vec<(String, String)>,
    paginator: Paginator,
    records: RecordSource,
}

impl Collection {
    pub fn new(
        transport: Transport,
        path: impl Into<String>,
        params: Vec<(String, String)>,
        paginator: Paginator,
        records: RecordSource,
    ) -> Self {
        Self {
            transport,
            path: path.into(),
            params,
            paginator,
            records,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Start a fresh traversal. Traversals never share pagination state.
    pub fn traverse(&self) -> Traversal {
        Traversal {
            collection: self.clone(),
            buffer: VecDeque::new(),
            state: State::Ready,
            pages_fetched: 0,
        }
    }

    /// Stream every record of a fresh traversal.
    pub fn into_record_stream(self) -> impl Stream<Item = Result<Value>> {
        self.traverse().into_stream()
    }

    /// Fetch every page and return all records, whatever the pagination kind.
    ///
    /// # Errors
    ///
    /// Returns the first transport, API or protocol error.
    pub async fn collect_records(&self) -> Result<Vec<Value>> {
        let mut traversal = self.traverse();
        let mut records = Vec::new();
        while let Some(record) = traversal.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Fetch offset pages `concurrency` at a time, keeping page order. The
    /// window is at most 16 pages wide.
    ///
    /// Pages after the first short page of a window are discarded.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for non-offset collections, otherwise
    /// the first error of any page in a window.
    pub async fn fetch_concurrently(&self, concurrency: usize) -> Result<Vec<Value>> {
        let Paginator::Offset(offset) = &self.paginator else {
            return Err(SnykError::config(
                "concurrent page fetching requires offset pagination",
            ));
        };
        let width = concurrency.clamp(1, MAX_CONCURRENT_PAGES) as u32;

        let mut records = Vec::new();
        let mut first = offset.page();
        loop {
            let window = (first..first.saturating_add(width)).map(|page| self.fetch_offset_page(offset, page));
            let pages = try_join_all(window).await?;
            tracing::debug!(path = %self.path, first, pages = pages.len(), "fetched page window");

            for page in pages {
                let more = offset.has_more(page.len())?;
                records.extend(page.records);
                if !more {
                    return Ok(records);
                }
            }
            first = first.saturating_add(width);
        }
    }

    async fn fetch_offset_page(&self, offset: &OffsetPaginator, page: u32) -> Result<Page> {
        let mut query = self.params.clone();
        query.extend(offset.params_for(page));
        let response = self.transport.get(&self.path, &query).await?;
        let total = response.body.get("total").and_then(Value::as_u64);
        let records = extract_records(response.body, self.records)?;
        Ok(Page::new(
            records,
            PageMeta::Offset {
                page,
                per_page: offset.per_page(),
                total,
            },
        ))
    }
}

#[derive(Debug)]
enum State {
    Ready,
    /// The last page was delivered; its continuation failed.
    Failed(SnykError),
    Exhausted,
}

/// One pass over a collection.
///
/// Errors surface on the pull that triggered them: records already
/// returned stay returned, and the traversal ends after an error.
#[derive(Debug)]
pub struct Traversal {
    collection: Collection,
    buffer: VecDeque<Value>,
    state: State,
    pages_fetched: u32,
}

impl Traversal {
    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Fetch the next page, or `None` once the traversal is over.
    ///
    /// # Errors
    ///
    /// Transport, API and protocol errors end the traversal.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        match std::mem::replace(&mut self.state, State::Exhausted) {
            State::Exhausted => return Ok(None),
            State::Failed(err) => return Err(err),
            State::Ready => {}
        }

        let page = self.fetch().await?;
        match self.collection.paginator.advance(&page) {
            Ok(Advance::Continue) => self.state = State::Ready,
            Ok(Advance::Done) => {}
            Err(err) => self.state = State::Failed(err),
        }
        Ok(Some(page))
    }

    /// Next record, fetching a page when the buffer is empty.
    ///
    /// # Errors
    ///
    /// See [`Traversal::next_page`].
    pub async fn next_record(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            match self.next_page().await? {
                Some(page) => self.buffer.extend(page.records),
                None => return Ok(None),
            }
        }
    }

    /// Stream the remaining records.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value>> {
        stream::try_unfold(self, |mut traversal| async move {
            let next = traversal.next_record().await?;
            Ok::<_, SnykError>(next.map(|record| (record, traversal)))
        })
    }

    /// Stream the remaining pages.
    pub fn into_page_stream(self) -> impl Stream<Item = Result<Page>> {
        stream::try_unfold(self, |mut traversal| async move {
            let next = traversal.next_page().await?;
            Ok::<_, SnykError>(next.map(|page| (page, traversal)))
        })
    }

    async fn fetch(&mut self) -> Result<Page> {
        let collection = &self.collection;
        let mut query = collection.params.clone();
        query.extend(collection.paginator.request_params());

        let response = collection.transport.get(&collection.path, &query).await?;
        let meta = collection.paginator.meta_for(&response.body);
        let page = Page::new(extract_records(response.body, collection.records)?, meta);
        collection.paginator.validate(&page)?;

        self.pages_fetched += 1;
        tracing::debug!(
            path = %collection.path,
            page = self.pages_fetched,
            records = page.len(),
            "fetched page"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_jsonapi_data() {
        let records = extract_records(json!({"data": [{"id": "1"}], "links": {}}), RecordSource::Data).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_extract_jsonapi_without_data_is_protocol_error() {
        let err = extract_records(json!({"links": {}}), RecordSource::Data).unwrap_err();
        assert!(matches!(err, SnykError::Protocol(_)));

        let err = extract_records(json!({"data": {"id": "1"}}), RecordSource::Data).unwrap_err();
        assert!(matches!(err, SnykError::Protocol(_)));
    }

    #[test]
    fn test_extract_v1_key() {
        let body = json!({"orgs": [{"id": "a"}, {"id": "b"}]});
        assert_eq!(extract_records(body, RecordSource::Key("orgs")).unwrap().len(), 2);
    }

    #[test]
    fn test_extract_v1_empty_object_is_empty() {
        assert!(extract_records(json!({}), RecordSource::Key("orgs")).unwrap().is_empty());
        assert!(extract_records(json!({}), RecordSource::Root).unwrap().is_empty());
        assert!(extract_records(Value::Null, RecordSource::Root).unwrap().is_empty());
    }

    #[test]
    fn test_extract_v1_key_accepts_bare_array() {
        let body = json!([{"id": "a"}]);
        assert_eq!(extract_records(body, RecordSource::Key("orgs")).unwrap().len(), 1);
    }

    #[test]
    fn test_extract_v1_wrong_shape() {
        let err = extract_records(json!({"orgs": "nope"}), RecordSource::Key("orgs")).unwrap_err();
        assert!(matches!(err, SnykError::Protocol(_)));
        let err = extract_records(json!("nope"), RecordSource::Root).unwrap_err();
        assert!(matches!(err, SnykError::Protocol(_)));
    }
}
