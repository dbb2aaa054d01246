//! Pagination for both API generations.
//!
//! v1 lists page with `page` / `perPage` integers; REST lists page with
//! opaque cursors found in the JSON:API `links` object. Both are driven
//! through [`Paginator`], chosen once from the resource descriptor.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::descriptor::PaginationKind;
use crate::error::{Result, SnykError};
use crate::manager::ListQuery;

/// Default `perPage` for offset traversals.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Which way a cursor traversal walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Follow `links.next` with `starting_after`.
    #[default]
    Forward,
    /// Follow `links.prev` with `ending_before`.
    Backward,
}

impl Direction {
    /// Query parameter carrying the cursor.
    pub fn param(self) -> &'static str {
        match self {
            Self::Forward => "starting_after",
            Self::Backward => "ending_before",
        }
    }

    fn link_name(self) -> &'static str {
        match self {
            Self::Forward => "next",
            Self::Backward => "prev",
        }
    }
}

/// JSON:API top-level `links`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    #[serde(rename = "self")]
    pub self_link: Option<String>,
    pub first: Option<String>,
    pub last: Option<String>,
    pub next: Option<String>,
    pub prev: Option<String>,
    /// Names of links that were present but neither a string nor an
    /// object with a string `href`.
    #[serde(skip)]
    malformed: Vec<&'static str>,
}

impl PageLinks {
    /// Read `links` from a response body. Each link may be a string or an
    /// object with an `href`. An absent or `null` link is treated as missing.
    pub fn from_body(body: &Value) -> Self {
        let links = body.get("links");
        let mut malformed = Vec::new();
        let mut link = |name: &'static str| match links.and_then(|l| l.get(name)) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(o)) if o.get("href").is_some_and(Value::is_string) => {
                o.get("href").and_then(Value::as_str).map(String::from)
            }
            Some(_) => {
                malformed.push(name);
                None
            }
        };
        Self {
            self_link: link("self"),
            first: link("first"),
            last: link("last"),
            next: link("next"),
            prev: link("prev"),
            malformed,
        }
    }

    /// Whether the named link was present but unusable.
    pub fn is_malformed(&self, name: &str) -> bool {
        self.malformed.iter().any(|m| *m == name)
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_prev(&self) -> bool {
        self.prev.is_some()
    }

    fn get(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Forward => self.next.as_deref(),
            Direction::Backward => self.prev.as_deref(),
        }
    }
}

/// Extract a query parameter from a possibly relative link.
pub fn cursor_from_link(link: &str, param: &str) -> Option<String> {
    let url = Url::parse(link)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(link)))
        .ok()?;
    url.query_pairs()
        .find(|(k, _)| k == param)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Pagination metadata of one fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageMeta {
    Offset {
        page: u32,
        per_page: u32,
        /// Reported by some endpoints; informational only.
        total: Option<u64>,
    },
    Cursor {
        /// Cursor found in `links.next`, if any.
        starting_after: Option<String>,
        /// Cursor found in `links.prev`, if any.
        ending_before: Option<String>,
        links: PageLinks,
    },
    Single,
}

/// A page of results.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "T: Serialize")]
pub struct Page<T = Value> {
    /// The records on this page, in server order.
    pub records: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(records: Vec<T>, meta: PageMeta) -> Self {
        Self { records, meta }
    }

    /// Map the records to a different type.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            records: self.records.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }

    /// Returns true if this page has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of records on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns an iterator over the records in this page.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Outcome of advancing past a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Continue,
    Done,
}

/// `page` / `perPage` state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetPaginator {
    page: u32,
    per_page: u32,
}

impl OffsetPaginator {
    #[must_use]
    pub fn new(start_page: u32, per_page: u32) -> Self {
        Self {
            page: start_page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Page index the next request asks for.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Query parameters for a given page index.
    pub fn params_for(&self, page: u32) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), page.to_string()),
            ("perPage".to_string(), self.per_page.to_string()),
        ]
    }

    /// Whether a page with `count` records implies another page.
    ///
    /// # Errors
    ///
    /// A page longer than `perPage` is a protocol violation.
    pub fn has_more(&self, count: usize) -> Result<bool> {
        let per_page = self.per_page as usize;
        if count > per_page {
            return Err(SnykError::protocol(format!(
                "page returned {count} records, more than perPage={per_page}"
            )));
        }
        Ok(count == per_page)
    }
}

/// Opaque cursor state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPaginator {
    direction: Direction,
    cursor: Option<String>,
    limit: Option<u32>,
}

impl CursorPaginator {
    #[must_use]
    pub fn new(direction: Direction, cursor: Option<String>, limit: Option<u32>) -> Self {
        Self {
            direction,
            cursor,
            limit,
        }
    }

    /// Cursor the next request sends, if any.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Read the continuation cursor from a page's links.
    ///
    /// Returns `None` when the relevant link is absent or `null`.
    ///
    /// # Errors
    ///
    /// A link that is not a URL, or a URL without its cursor parameter, is
    /// a protocol violation.
    pub fn next_cursor(&self, links: &PageLinks) -> Result<Option<String>> {
        let name = self.direction.link_name();
        if links.is_malformed(name) {
            return Err(SnykError::protocol(format!(
                "links.{name} is present but is not a link"
            )));
        }
        let Some(link) = links.get(self.direction) else {
            return Ok(None);
        };
        let param = self.direction.param();
        cursor_from_link(link, param).map(Some).ok_or_else(|| {
            SnykError::protocol(format!(
                "links.{} is present but carries no {param} cursor: {link}",
                self.direction.link_name()
            ))
        })
    }
}

/// Pagination strategy for one traversal.
///
/// A traversal owns its paginator, so concurrent traversals never share
/// pagination state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paginator {
    Offset(OffsetPaginator),
    Cursor(CursorPaginator),
    /// One request, no continuation.
    Single,
}

impl Paginator {
    /// Select the strategy for a pagination kind.
    pub fn for_kind(kind: PaginationKind, query: &ListQuery) -> Self {
        match kind {
            PaginationKind::Offset => Self::Offset(OffsetPaginator::new(
                query.start_page().unwrap_or(1),
                query.per_page().unwrap_or(DEFAULT_PER_PAGE),
            )),
            PaginationKind::Cursor => Self::Cursor(CursorPaginator::new(
                query.direction(),
                query.cursor().map(String::from),
                query.limit(),
            )),
            PaginationKind::None => Self::Single,
        }
    }

    /// Query parameters for the next request.
    pub fn request_params(&self) -> Vec<(String, String)> {
        match self {
            Self::Offset(offset) => offset.params_for(offset.page),
            Self::Cursor(cursor) => {
                let mut params = Vec::new();
                if let Some(limit) = cursor.limit {
                    params.push(("limit".to_string(), limit.to_string()));
                }
                if let Some(c) = &cursor.cursor {
                    params.push((cursor.direction.param().to_string(), c.clone()));
                }
                params
            }
            Self::Single => Vec::new(),
        }
    }

    /// Metadata describing a page fetched with the current state.
    pub fn meta_for(&self, body: &Value) -> PageMeta {
        match self {
            Self::Offset(offset) => PageMeta::Offset {
                page: offset.page,
                per_page: offset.per_page,
                total: body.get("total").and_then(Value::as_u64),
            },
            Self::Cursor(_) => {
                let links = PageLinks::from_body(body);
                PageMeta::Cursor {
                    starting_after: links
                        .next
                        .as_deref()
                        .and_then(|l| cursor_from_link(l, Direction::Forward.param())),
                    ending_before: links
                        .prev
                        .as_deref()
                        .and_then(|l| cursor_from_link(l, Direction::Backward.param())),
                    links,
                }
            }
            Self::Single => PageMeta::Single,
        }
    }

    /// Check a page before its records are handed out.
    ///
    /// # Errors
    ///
    /// Offset pages longer than `perPage` are rejected.
    pub fn validate(&self, page: &Page) -> Result<()> {
        if let Self::Offset(offset) = self {
            offset.has_more(page.len())?;
        }
        Ok(())
    }

    /// Move past a page and decide whether another request follows.
    ///
    /// # Errors
    ///
    /// Malformed or looping cursors are protocol violations.
    pub fn advance(&mut self, page: &Page) -> Result<Advance> {
        match self {
            Self::Offset(offset) => {
                if page.is_empty() || !offset.has_more(page.len())? {
                    return Ok(Advance::Done);
                }
                offset.page += 1;
                Ok(Advance::Continue)
            }
            Self::Cursor(cursor) => {
                let links = match &page.meta {
                    PageMeta::Cursor { links, .. } => links.clone(),
                    _ => PageLinks::default(),
                };
                match cursor.next_cursor(&links)? {
                    None => Ok(Advance::Done),
                    Some(next) if cursor.cursor.as_deref() == Some(next.as_str()) => {
                        Err(SnykError::protocol(format!(
                            "server returned cursor '{next}' again; refusing to loop"
                        )))
                    }
                    Some(next) => {
                        cursor.cursor = Some(next);
                        Ok(Advance::Continue)
                    }
                }
            }
            Self::Single => Ok(Advance::Done),
        }
    }
}
