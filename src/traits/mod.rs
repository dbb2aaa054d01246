//! Typed operations over [`Manager`](crate::Manager).
//!
//! A record type implements [`Resource`] to name the registry entry it is
//! read from; [`Get`] and [`List`] then come for free. [`Update`] is
//! implemented per type because the accepted fields differ.

mod get;
mod list;
mod update;

pub use get::Get;
pub use list::List;
pub use update::Update;

use serde::de::DeserializeOwned;

/// A typed view of one registry resource.
pub trait Resource: DeserializeOwned + Send + 'static {
    /// Registry name, e.g. `"targets"`.
    const RESOURCE: &'static str;
}
