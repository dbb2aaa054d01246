//! Typed record views over the builtin resources.

mod collection;
mod group;
mod organization;
mod project;
mod target;

pub use collection::*;
pub use group::*;
pub use organization::*;
pub use project::*;
pub use target::*;
