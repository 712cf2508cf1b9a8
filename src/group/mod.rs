//! Group Module
//!
//! Named cache namespaces, their data loaders and the registry that
//! resolves group names.

#[allow(clippy::module_inception)]
mod group;
mod loader;
mod registry;
mod stats;

pub use group::Group;
pub use loader::{Loader, LoaderFn};
pub use registry::GroupRegistry;
pub use stats::{GroupStats, GroupStatsSnapshot};
