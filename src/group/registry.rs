//! Group Registry
//!
//! Name to group lookup, built once at startup and shared read-only with
//! everything that resolves group names (the peer server, the front end).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::{CacheError, Result};
use crate::group::Group;

// == Group Registry ==
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<String, Arc<Group>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Adds a group, failing if the name is already taken.
    pub fn register(&mut self, group: Group) -> Result<Arc<Group>> {
        let name = group.name().to_string();
        if self.groups.contains_key(&name) {
            return Err(CacheError::DuplicateGroup(name));
        }

        let group = Arc::new(group);
        self.groups.insert(name.clone(), Arc::clone(&group));
        info!(group = %name, "Registered cache group");
        Ok(group)
    }

    // == Get ==
    /// Looks a group up by name.
    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.get(name).cloned()
    }

    /// Iterates over all registered groups.
    pub fn groups(&self) -> impl Iterator<Item = &Arc<Group>> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
