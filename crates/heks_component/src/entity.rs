//! Entity identifiers and the registry of live entities.
//!
//! An [`EntityId`] is an opaque string. Entities carry no data of their own;
//! everything an entity "is" lives in the component store.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A globally unique entity identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random (UUID v4) identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Tracks which entity ids are live, in creation order.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    order: Vec<EntityId>,
    alive: HashSet<EntityId>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id`. Returns `false` (and changes nothing) if it is already
    /// live.
    pub fn insert(&mut self, id: EntityId) -> bool {
        if !self.alive.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Unregisters `id`. Returns `true` if it was live.
    pub fn remove(&mut self, id: &EntityId) -> bool {
        if !self.alive.remove(id) {
            return false;
        }
        self.order.retain(|e| e != id);
        true
    }

    /// Returns whether `id` is live.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.alive.contains(id)
    }

    /// Live ids in creation order.
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.order
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
