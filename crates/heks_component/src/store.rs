//! Name-keyed component storage.
//!
//! Storage is organised per component rather than per entity:
//! `component name → entity id → value`. Asking for "every entity with
//! `enemy`" only touches the `enemy` map, and sparse components cost nothing
//! for entities that lack them.
//!
//! The store knows nothing about entity liveness; [`World`](crate::World)
//! guards every write with a registry check.

use std::collections::HashMap;

use serde_json::Value;

use crate::component::Components;
use crate::entity::EntityId;

/// The canonical table of component values.
///
/// Invariant: a component name is present as a key only while at least one
/// entity holds that component. Removing the last entry prunes the name.
#[derive(Debug, Default)]
pub struct ComponentStore {
    components: HashMap<String, HashMap<EntityId, Value>>,
}

impl ComponentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` for `entity`, creating the component map if needed.
    pub fn insert(&mut self, component: &str, entity: EntityId, value: Value) {
        self.components
            .entry(component.to_string())
            .or_default()
            .insert(entity, value);
    }

    /// Removes one entry. A missing component or entry is a no-op.
    ///
    /// Returns the removed value, if any.
    pub fn remove(&mut self, component: &str, entity: &EntityId) -> Option<Value> {
        let entries = self.components.get_mut(component)?;
        let removed = entries.remove(entity)?;
        if entries.is_empty() {
            self.components.remove(component);
        }
        Some(removed)
    }

    /// Removes every component held by `entity`.
    pub fn remove_all(&mut self, entity: &EntityId) {
        let names: Vec<String> = self.components.keys().cloned().collect();
        for name in names {
            self.remove(&name, entity);
        }
    }

    #[must_use]
    pub fn get(&self, component: &str, entity: &EntityId) -> Option<&Value> {
        self.components.get(component)?.get(entity)
    }

    pub fn get_mut(&mut self, component: &str, entity: &EntityId) -> Option<&mut Value> {
        self.components.get_mut(component)?.get_mut(entity)
    }

    /// All entries of one component, or `None` if no entity holds it.
    #[must_use]
    pub fn entries(&self, component: &str) -> Option<&HashMap<EntityId, Value>> {
        self.components.get(component)
    }

    /// Returns `true` if at least one entity holds `component`.
    #[must_use]
    pub fn has_component(&self, component: &str) -> bool {
        self.components.contains_key(component)
    }

    /// Snapshot of every component `entity` holds.
    #[must_use]
    pub fn snapshot(&self, entity: &EntityId) -> Components {
        self.components
            .iter()
            .filter_map(|(name, entries)| {
                entries
                    .get(entity)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }

    /// Names of all components currently held by any entity.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Returns `true` if `entity` appears under any component.
    #[must_use]
    pub fn references(&self, entity: &EntityId) -> bool {
        self.components.values().any(|e| e.contains_key(entity))
    }
}
