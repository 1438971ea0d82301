//! World: entity registry plus component store.
//!
//! Every operation that names an entity checks liveness first, which keeps the
//! invariant that the store never holds an id the registry does not know.
//! Absence of a component on a live entity is a normal result (`None`), not
//! an error.

use serde_json::Value;
use tracing::debug;

use crate::component::{Components, Truthy};
use crate::entity::{EntityId, EntityRegistry};
use crate::error::ComponentError;
use crate::store::ComponentStore;

/// Live entities and their components.
#[derive(Debug, Default)]
pub struct World {
    entities: EntityRegistry,
    store: ComponentStore,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Entity lifecycle --

    /// Register a new entity with `components`.
    ///
    /// A fresh UUID is generated when `id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::EntityAlreadyExists`] if `id` is already live.
    pub fn spawn(
        &mut self,
        id: Option<EntityId>,
        components: Components,
    ) -> Result<EntityId, ComponentError> {
        let id = id.unwrap_or_else(EntityId::generate);
        if !self.entities.insert(id.clone()) {
            return Err(ComponentError::EntityAlreadyExists(id));
        }
        for (name, value) in components {
            self.store.insert(&name, id.clone(), value);
        }
        debug!(entity = %id, "spawned entity");
        Ok(id)
    }

    /// Purge every component of `id` and unregister it.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownEntity`] if `id` is not live.
    pub fn despawn(&mut self, id: &EntityId) -> Result<(), ComponentError> {
        self.ensure_alive(id)?;
        self.store.remove_all(id);
        self.entities.remove(id);
        debug!(entity = %id, "despawned entity");
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains(id)
    }

    /// Live entity ids in creation order.
    #[must_use]
    pub fn entity_ids(&self) -> &[EntityId] {
        self.entities.ids()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    // -- Component operations --

    /// Set one component on a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownEntity`] if `id` is not live.
    pub fn set_component(
        &mut self,
        id: &EntityId,
        component: &str,
        value: Value,
    ) -> Result<(), ComponentError> {
        self.ensure_alive(id)?;
        self.store.insert(component, id.clone(), value);
        Ok(())
    }

    /// Replace every component of a live entity with `components`.
    ///
    /// This is a full replace, not a merge: components missing from
    /// `components` are removed.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownEntity`] if `id` is not live.
    pub fn set_components(
        &mut self,
        id: &EntityId,
        components: Components,
    ) -> Result<(), ComponentError> {
        self.ensure_alive(id)?;
        self.store.remove_all(id);
        for (name, value) in components {
            self.store.insert(&name, id.clone(), value);
        }
        Ok(())
    }

    /// Remove one component. Missing components and unknown entities are a
    /// no-op, so removing twice is harmless.
    pub fn remove_component(&mut self, id: &EntityId, component: &str) {
        self.store.remove(component, id);
    }

    /// Remove every component of `id`, keeping the entity itself.
    pub fn remove_components(&mut self, id: &EntityId) {
        self.store.remove_all(id);
    }

    /// Value of one component, or `None` if the live entity lacks it.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownEntity`] if `id` is not live.
    pub fn get_component(
        &self,
        id: &EntityId,
        component: &str,
    ) -> Result<Option<&Value>, ComponentError> {
        self.ensure_alive(id)?;
        Ok(self.store.get(component, id))
    }

    /// Mutable access to one component value.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownEntity`] if `id` is not live.
    pub fn get_component_mut(
        &mut self,
        id: &EntityId,
        component: &str,
    ) -> Result<Option<&mut Value>, ComponentError> {
        self.ensure_alive(id)?;
        Ok(self.store.get_mut(component, id))
    }

    /// Snapshot of every component of a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownEntity`] if `id` is not live.
    pub fn get_components(&self, id: &EntityId) -> Result<Components, ComponentError> {
        self.ensure_alive(id)?;
        Ok(self.store.snapshot(id))
    }

    // -- Handles --

    /// Read-only handle to a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownEntity`] if `id` is not live.
    pub fn entity<'w>(&'w self, id: &EntityId) -> Result<EntityRef<'w>, ComponentError> {
        self.ensure_alive(id)?;
        Ok(EntityRef {
            id: id.clone(),
            world: self,
        })
    }

    /// Mutable handle to a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownEntity`] if `id` is not live.
    pub fn entity_mut<'w>(&'w mut self, id: &EntityId) -> Result<EntityMut<'w>, ComponentError> {
        self.ensure_alive(id)?;
        Ok(EntityMut {
            id: id.clone(),
            world: self,
        })
    }

    fn ensure_alive(&self, id: &EntityId) -> Result<(), ComponentError> {
        if self.entities.contains(id) {
            Ok(())
        } else {
            Err(ComponentError::UnknownEntity(id.clone()))
        }
    }
}

/// Read-only view of one entity's components.
#[derive(Debug, Clone)]
pub struct EntityRef<'w> {
    id: EntityId,
    world: &'w World,
}

impl<'w> EntityRef<'w> {
    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Returns `true` if the entity holds `component` with a truthy value.
    #[must_use]
    pub fn has(&self, component: &str) -> bool {
        self.world.store.get(component, &self.id).is_truthy()
    }

    #[must_use]
    pub fn get(&self, component: &str) -> Option<&'w Value> {
        self.world.store.get(component, &self.id)
    }

    /// Snapshot of every component.
    #[must_use]
    pub fn components(&self) -> Components {
        self.world.store.snapshot(&self.id)
    }
}

/// Read-write view of one entity's components.
#[derive(Debug)]
pub struct EntityMut<'w> {
    id: EntityId,
    world: &'w mut World,
}

impl EntityMut<'_> {
    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    #[must_use]
    pub fn has(&self, component: &str) -> bool {
        self.world.store.get(component, &self.id).is_truthy()
    }

    #[must_use]
    pub fn get(&self, component: &str) -> Option<&Value> {
        self.world.store.get(component, &self.id)
    }

    pub fn get_mut(&mut self, component: &str) -> Option<&mut Value> {
        self.world.store.get_mut(component, &self.id)
    }

    #[must_use]
    pub fn components(&self) -> Components {
        self.world.store.snapshot(&self.id)
    }

    pub fn set(&mut self, component: &str, value: impl Into<Value>) -> &mut Self {
        self.world.store.insert(component, self.id.clone(), value.into());
        self
    }

    pub fn remove(&mut self, component: &str) -> &mut Self {
        self.world.store.remove(component, &self.id);
        self
    }

    /// Replace all components (not a merge).
    pub fn set_components(&mut self, components: Components) -> &mut Self {
        self.world.store.remove_all(&self.id);
        for (name, value) in components {
            self.world.store.insert(&name, self.id.clone(), value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::component::components_from_json;

    fn comps(value: Value) -> Components {
        components_from_json(value).unwrap()
    }

    #[test]
    fn test_spawn_with_components() {
        let mut world = World::new();
        let id = world.spawn(None, comps(json!({"a": 1, "b": {"c": true}}))).unwrap();
        assert!(world.contains(&id));
        assert_eq!(
            world.get_components(&id).unwrap(),
            comps(json!({"a": 1, "b": {"c": true}}))
        );
    }

    #[test]
    fn test_spawn_with_explicit_id() {
        let mut world = World::new();
        let id = world.spawn(Some("hero".into()), Components::new()).unwrap();
        assert_eq!(id.as_str(), "hero");
        assert_eq!(
            world.spawn(Some("hero".into()), Components::new()),
            Err(ComponentError::EntityAlreadyExists("hero".into()))
        );
    }

    #[test]
    fn test_unknown_entity_errors() {
        let mut world = World::new();
        let ghost = EntityId::from("ghost");
        assert_eq!(
            world.set_component(&ghost, "x", json!(1)),
            Err(ComponentError::UnknownEntity(ghost.clone()))
        );
        assert!(world.get_component(&ghost, "x").is_err());
        assert!(world.get_components(&ghost).is_err());
        assert!(world.despawn(&ghost).is_err());
        assert!(world.entity(&ghost).is_err());
        // Nothing leaked into the store.
        assert!(!world.store().has_component("x"));
    }

    #[test]
    fn test_absent_component_is_none() {
        let mut world = World::new();
        let id = world.spawn(None, Components::new()).unwrap();
        assert_eq!(world.get_component(&id, "missing").unwrap(), None);
    }

    #[test]
    fn test_set_components_replaces() {
        let mut world = World::new();
        let id = world.spawn(None, comps(json!({"a": 1, "b": 2}))).unwrap();
        world.set_components(&id, comps(json!({"c": 3}))).unwrap();
        assert_eq!(world.get_components(&id).unwrap(), comps(json!({"c": 3})));
        assert!(!world.store().has_component("a"));
    }

    #[test]
    fn test_remove_component_twice() {
        let mut world = World::new();
        let id = world.spawn(None, comps(json!({"a": 1}))).unwrap();
        world.remove_component(&id, "a");
        world.remove_component(&id, "a");
        assert_eq!(world.get_component(&id, "a").unwrap(), None);
    }

    #[test]
    fn test_despawn_purges_store() {
        let mut world = World::new();
        let a = world.spawn(None, comps(json!({"x": 1, "y": 2}))).unwrap();
        let b = world.spawn(None, comps(json!({"x": 3}))).unwrap();
        world.despawn(&a).unwrap();
        assert!(!world.contains(&a));
        assert!(!world.store().references(&a));
        assert!(!world.store().has_component("y"));
        assert_eq!(world.entity_ids(), &[b]);
    }

    #[test]
    fn test_entity_handles() {
        let mut world = World::new();
        let id = world
            .spawn(None, comps(json!({"visible": false, "hp": 3})))
            .unwrap();

        {
            let entity = world.entity(&id).unwrap();
            assert!(!entity.has("visible"));
            assert!(entity.has("hp"));
            assert_eq!(entity.get("hp"), Some(&json!(3)));
        }

        world
            .entity_mut(&id)
            .unwrap()
            .set("visible", true)
            .remove("hp");

        let entity = world.entity(&id).unwrap();
        assert!(entity.has("visible"));
        assert_eq!(entity.components(), comps(json!({"visible": true})));
    }

    #[test]
    fn test_get_component_mut() {
        let mut world = World::new();
        let id = world.spawn(None, comps(json!({"pos": {"x": 1}}))).unwrap();
        if let Some(pos) = world.get_component_mut(&id, "pos").unwrap() {
            pos["x"] = json!(5);
        }
        assert_eq!(world.get_component(&id, "pos").unwrap(), Some(&json!({"x": 5})));
    }
}
