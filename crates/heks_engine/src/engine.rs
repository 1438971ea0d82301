//! The engine facade.
//!
//! [`Engine`] owns the world (entities + components), rooms and viewports,
//! event handlers and installed modules, and exposes the public API game code
//! and modules program against. Everything is single-threaded and
//! synchronous: a write is visible to the very next read, and handlers run
//! strictly one after another.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use heks_component::{
    ComponentFilter, Components, EntityId, EntityMut, EntityRef, World, filter_ids,
};
use heks_math::Size;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{EventHandlers, Lifecycle};
use crate::module::Module;
use crate::room::{Room, RoomId, Rooms, Viewport, ViewportId, ViewportOptions};

/// A component filter whose predicates see the engine.
pub type Filter = ComponentFilter<Engine>;

type ModuleInit = Box<dyn FnOnce(&mut Engine) -> Result<(), EngineError>>;

/// Builds an [`Engine`] with a list of modules installed in order.
pub struct EngineBuilder {
    config: EngineConfig,
    modules: Vec<ModuleInit>,
}

impl EngineBuilder {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            modules: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_module<M: Module>(mut self, module: M) -> Self {
        self.modules
            .push(Box::new(move |engine: &mut Engine| engine.register_module(module)));
        self
    }

    /// # Errors
    ///
    /// Returns the first module registration error.
    pub fn build(self) -> Result<Engine, EngineError> {
        let mut engine = Engine::new(self.config);
        for init in self.modules {
            init(&mut engine)?;
        }
        Ok(engine)
    }
}

/// The engine: world, rooms, events and modules.
pub struct Engine {
    config: EngineConfig,
    world: World,
    rooms: Rooms,
    handlers: EventHandlers,
    modules: HashMap<TypeId, Box<dyn Any>>,
    running: bool,
}

impl Engine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            world: World::new(),
            rooms: Rooms::new(),
            handlers: EventHandlers::new(),
            modules: HashMap::new(),
            running: false,
        }
    }

    #[must_use]
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Returns the configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the drawing surface size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.config.size
    }

    /// Returns the surface scale factor.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.config.scale
    }

    /// Returns the entity and component world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    // -- Running state --

    /// Mark the engine as running. Returns `false` if it already was.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    /// Ask the frame loop to stop after the frame in progress.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Returns whether the frame loop should keep going.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one tick: `beforeUpdate`, `update`, `afterUpdate`, `beforeDraw`,
    /// `draw`, `afterDraw`, each with `time` (milliseconds) as the only
    /// argument.
    ///
    /// # Errors
    ///
    /// The first failing handler aborts the rest of the tick.
    pub fn step(&mut self, time: f64) -> anyhow::Result<()> {
        let args = [Value::from(time)];
        for phase in Lifecycle::TICK {
            self.emit_event(phase.as_str(), &args)?;
        }
        Ok(())
    }

    // -- Modules --

    /// Install `module`, running its `init` hook first.
    ///
    /// # Errors
    ///
    /// [`EngineError::ModuleAlreadyRegistered`] if a module of the same type is
    /// installed, or whatever `init` returns.
    pub fn register_module<M: Module>(&mut self, mut module: M) -> Result<(), EngineError> {
        let key = TypeId::of::<M>();
        if self.modules.contains_key(&key) {
            return Err(EngineError::ModuleAlreadyRegistered(type_name::<M>()));
        }
        module.init(self)?;
        self.modules.insert(key, Box::new(module));
        debug!(module = type_name::<M>(), "registered module");
        Ok(())
    }

    /// Returns the installed module of type `M`, if any.
    #[must_use]
    pub fn module<M: Module>(&self) -> Option<&M> {
        self.modules.get(&TypeId::of::<M>())?.downcast_ref::<M>()
    }

    /// Mutable access to the installed module of type `M`.
    pub fn module_mut<M: Module>(&mut self) -> Option<&mut M> {
        self.modules.get_mut(&TypeId::of::<M>())?.downcast_mut::<M>()
    }

    // -- Rooms --

    /// Register a room. `size` defaults to the engine size.
    pub fn create_room(
        &mut self,
        id: Option<RoomId>,
        size: Option<Size>,
        set_as_current: bool,
    ) -> RoomId {
        let size = size.unwrap_or(self.config.size);
        self.rooms.create_room(id, size, set_as_current)
    }

    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRoom`] if `id` is not registered.
    pub fn set_current_room(&mut self, id: &RoomId) -> Result<(), EngineError> {
        self.rooms.set_current_room(id)
    }

    #[must_use]
    pub fn current_room(&self) -> Option<&Room> {
        self.rooms.current_room()
    }

    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRoom`] if `id` is not registered.
    pub fn get_room(&self, id: &RoomId) -> Result<&Room, EngineError> {
        self.rooms.room(id)
    }

    /// Upsert a named layer depth in `room` (default: the current room).
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownRoom`] or [`EngineError::NoCurrentRoom`].
    pub fn create_layer(
        &mut self,
        name: &str,
        depth: f32,
        room: Option<&RoomId>,
    ) -> Result<(), EngineError> {
        self.rooms.create_layer(name, depth, room)
    }

    /// # Errors
    ///
    /// [`EngineError::UnknownRoom`], or an unknown-entity error if `entity` is
    /// not live.
    pub fn add_entity_to_room(
        &mut self,
        room: &RoomId,
        entity: &EntityId,
    ) -> Result<(), EngineError> {
        self.world.entity(entity)?;
        self.rooms.add_entity_to_room(room, entity.clone())
    }

    /// Attach `viewport` to `room`. A viewport belongs to at most one room.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownRoom`], [`EngineError::UnknownViewport`] or
    /// [`EngineError::ViewportInOtherRoom`].
    pub fn add_viewport_to_room(
        &mut self,
        room: &RoomId,
        viewport: &ViewportId,
    ) -> Result<(), EngineError> {
        self.rooms.viewport(viewport)?;
        self.rooms.add_viewport_to_room(room, viewport.clone())
    }

    // -- Viewports --

    /// Register a viewport in `room` (default: the current room).
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownRoom`], [`EngineError::NoCurrentRoom`] or
    /// [`EngineError::ViewportAlreadyExists`].
    pub fn create_viewport(
        &mut self,
        options: ViewportOptions,
        room: Option<&RoomId>,
    ) -> Result<ViewportId, EngineError> {
        self.rooms.create_viewport(options, room)
    }

    /// # Errors
    ///
    /// Returns [`EngineError::UnknownViewport`] if `id` is not registered.
    pub fn get_viewport(&self, id: &ViewportId) -> Result<&Viewport, EngineError> {
        self.rooms.viewport(id)
    }

    /// # Errors
    ///
    /// Returns [`EngineError::UnknownViewport`] if `id` is not registered.
    pub fn get_viewport_mut(&mut self, id: &ViewportId) -> Result<&mut Viewport, EngineError> {
        self.rooms.viewport_mut(id)
    }

    /// # Errors
    ///
    /// Returns [`EngineError::NoCurrentRoom`] without a current room.
    pub fn get_viewports_in_current_room(&self) -> Result<Vec<&Viewport>, EngineError> {
        self.rooms.viewports_in_current_room()
    }

    /// Make `viewport` track `entity`. Only the id is stored.
    ///
    /// # Errors
    ///
    /// Unknown entity or [`EngineError::UnknownViewport`].
    pub fn set_entity_to_follow_for_viewport(
        &mut self,
        entity: &EntityId,
        viewport: &ViewportId,
    ) -> Result<(), EngineError> {
        self.world.entity(entity)?;
        self.rooms.viewport_mut(viewport)?.entity_to_follow = Some(entity.clone());
        Ok(())
    }

    // -- Entities --

    /// Create an entity with a fresh id, add `components`, and place it in
    /// `room` (default: the current room; no room at all if none is current).
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownRoom`] for an unregistered explicit room. Nothing
    /// is created on error.
    pub fn create_entity(
        &mut self,
        components: Components,
        room: Option<&RoomId>,
    ) -> Result<EntityId, EngineError> {
        self.spawn_into_room(None, components, room)
    }

    /// Like [`Engine::create_entity`] with a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Additionally fails if `id` is already live.
    pub fn create_entity_with_id(
        &mut self,
        id: impl Into<EntityId>,
        components: Components,
        room: Option<&RoomId>,
    ) -> Result<EntityId, EngineError> {
        self.spawn_into_room(Some(id.into()), components, room)
    }

    fn spawn_into_room(
        &mut self,
        id: Option<EntityId>,
        components: Components,
        room: Option<&RoomId>,
    ) -> Result<EntityId, EngineError> {
        let room = match room {
            Some(room) => Some(self.rooms.room(room)?.id.clone()),
            None => self.rooms.current_room_id().cloned(),
        };
        let id = self.world.spawn(id, components)?;
        match room {
            Some(room) => self.rooms.add_entity_to_room(&room, id.clone())?,
            None => warn!(entity = %id, "created entity outside of any room"),
        }
        Ok(id)
    }

    /// Remove an entity from every room and purge all of its components.
    ///
    /// Viewports following it keep the dangling id and stop moving.
    ///
    /// # Errors
    ///
    /// Fails if `id` is not live.
    pub fn remove_entity(&mut self, id: &EntityId) -> Result<(), EngineError> {
        self.world.despawn(id)?;
        self.rooms.remove_entity_everywhere(id);
        for viewport in self.rooms.viewports_following(id) {
            warn!(viewport = %viewport, entity = %id, "removed entity is still followed");
        }
        Ok(())
    }

    /// Returns whether `id` is a live entity.
    #[must_use]
    pub fn has_entity(&self, id: &EntityId) -> bool {
        self.world.contains(id)
    }

    /// # Errors
    ///
    /// Fails if `id` is not live.
    pub fn get_entity(&self, id: &EntityId) -> Result<EntityRef<'_>, EngineError> {
        Ok(self.world.entity(id)?)
    }

    /// # Errors
    ///
    /// Fails if `id` is not live.
    pub fn get_entity_mut(&mut self, id: &EntityId) -> Result<EntityMut<'_>, EngineError> {
        Ok(self.world.entity_mut(id)?)
    }

    /// Entities of the current room matching `filter`; empty without a
    /// current room.
    #[must_use]
    pub fn get_entities(&self, filter: &Filter) -> Vec<EntityId> {
        match self.rooms.current_room() {
            Some(room) => self.filter_entities(&room.entities, filter),
            None => Vec::new(),
        }
    }

    /// Entities of `room` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRoom`] if `room` is not registered.
    pub fn get_entities_in_room(
        &self,
        filter: &Filter,
        room: &RoomId,
    ) -> Result<Vec<EntityId>, EngineError> {
        let room = self.rooms.room(room)?;
        Ok(self.filter_entities(&room.entities, filter))
    }

    /// All live entities matching `filter`, regardless of room, in creation
    /// order.
    #[must_use]
    pub fn get_entities_everywhere(&self, filter: &Filter) -> Vec<EntityId> {
        self.filter_entities(self.world.entity_ids(), filter)
    }

    /// Narrow `candidates` with `filter`, preserving order.
    #[must_use]
    pub fn filter_entities(&self, candidates: &[EntityId], filter: &Filter) -> Vec<EntityId> {
        filter_ids(self.world.store(), self, candidates, filter)
    }

    // -- Components --

    /// # Errors
    ///
    /// Fails if `entity` is not live.
    pub fn set_component_for_entity(
        &mut self,
        entity: &EntityId,
        component: &str,
        value: impl Into<Value>,
    ) -> Result<(), EngineError> {
        Ok(self.world.set_component(entity, component, value.into())?)
    }

    /// Replace all components of `entity` (not a merge).
    ///
    /// # Errors
    ///
    /// Fails if `entity` is not live.
    pub fn set_components_for_entity(
        &mut self,
        entity: &EntityId,
        components: Components,
    ) -> Result<(), EngineError> {
        Ok(self.world.set_components(entity, components)?)
    }

    /// No-op if the component (or the entity) is missing.
    pub fn remove_component_from_entity(&mut self, entity: &EntityId, component: &str) {
        self.world.remove_component(entity, component);
    }

    pub fn remove_components_from_entity(&mut self, entity: &EntityId) {
        self.world.remove_components(entity);
    }

    /// `Ok(None)` when the live entity lacks the component.
    ///
    /// # Errors
    ///
    /// Fails if `entity` is not live.
    pub fn get_value_of_component_for_entity(
        &self,
        entity: &EntityId,
        component: &str,
    ) -> Result<Option<&Value>, EngineError> {
        Ok(self.world.get_component(entity, component)?)
    }

    /// # Errors
    ///
    /// Fails if `entity` is not live.
    pub fn get_components_for_entity(&self, entity: &EntityId) -> Result<Components, EngineError> {
        Ok(self.world.get_components(entity)?)
    }

    /// Deserialize a component into `T`.
    ///
    /// Returns `None` if the entity is not live, lacks the component, or the
    /// value does not have the shape of `T`.
    #[must_use]
    pub fn component_as<T: DeserializeOwned>(
        &self,
        entity: &EntityId,
        component: &str,
    ) -> Option<T> {
        let value = self.world.store().get(component, entity)?;
        T::deserialize(value).ok()
    }

    // -- Events --

    /// Append `handler` to the handlers of `event`.
    pub fn add_event_handler<F>(&mut self, event: impl Into<String>, handler: F)
    where
        F: Fn(&mut Engine, &[Value]) -> anyhow::Result<()> + 'static,
    {
        self.handlers.add(event, Rc::new(handler));
    }

    /// Register a handler invoked once per entity of the current room that
    /// matches `filter` at emission time.
    pub fn add_event_handler_for_entities<F>(
        &mut self,
        event: impl Into<String>,
        handler: F,
        filter: Filter,
    ) where
        F: Fn(&mut Engine, &EntityId, &[Value]) -> anyhow::Result<()> + 'static,
    {
        self.add_event_handler(event, move |engine, args| {
            for entity in engine.get_entities(&filter) {
                handler(engine, &entity, args)?;
            }
            Ok(())
        });
    }

    /// Register a handler invoked once with every entity of the current room
    /// that matches `filter` at emission time.
    pub fn add_event_handler_for_entity_group<F>(
        &mut self,
        event: impl Into<String>,
        handler: F,
        filter: Filter,
    ) where
        F: Fn(&mut Engine, &[EntityId], &[Value]) -> anyhow::Result<()> + 'static,
    {
        self.add_event_handler(event, move |engine, args| {
            let entities = engine.get_entities(&filter);
            handler(engine, &entities, args)
        });
    }

    /// Invoke every handler of `event` in registration order.
    ///
    /// # Errors
    ///
    /// The first handler error is returned immediately; later handlers do not
    /// run.
    pub fn emit_event(&mut self, event: &str, args: &[Value]) -> anyhow::Result<()> {
        let Some(handlers) = self.handlers.snapshot(event) else {
            return Ok(());
        };
        trace!(event, handlers = handlers.len(), "emitting event");
        for handler in handlers {
            handler(self, args)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("world", &self.world)
            .field("rooms", &self.rooms)
            .field("handlers", &self.handlers)
            .field("modules", &self.modules.len())
            .field("running", &self.running)
            .finish()
    }
}
