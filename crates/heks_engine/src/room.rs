//! Rooms, layers and viewports.
//!
//! A [`Room`] partitions the entity universe: it lists its member entities in
//! insertion order, the viewports that render it, and a table of named layer
//! depths. At most one room is *current*; unscoped queries run against its
//! membership list.
//!
//! Viewports live in a flat map keyed by id and are attached to a room through
//! the room's viewport list. A viewport may follow an entity, but only by id:
//! the entity can disappear without the viewport noticing.

use std::collections::HashMap;
use std::fmt;

use heks_component::EntityId;
use heks_math::{Size, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::EngineError;

/// Name of the layer every room starts with.
pub const DEFAULT_LAYER: &str = "default";

/// Identifier of a [`Room`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a [`Viewport`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewportId(String);

impl ViewportId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewportId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A partition of the entity universe.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub size: Size,
    /// Member entities, in insertion order.
    pub entities: Vec<EntityId>,
    /// Viewports rendering this room, in creation order.
    pub viewports: Vec<ViewportId>,
    /// Layer name → depth. Higher depths are drawn first (further back).
    pub layers: HashMap<String, f32>,
}

impl Room {
    fn new(id: RoomId, size: Size) -> Self {
        Self {
            id,
            size,
            entities: Vec::new(),
            viewports: Vec::new(),
            layers: HashMap::from([(DEFAULT_LAYER.to_string(), 0.0)]),
        }
    }

    /// Depth of `layer`, or `None` if the room has no such layer.
    #[must_use]
    pub fn layer_depth(&self, layer: &str) -> Option<f32> {
        self.layers.get(layer).copied()
    }

    #[must_use]
    pub fn contains(&self, entity: &EntityId) -> bool {
        self.entities.contains(entity)
    }
}

/// A camera rectangle within a room.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub id: ViewportId,
    /// Camera offset in room space.
    pub position: Vec2,
    /// Top-left corner on the drawing surface.
    pub origin: Vec2,
    pub size: Size,
    /// Weak reference to the entity the camera tracks.
    pub entity_to_follow: Option<EntityId>,
}

impl Viewport {
    /// Camera position that centres `target` (the followed entity's bounds,
    /// as `(top_left, size)`) while never showing space outside
    /// `[0, room_size - viewport_size]` on either axis.
    ///
    /// When the room is smaller than the viewport the upper bound wins, so the
    /// result may be negative.
    #[must_use]
    pub fn centered_on(&self, target_position: Vec2, target_size: Size, room_size: Size) -> Vec2 {
        let offset = target_position - self.size.to_vec2() / 2.0 + target_size.to_vec2() / 2.0;
        let upper = room_size.to_vec2() - self.size.to_vec2();
        offset.max(Vec2::ZERO).min(upper)
    }
}

/// Partial viewport description; unset fields fall back to defaults.
///
/// Defaults: fresh id, position and origin `(0, 0)`, the room's size, and no
/// entity to follow.
#[derive(Debug, Clone, Default)]
pub struct ViewportOptions {
    pub id: Option<ViewportId>,
    pub position: Option<Vec2>,
    pub origin: Option<Vec2>,
    pub size: Option<Size>,
    pub entity_to_follow: Option<EntityId>,
}

impl ViewportOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<ViewportId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = Some(origin);
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn following(mut self, entity: EntityId) -> Self {
        self.entity_to_follow = Some(entity);
        self
    }

    fn build(self, room_size: Size) -> Viewport {
        Viewport {
            id: self.id.unwrap_or_else(ViewportId::generate),
            position: self.position.unwrap_or(Vec2::ZERO),
            origin: self.origin.unwrap_or(Vec2::ZERO),
            size: self.size.unwrap_or(room_size),
            entity_to_follow: self.entity_to_follow,
        }
    }
}

/// All rooms and viewports, plus the current-room pointer.
#[derive(Debug, Default)]
pub struct Rooms {
    rooms: HashMap<RoomId, Room>,
    viewports: HashMap<ViewportId, Viewport>,
    current: Option<RoomId>,
}

impl Rooms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a room with no entities, no viewports and a single `default`
    /// layer at depth 0. Re-using an id replaces the old room.
    pub fn create_room(&mut self, id: Option<RoomId>, size: Size, set_as_current: bool) -> RoomId {
        let id = id.unwrap_or_else(RoomId::generate);
        if self.rooms.contains_key(&id) {
            warn!(room = %id, "replacing existing room");
        }
        self.rooms.insert(id.clone(), Room::new(id.clone(), size));
        debug!(room = %id, width = size.width, height = size.height, "created room");
        if set_as_current {
            self.current = Some(id.clone());
        }
        id
    }

    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRoom`] if `id` is not registered.
    pub fn set_current_room(&mut self, id: &RoomId) -> Result<(), EngineError> {
        if !self.rooms.contains_key(id) {
            return Err(EngineError::UnknownRoom(id.clone()));
        }
        self.current = Some(id.clone());
        Ok(())
    }

    #[must_use]
    pub fn current_room_id(&self) -> Option<&RoomId> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn current_room(&self) -> Option<&Room> {
        self.current.as_ref().and_then(|id| self.rooms.get(id))
    }

    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRoom`] if `id` is not registered.
    pub fn room(&self, id: &RoomId) -> Result<&Room, EngineError> {
        self.rooms
            .get(id)
            .ok_or_else(|| EngineError::UnknownRoom(id.clone()))
    }

    fn room_mut(&mut self, id: &RoomId) -> Result<&mut Room, EngineError> {
        self.rooms
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownRoom(id.clone()))
    }

    /// Resolve an optional room scope: the given room, else the current one.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownRoom`] for an unregistered id,
    /// [`EngineError::NoCurrentRoom`] when unscoped with no current room.
    pub fn resolve(&self, scope: Option<&RoomId>) -> Result<&RoomId, EngineError> {
        let id = match scope {
            Some(id) => id,
            None => self.current.as_ref().ok_or(EngineError::NoCurrentRoom)?,
        };
        Ok(&self.room(id)?.id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Upsert a named layer depth.
    ///
    /// # Errors
    ///
    /// See [`Rooms::resolve`].
    pub fn create_layer(
        &mut self,
        name: &str,
        depth: f32,
        scope: Option<&RoomId>,
    ) -> Result<(), EngineError> {
        let id = self.resolve(scope)?.clone();
        self.room_mut(&id)?.layers.insert(name.to_string(), depth);
        Ok(())
    }

    /// Append `entity` to the room's membership list; a member is not added
    /// twice.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRoom`] if `room` is not registered.
    pub fn add_entity_to_room(
        &mut self,
        room: &RoomId,
        entity: EntityId,
    ) -> Result<(), EngineError> {
        let room = self.room_mut(room)?;
        if !room.entities.contains(&entity) {
            room.entities.push(entity);
        }
        Ok(())
    }

    /// Ids of the viewports set to follow `entity`.
    pub fn viewports_following<'a>(
        &'a self,
        entity: &'a EntityId,
    ) -> impl Iterator<Item = &'a ViewportId> + 'a {
        self.viewports
            .values()
            .filter(move |viewport| viewport.entity_to_follow.as_ref() == Some(entity))
            .map(|viewport| &viewport.id)
    }

    /// Drop `entity` from every room's membership list.
    pub fn remove_entity_everywhere(&mut self, entity: &EntityId) {
        for room in self.rooms.values_mut() {
            room.entities.retain(|e| e != entity);
        }
    }

    /// The room whose viewport list holds `viewport`, if any.
    #[must_use]
    pub fn room_of_viewport(&self, viewport: &ViewportId) -> Option<&RoomId> {
        self.rooms
            .values()
            .find(|room| room.viewports.contains(viewport))
            .map(|room| &room.id)
    }

    /// Attach `viewport` to `room`. Attaching it to the room it already
    /// belongs to does nothing.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownRoom`] if `room` is not registered,
    /// [`EngineError::ViewportInOtherRoom`] if another room owns `viewport`.
    pub fn add_viewport_to_room(
        &mut self,
        room: &RoomId,
        viewport: ViewportId,
    ) -> Result<(), EngineError> {
        self.room(room)?;
        match self.room_of_viewport(&viewport) {
            Some(owner) if owner == room => return Ok(()),
            Some(owner) => {
                return Err(EngineError::ViewportInOtherRoom {
                    viewport,
                    room: owner.clone(),
                });
            }
            None => {}
        }
        self.room_mut(room)?.viewports.push(viewport);
        Ok(())
    }

    /// Register a viewport and attach it to a room.
    ///
    /// # Errors
    ///
    /// See [`Rooms::resolve`]; [`EngineError::ViewportAlreadyExists`] if the
    /// id is taken. Nothing is registered on error.
    pub fn create_viewport(
        &mut self,
        options: ViewportOptions,
        scope: Option<&RoomId>,
    ) -> Result<ViewportId, EngineError> {
        let room_id = self.resolve(scope)?.clone();
        let room_size = self.room(&room_id)?.size;
        let viewport = options.build(room_size);
        let id = viewport.id.clone();
        if self.viewports.contains_key(&id) {
            return Err(EngineError::ViewportAlreadyExists(id));
        }
        self.viewports.insert(id.clone(), viewport);
        self.add_viewport_to_room(&room_id, id.clone())?;
        debug!(viewport = %id, room = %room_id, "created viewport");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`EngineError::UnknownViewport`] if `id` is not registered.
    pub fn viewport(&self, id: &ViewportId) -> Result<&Viewport, EngineError> {
        self.viewports
            .get(id)
            .ok_or_else(|| EngineError::UnknownViewport(id.clone()))
    }

    /// # Errors
    ///
    /// Returns [`EngineError::UnknownViewport`] if `id` is not registered.
    pub fn viewport_mut(&mut self, id: &ViewportId) -> Result<&mut Viewport, EngineError> {
        self.viewports
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownViewport(id.clone()))
    }

    /// Viewports of the current room, in creation order.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoCurrentRoom`] without a current room, or
    /// [`EngineError::UnknownViewport`] if the room lists a missing viewport.
    pub fn viewports_in_current_room(&self) -> Result<Vec<&Viewport>, EngineError> {
        let room = self.current_room().ok_or(EngineError::NoCurrentRoom)?;
        room.viewports.iter().map(|id| self.viewport(id)).collect()
    }
}
