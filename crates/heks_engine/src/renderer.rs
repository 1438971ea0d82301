//! Viewport-based sprite renderer.
//!
//! The renderer draws through a [`DrawSurface`], so any backend (a window, an
//! image buffer, a recording surface in tests) can sit behind it. It hooks
//! into two tick phases:
//!
//! - `beforeDraw`: move following viewports onto their targets and advance
//!   sprite animations;
//! - `draw`: for every viewport of the current room, clear its rectangle and
//!   draw the visible sprites back to front.

use std::cmp::Ordering;

use anyhow::Context;
use heks_component::EntityId;
use heks_math::{Bounds, Position, Size, Vec2};
use serde_json::Value;
use tracing::{trace, warn};

use crate::engine::{Engine, Filter};
use crate::error::EngineError;
use crate::events::Lifecycle;
use crate::module::Module;
use crate::room::{DEFAULT_LAYER, Room, Viewport};
use crate::sprite::{ImageCache, SPRITE_COMPONENT, SpriteComponent, SpriteManager};

/// Component holding an entity's `{x, y}` position.
pub const POSITION_COMPONENT: &str = "position";
/// Component naming the room layer an entity is drawn on.
pub const LAYER_COMPONENT: &str = "layer";
/// Component ordering entities within a layer (higher is further back).
pub const DEPTH_COMPONENT: &str = "depth";

/// Fill used behind every viewport.
pub const BACKGROUND: &str = "black";

/// A 2D drawing backend.
pub trait DrawSurface {
    type Image: 'static;

    /// # Errors
    ///
    /// Returns an error if the image can't be read or decoded.
    fn load_image(&mut self, path: &str) -> anyhow::Result<Self::Image>;

    /// Copy `source` from `image` into `destination` on the surface.
    ///
    /// # Errors
    ///
    /// Backend-specific drawing failures.
    fn draw_image(
        &mut self,
        image: &Self::Image,
        source: Bounds,
        destination: Bounds,
    ) -> anyhow::Result<()>;

    fn clear_rect(&mut self, rect: Bounds);

    fn fill_rect(&mut self, rect: Bounds, color: &str);
}

#[derive(Debug, Clone, PartialEq)]
enum DrawCommand {
    Clear(Bounds),
    Fill(Bounds),
    Image {
        file: String,
        source: Bounds,
        destination: Bounds,
    },
}

/// The renderer module. Installs a [`SpriteManager`] if none is registered.
pub struct Renderer<S: DrawSurface> {
    surface: S,
    images: ImageCache<S::Image>,
}

impl<S: DrawSurface> Renderer<S> {
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            images: ImageCache::new(),
        }
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn execute(&mut self, commands: Vec<DrawCommand>) -> anyhow::Result<()> {
        for command in commands {
            match command {
                DrawCommand::Clear(rect) => self.surface.clear_rect(rect),
                DrawCommand::Fill(rect) => self.surface.fill_rect(rect, BACKGROUND),
                DrawCommand::Image {
                    file,
                    source,
                    destination,
                } => {
                    let surface = &mut self.surface;
                    let image = self
                        .images
                        .get_or_load(&file, true, |path| surface.load_image(path))
                        .with_context(|| format!("failed to load image {file}"))?;
                    surface.draw_image(image, source, destination)?;
                }
            }
        }
        Ok(())
    }
}

impl<S: DrawSurface + 'static> Module for Renderer<S> {
    fn init(&mut self, engine: &mut Engine) -> Result<(), EngineError> {
        if engine.module::<SpriteManager>().is_none() {
            engine.register_module(SpriteManager::new())?;
        }
        engine.add_event_handler(Lifecycle::BeforeDraw.as_str(), |engine, _| {
            update_viewport_positions(engine);
            Ok(())
        });
        engine.add_event_handler_for_entities(
            Lifecycle::BeforeDraw.as_str(),
            update_sprite_frame,
            Filter::new().with(SPRITE_COMPONENT),
        );
        engine.add_event_handler_for_entity_group(
            Lifecycle::Draw.as_str(),
            draw_entity_sprites::<S>,
            Filter::new().with(SPRITE_COMPONENT).with(POSITION_COMPONENT),
        );
        Ok(())
    }
}

/// Frame index of an animation `elapsed` milliseconds after it started.
///
/// Looping animations wrap around; others stop on the last frame.
#[must_use]
pub fn calculate_frame_index(
    frame_count: usize,
    frames_per_second: f64,
    animation_start: f64,
    current_time: f64,
    is_looping: bool,
) -> usize {
    if frame_count == 0 || frames_per_second <= 0.0 {
        return 0;
    }
    let elapsed = (current_time - animation_start).max(0.0);
    let steps = (elapsed / (1000.0 / frames_per_second)).round() as usize;
    if is_looping {
        steps % frame_count
    } else {
        steps.min(frame_count - 1)
    }
}

fn sprite_of(engine: &Engine, entity: &EntityId) -> Option<SpriteComponent> {
    engine.component_as(entity, SPRITE_COMPONENT)
}

/// Visual bounds of an entity: its position plus the size of its current
/// sprite frame, or a zero-size point when it has no (resolvable) sprite.
///
/// Returns `None` if the entity has no position.
#[must_use]
pub fn calculate_entity_bounds(engine: &Engine, entity: &EntityId) -> Option<Bounds> {
    let position: Position = engine.component_as(entity, POSITION_COMPONENT)?;
    let size = sprite_of(engine, entity)
        .and_then(|component| {
            let sprites = engine.module::<SpriteManager>()?;
            let sprite = sprites.get_sprite(&component.id).ok()?;
            sprite.frames.get(component.frame).map(|frame| frame.size)
        })
        .unwrap_or(Size::ZERO);
    Some(Bounds::new(position, size))
}

/// Camera position centring `viewport` on `entity` inside `room`.
///
/// Returns the current position unchanged when the entity is gone or has no
/// position.
#[must_use]
pub fn calculate_viewport_position_centered_on_entity(
    engine: &Engine,
    viewport: &Viewport,
    room: &Room,
    entity: &EntityId,
) -> Vec2 {
    if !engine.has_entity(entity) {
        return viewport.position;
    }
    match calculate_entity_bounds(engine, entity) {
        Some(bounds) => viewport.centered_on(bounds.position().into(), bounds.size(), room.size),
        None => viewport.position,
    }
}

/// Re-centre every following viewport of the current room.
pub fn update_viewport_positions(engine: &mut Engine) {
    let Some(room) = engine.current_room() else {
        return;
    };
    let mut updates = Vec::new();
    for id in &room.viewports {
        let Ok(viewport) = engine.get_viewport(id) else {
            continue;
        };
        let Some(target) = &viewport.entity_to_follow else {
            continue;
        };
        if !engine.has_entity(target) {
            trace!(viewport = %id, entity = %target, "followed entity is gone");
            continue;
        }
        let position =
            calculate_viewport_position_centered_on_entity(engine, viewport, room, target);
        updates.push((id.clone(), position));
    }
    for (id, position) in updates {
        if let Ok(viewport) = engine.get_viewport_mut(&id) {
            viewport.position = position;
        }
    }
}

/// Advance the animation of one entity's sprite to `time` (first argument).
///
/// # Errors
///
/// [`EngineError::UnknownSprite`] if the component names an unregistered
/// sprite, or a component error if the entity vanished.
pub fn update_sprite_frame(
    engine: &mut Engine,
    entity: &EntityId,
    args: &[Value],
) -> anyhow::Result<()> {
    let time = args.first().and_then(Value::as_f64).unwrap_or_default();
    let Some(mut component) = sprite_of(engine, entity) else {
        return Ok(());
    };

    if !component.is_animating {
        if component.animation_start.take().is_some() {
            engine.set_component_for_entity(entity, SPRITE_COMPONENT, component.to_value()?)?;
        }
        return Ok(());
    }

    let frame_count = match engine.module::<SpriteManager>() {
        Some(sprites) => sprites.get_sprite(&component.id)?.frames.len(),
        None => return Ok(()),
    };
    if frame_count <= 1 || component.frames_per_second == 0.0 {
        return Ok(());
    }

    let start = *component.animation_start.get_or_insert(time);
    component.frame = calculate_frame_index(
        frame_count,
        component.frames_per_second,
        start,
        time,
        component.is_looping,
    );
    engine.set_component_for_entity(entity, SPRITE_COMPONENT, component.to_value()?)?;
    Ok(())
}

/// Whether an entity's bounds overlap the viewport's camera rectangle.
#[must_use]
pub fn is_entity_visible_in_viewport(
    engine: &Engine,
    entity: &EntityId,
    viewport: &Viewport,
) -> bool {
    let camera = Bounds::new(viewport.position.into(), viewport.size);
    calculate_entity_bounds(engine, entity).is_some_and(|bounds| bounds.overlaps(&camera))
}

/// Whether `position` lies within the entity's bounds (edges included).
#[must_use]
pub fn is_entity_at_position(engine: &Engine, entity: &EntityId, position: Vec2) -> bool {
    calculate_entity_bounds(engine, entity).is_some_and(|bounds| bounds.contains(position.into()))
}

fn layer_depth(engine: &Engine, room: &Room, entity: &EntityId) -> f32 {
    let layer = engine
        .get_value_of_component_for_entity(entity, LAYER_COMPONENT)
        .ok()
        .flatten()
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_LAYER);
    room.layer_depth(layer)
        .or_else(|| room.layer_depth(DEFAULT_LAYER))
        .unwrap_or(0.0)
}

fn entity_depth(engine: &Engine, entity: &EntityId) -> f64 {
    engine
        .get_value_of_component_for_entity(entity, DEPTH_COMPONENT)
        .ok()
        .flatten()
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

/// Order entities back to front: higher layer depth first, then higher entity
/// depth. The sort is stable, so ties keep their input order.
#[must_use]
pub fn sort_by_depth(engine: &Engine, room: &Room, mut entities: Vec<EntityId>) -> Vec<EntityId> {
    entities.sort_by(|a, b| {
        let by_layer = layer_depth(engine, room, b).total_cmp(&layer_depth(engine, room, a));
        if by_layer != Ordering::Equal {
            return by_layer;
        }
        entity_depth(engine, b).total_cmp(&entity_depth(engine, a))
    });
    entities
}

/// Entities of the current room whose bounds contain `position`, front-most
/// first.
#[must_use]
pub fn find_entities_at_position(engine: &Engine, position: Vec2) -> Vec<EntityId> {
    let Some(room) = engine.current_room() else {
        return Vec::new();
    };
    let candidates: Vec<EntityId> = engine
        .get_entities(&Filter::new().with(POSITION_COMPONENT))
        .into_iter()
        .filter(|entity| is_entity_at_position(engine, entity, position))
        .collect();
    let mut sorted = sort_by_depth(engine, room, candidates);
    sorted.reverse();
    sorted
}

fn plan_draw(engine: &Engine, entities: &[EntityId]) -> anyhow::Result<Vec<DrawCommand>> {
    let Some(room) = engine.current_room() else {
        return Ok(Vec::new());
    };
    let Some(sprites) = engine.module::<SpriteManager>() else {
        return Ok(Vec::new());
    };

    let mut commands = Vec::new();
    for viewport in engine.get_viewports_in_current_room()? {
        let screen = Bounds::new(viewport.origin.into(), viewport.size);
        commands.push(DrawCommand::Clear(screen));
        commands.push(DrawCommand::Fill(screen));

        let camera = viewport.clone();
        let visible = engine.filter_entities(
            entities,
            &Filter::new().matching(POSITION_COMPONENT, move |_, entity, engine: &Engine| {
                is_entity_visible_in_viewport(engine, entity, &camera)
            }),
        );

        for entity in sort_by_depth(engine, room, visible) {
            let (Some(component), Some(position)) = (
                sprite_of(engine, &entity),
                engine.component_as::<Position>(&entity, POSITION_COMPONENT),
            ) else {
                continue;
            };
            let sprite = sprites.get_sprite(&component.id)?;
            let Some(frame) = sprite.frames.get(component.frame) else {
                warn!(
                    entity = %entity,
                    sprite = %sprite.id,
                    frame = component.frame,
                    "sprite frame out of range"
                );
                continue;
            };
            let camera = viewport.position - viewport.origin;
            let at = Vec2::from(position) + sprite.origin.to_vec2() - camera;
            commands.push(DrawCommand::Image {
                file: sprite.file.clone(),
                source: Bounds::new(Position::new(frame.offset.left, frame.offset.top), frame.size),
                destination: Bounds::new(at.into(), frame.size),
            });
        }
    }
    Ok(commands)
}

fn draw_entity_sprites<S: DrawSurface + 'static>(
    engine: &mut Engine,
    entities: &[EntityId],
    _args: &[Value],
) -> anyhow::Result<()> {
    let commands = plan_draw(engine, entities)?;
    trace!(commands = commands.len(), "drawing frame");
    match engine.module_mut::<Renderer<S>>() {
        Some(renderer) => renderer.execute(commands),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use heks_component::components_from_json;
    use serde_json::json;

    use super::*;
    use crate::config::EngineConfig;
    use crate::room::{RoomId, ViewportOptions};
    use crate::sprite::SpriteFrame;
    use heks_math::Offset;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(String),
        Draw(String, Bounds, Bounds),
        Clear(Bounds),
        Fill(Bounds, String),
    }

    #[derive(Debug, Default)]
    struct RecordingSurface {
        calls: Vec<Call>,
    }

    impl DrawSurface for RecordingSurface {
        type Image = String;

        fn load_image(&mut self, path: &str) -> anyhow::Result<String> {
            self.calls.push(Call::Load(path.to_string()));
            Ok(path.to_string())
        }

        fn draw_image(
            &mut self,
            image: &String,
            source: Bounds,
            destination: Bounds,
        ) -> anyhow::Result<()> {
            self.calls.push(Call::Draw(image.clone(), source, destination));
            Ok(())
        }

        fn clear_rect(&mut self, rect: Bounds) {
            self.calls.push(Call::Clear(rect));
        }

        fn fill_rect(&mut self, rect: Bounds, color: &str) {
            self.calls.push(Call::Fill(rect, color.to_string()));
        }
    }

    fn components(value: Value) -> heks_component::Components {
        components_from_json(value).unwrap()
    }

    fn make_engine() -> (Engine, RoomId) {
        let config = EngineConfig::default().with_size(Size::new(40.0, 40.0));
        let mut engine = Engine::builder(config)
            .with_module(Renderer::new(RecordingSurface::default()))
            .build()
            .unwrap();
        let room = engine.create_room(Some("room".into()), Some(Size::new(100.0, 100.0)), true);
        let sprites = engine.module_mut::<SpriteManager>().unwrap();
        let frame = |left: f32| SpriteFrame {
            size: Size::new(10.0, 10.0),
            offset: Offset::new(0.0, left),
        };
        sprites.create_sprite("box", "box.png", vec![frame(0.0)], None);
        sprites.create_sprite(
            "spin",
            "spin.png",
            vec![frame(0.0), frame(10.0), frame(20.0), frame(30.0)],
            Some(Offset::new(-2.0, -1.0)),
        );
        (engine, room)
    }

    fn sprite(engine: &Engine, id: &str, fps: f64, animating: bool, looping: bool) -> Value {
        engine
            .module::<SpriteManager>()
            .unwrap()
            .component_for_sprite(id, fps, animating, looping, 0)
            .unwrap()
            .to_value()
            .unwrap()
    }

    fn calls(engine: &Engine) -> &[Call] {
        &engine
            .module::<Renderer<RecordingSurface>>()
            .unwrap()
            .surface()
            .calls
    }

    #[test]
    fn test_frame_index() {
        assert_eq!(calculate_frame_index(4, 10.0, 0.0, 0.0, true), 0);
        assert_eq!(calculate_frame_index(4, 10.0, 0.0, 100.0, true), 1);
        assert_eq!(calculate_frame_index(4, 10.0, 0.0, 520.0, true), 1);
        assert_eq!(calculate_frame_index(4, 10.0, 0.0, 200.0, false), 2);
        assert_eq!(calculate_frame_index(4, 10.0, 0.0, 5000.0, false), 3);
        assert_eq!(calculate_frame_index(4, 0.0, 0.0, 5000.0, true), 0);
    }

    #[test]
    fn test_viewport_clamps_to_room() {
        let (mut engine, _) = make_engine();
        let e = engine
            .create_entity(components(json!({"position": {"x": 95, "y": 95}})), None)
            .unwrap();
        let v = engine
            .create_viewport(
                ViewportOptions::new()
                    .with_size(Size::new(40.0, 40.0))
                    .following(e),
                None,
            )
            .unwrap();

        update_viewport_positions(&mut engine);
        assert_eq!(engine.get_viewport(&v).unwrap().position, Vec2::new(60.0, 60.0));
    }

    #[test]
    fn test_viewport_centres_on_sprite() {
        let (mut engine, _) = make_engine();
        let mut c = components(json!({"position": {"x": 50, "y": 30}}));
        c.insert(SPRITE_COMPONENT.into(), sprite(&engine, "box", 0.0, false, false));
        let e = engine.create_entity(c, None).unwrap();
        let v = engine
            .create_viewport(ViewportOptions::new().with_size(Size::new(40.0, 40.0)), None)
            .unwrap();
        engine.set_entity_to_follow_for_viewport(&e, &v).unwrap();

        engine.step(0.0).unwrap();
        assert_eq!(engine.get_viewport(&v).unwrap().position, Vec2::new(35.0, 15.0));
    }

    #[test]
    fn test_dangling_follow_leaves_viewport() {
        let (mut engine, _) = make_engine();
        let e = engine
            .create_entity(components(json!({"position": {"x": 95, "y": 95}})), None)
            .unwrap();
        let v = engine
            .create_viewport(
                ViewportOptions::new()
                    .with_position(Vec2::new(3.0, 4.0))
                    .following(e.clone()),
                None,
            )
            .unwrap();
        engine.remove_entity(&e).unwrap();

        for _ in 0..3 {
            update_viewport_positions(&mut engine);
        }
        assert_eq!(engine.get_viewport(&v).unwrap().position, Vec2::new(3.0, 4.0));
        assert_eq!(engine.get_viewport(&v).unwrap().entity_to_follow.as_ref(), Some(&e));
    }

    #[test]
    fn test_sprite_animation_advances() {
        let (mut engine, _) = make_engine();
        let mut c = components(json!({"position": {"x": 0, "y": 0}}));
        c.insert(SPRITE_COMPONENT.into(), sprite(&engine, "spin", 10.0, true, true));
        let e = engine.create_entity(c, None).unwrap();

        engine.step(1000.0).unwrap();
        let state: SpriteComponent = engine.component_as(&e, SPRITE_COMPONENT).unwrap();
        assert_eq!(state.animation_start, Some(1000.0));
        assert_eq!(state.frame, 0);

        engine.step(1200.0).unwrap();
        let state: SpriteComponent = engine.component_as(&e, SPRITE_COMPONENT).unwrap();
        assert_eq!(state.frame, 2);

        let mut stopped = state.clone();
        stopped.is_animating = false;
        engine
            .set_component_for_entity(&e, SPRITE_COMPONENT, stopped.to_value().unwrap())
            .unwrap();
        engine.step(1300.0).unwrap();
        let state: SpriteComponent = engine.component_as(&e, SPRITE_COMPONENT).unwrap();
        assert_eq!(state.animation_start, None);
        assert_eq!(state.frame, 2);
    }

    #[test]
    fn test_unknown_sprite_fails_tick() {
        let (mut engine, _) = make_engine();
        engine
            .create_entity(
                components(json!({"sprite": {
                    "id": "ghost", "frame": 0, "framesPerSecond": 1.0,
                    "isAnimating": true, "isLooping": true
                }})),
                None,
            )
            .unwrap();
        let err = engine.step(0.0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::UnknownSprite("ghost".into()))
        );
    }

    #[test]
    fn test_draw_back_to_front() {
        let (mut engine, _) = make_engine();
        engine.create_layer("background", 10.0, None).unwrap();

        let mut front = components(json!({"position": {"x": 5, "y": 5}, "depth": 1}));
        front.insert(SPRITE_COMPONENT.into(), sprite(&engine, "box", 0.0, false, false));
        engine.create_entity(front, None).unwrap();

        let mut back = components(json!({"position": {"x": 20, "y": 20}, "layer": "background"}));
        back.insert(SPRITE_COMPONENT.into(), sprite(&engine, "spin", 0.0, false, false));
        engine.create_entity(back, None).unwrap();

        let mut hidden = components(json!({"position": {"x": 90, "y": 90}}));
        hidden.insert(SPRITE_COMPONENT.into(), sprite(&engine, "box", 0.0, false, false));
        engine.create_entity(hidden, None).unwrap();

        engine
            .create_viewport(
                ViewportOptions::new()
                    .with_size(Size::new(40.0, 40.0))
                    .with_origin(Vec2::new(0.0, 0.0)),
                None,
            )
            .unwrap();

        engine.step(0.0).unwrap();

        let screen = Bounds::new(Position::ZERO, Size::new(40.0, 40.0));
        let tile = Bounds::new(Position::ZERO, Size::new(10.0, 10.0));
        assert_eq!(
            calls(&engine),
            &[
                Call::Clear(screen),
                Call::Fill(screen, "black".into()),
                Call::Load("spin.png".into()),
                Call::Draw(
                    "spin.png".into(),
                    tile,
                    Bounds::new(Position::new(19.0, 18.0), Size::new(10.0, 10.0))
                ),
                Call::Load("box.png".into()),
                Call::Draw(
                    "box.png".into(),
                    tile,
                    Bounds::new(Position::new(5.0, 5.0), Size::new(10.0, 10.0))
                ),
            ]
        );
    }

    #[test]
    fn test_find_entities_at_position_front_first() {
        let (mut engine, _) = make_engine();
        let mut a = components(json!({"position": {"x": 0, "y": 0}, "depth": 5}));
        a.insert(SPRITE_COMPONENT.into(), sprite(&engine, "box", 0.0, false, false));
        let back = engine.create_entity(a, None).unwrap();
        let mut b = components(json!({"position": {"x": 5, "y": 5}}));
        b.insert(SPRITE_COMPONENT.into(), sprite(&engine, "box", 0.0, false, false));
        let front = engine.create_entity(b, None).unwrap();

        assert_eq!(
            find_entities_at_position(&engine, Vec2::new(7.0, 7.0)),
            vec![front.clone(), back.clone()]
        );
        assert_eq!(find_entities_at_position(&engine, Vec2::new(2.0, 2.0)), vec![back]);
        assert!(find_entities_at_position(&engine, Vec2::new(50.0, 50.0)).is_empty());
        assert!(is_entity_at_position(&engine, &front, Vec2::new(15.0, 15.0)));
    }

    #[test]
    fn test_entity_bounds() {
        let (mut engine, _) = make_engine();
        let bare = engine.create_entity(components(json!({"name": "x"})), None).unwrap();
        assert_eq!(calculate_entity_bounds(&engine, &bare), None);

        let point = engine
            .create_entity(components(json!({"position": {"x": 1, "y": 2}})), None)
            .unwrap();
        assert_eq!(
            calculate_entity_bounds(&engine, &point),
            Some(Bounds::new(Position::new(1.0, 2.0), Size::ZERO))
        );
    }
}
