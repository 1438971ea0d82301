//! The demo scene and its input script.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};
use heks_component::{Components, EntityId, components_from_json};
use heks_engine::{Engine, Filter, Keyboard, SPRITE_COMPONENT, SpriteManager, ViewportOptions};
use heks_math::{Position, Size};
use serde_json::{Value, json};
use tracing::info;

/// Frames run when no config file is given.
pub const DEFAULT_FRAMES: u64 = 180;

const ROOM_SIZE: Size = Size::new(960.0, 240.0);
const TILE: f32 = 32.0;

const ATLAS: &str = r#"[
    {
        "name": "hero",
        "file": "assets/hero.png",
        "frameSize": {"width": 16, "height": 24},
        "frames": [0, 1, 2, 3],
        "origin": {"top": -8, "left": 0}
    },
    {
        "name": "grass",
        "file": "assets/tiles.png",
        "frameSize": {"width": 32, "height": 32},
        "frameStart": 4,
        "frames": [0]
    }
]"#;

#[derive(Debug, Clone, Copy)]
enum KeyAction {
    Down,
    Up,
}

/// Scripted key events: (time in ms, action, key).
const SCRIPT: &[(f64, KeyAction, &str)] = &[
    (100.0, KeyAction::Down, "ArrowRight"),
    (1800.0, KeyAction::Up, "ArrowRight"),
    (2000.0, KeyAction::Down, "ArrowLeft"),
    (2600.0, KeyAction::Up, "ArrowLeft"),
];

/// Time after the last scripted event at which the demo stops itself.
const STOP_AFTER: f64 = 400.0;

fn with_sprite(
    engine: &Engine,
    mut components: Components,
    sprite: &str,
    fps: f64,
) -> Result<Components> {
    let sprites = engine
        .module::<SpriteManager>()
        .context("sprite manager is not installed")?;
    let component = sprites.component_for_sprite(sprite, fps, fps > 0.0, true, 0)?;
    components.insert(SPRITE_COMPONENT.to_string(), component.to_value()?);
    Ok(components)
}

/// Build the room, the player and the camera, and install the input script.
/// Returns the player entity.
pub fn setup(engine: &mut Engine) -> Result<EntityId> {
    let screen = engine.size();
    let room = engine.create_room(Some("field".into()), Some(ROOM_SIZE), true);
    engine.create_layer("ground", 10.0, Some(&room))?;

    let loaded = engine
        .module_mut::<SpriteManager>()
        .context("sprite manager is not installed")?
        .load_sprite_atlas_json(ATLAS)?;
    info!(sprites = loaded, "sprite atlas loaded");

    let columns = (ROOM_SIZE.width / TILE) as u32;
    let ground = ROOM_SIZE.height - TILE;
    for column in 0..columns {
        let x = column as f32 * TILE;
        let tile = components_from_json(json!({
            "position": {"x": x, "y": ground},
            "layer": "ground"
        }))?;
        let tile = with_sprite(engine, tile, "grass", 0.0)?;
        engine.create_entity(tile, None)?;
    }

    let player = components_from_json(json!({
        "player": true,
        "speed": 3,
        "position": {"x": 40, "y": ground - 24.0},
        "depth": -1
    }))?;
    let player = with_sprite(engine, player, "hero", 8.0)?;
    let player = engine.create_entity_with_id("player", player, None)?;

    let camera = engine.create_viewport(ViewportOptions::new().with_size(screen), None)?;
    engine.set_entity_to_follow_for_viewport(&player, &camera)?;

    install_controls(engine);
    install_script(engine);
    Ok(player)
}

fn install_controls(engine: &mut Engine) {
    engine.add_event_handler("keyPressed", |_, args| {
        info!(key = ?args.first(), "key pressed");
        Ok(())
    });

    engine.add_event_handler_for_entities(
        "keyDown",
        |engine, entity, args| {
            let dx = match args.first().and_then(Value::as_str) {
                Some("arrowleft") => -1.0,
                Some("arrowright") => 1.0,
                _ => return Ok(()),
            };
            let speed = engine
                .get_value_of_component_for_entity(entity, "speed")?
                .and_then(Value::as_f64)
                .unwrap_or(1.0) as f32;
            let Some(mut position) = engine.component_as::<Position>(entity, "position") else {
                return Ok(());
            };
            position.x = (position.x + dx * speed).clamp(0.0, ROOM_SIZE.width - 16.0);
            engine.set_component_for_entity(entity, "position", json!(position))?;
            Ok(())
        },
        Filter::new().with("player"),
    );
}

fn install_script(engine: &mut Engine) {
    let cursor = Rc::new(Cell::new(0usize));
    let started = Rc::new(Cell::new(None::<f64>));
    engine.add_event_handler("beforeUpdate", move |engine, args| {
        let now = args.first().and_then(Value::as_f64).unwrap_or_default();
        let start = started.get().unwrap_or(now);
        started.set(Some(start));
        let elapsed = now - start;

        while let Some((at, action, key)) = SCRIPT.get(cursor.get()) {
            if *at > elapsed {
                break;
            }
            if let Some(keyboard) = engine.module_mut::<Keyboard>() {
                match action {
                    KeyAction::Down => keyboard.key_down(key),
                    KeyAction::Up => keyboard.key_up(key),
                }
            }
            cursor.set(cursor.get() + 1);
        }

        let last = SCRIPT.last().map_or(0.0, |(at, _, _)| *at);
        if cursor.get() == SCRIPT.len() && elapsed >= last + STOP_AFTER {
            info!(elapsed, "script finished");
            engine.stop();
        }
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use heks_engine::{EngineConfig, Renderer};

    use super::*;
    use crate::surface::LogSurface;

    fn make_engine() -> Engine {
        Engine::builder(EngineConfig::default())
            .with_module(Keyboard::new())
            .with_module(Renderer::new(LogSurface::new(1.0)))
            .build()
            .unwrap()
    }

    fn player_x(engine: &Engine, player: &EntityId) -> f32 {
        engine
            .component_as::<Position>(player, "position")
            .unwrap()
            .x
    }

    #[test]
    fn test_setup_builds_scene() {
        let mut engine = make_engine();
        let player = setup(&mut engine).unwrap();
        assert_eq!(player.as_str(), "player");
        assert_eq!(engine.get_entities(&Filter::new().with("layer")).len(), 30);
        let viewports = engine.get_viewports_in_current_room().unwrap();
        assert_eq!(viewports[0].entity_to_follow.as_ref(), Some(&player));
    }

    #[test]
    fn test_script_moves_player_and_stops() {
        let mut engine = make_engine();
        let player = setup(&mut engine).unwrap();
        engine.start();

        engine.step(0.0).unwrap();
        let x0 = player_x(&engine, &player);
        for frame in 1..=10 {
            engine.step(100.0 + f64::from(frame) * 16.0).unwrap();
        }
        assert!(player_x(&engine, &player) > x0);
        assert!(engine.is_running());

        engine.step(2700.0).unwrap();
        engine.step(3100.0).unwrap();
        assert!(!engine.is_running());
        assert!(engine.module::<Renderer<LogSurface>>().unwrap().surface().draw_calls() > 0);
    }
}
