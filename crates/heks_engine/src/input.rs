//! Keyboard and mouse input modules.
//!
//! The host (a window, a terminal, a test) forwards raw device events to the
//! modules; the modules turn them into engine events once per tick:
//!
//! - *pressed*: edge-triggered, reported only on the tick after the button
//!   went down;
//! - *down*: level-triggered, reported every tick while the button is held;
//! - *released*: edge-triggered, reported only on the tick after it went up.
//!
//! Events are emitted during `update` and the edge sets are cleared during
//! `afterUpdate`, so game handlers on `update` see a consistent frame.

use heks_component::EntityId;
use heks_math::{Position, Vec2};
use serde_json::{Value, json};
use tracing::debug;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::events::Lifecycle;
use crate::module::Module;
use crate::renderer::find_entities_at_position;

/// Pressed/down/released tracking for one kind of button.
#[derive(Debug, Clone)]
pub struct ButtonInput<B> {
    pressed: Vec<B>,
    down: Vec<B>,
    released: Vec<B>,
}

impl<B: Clone + PartialEq> ButtonInput<B> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pressed: Vec::new(),
            down: Vec::new(),
            released: Vec::new(),
        }
    }

    /// Record a button going down. Auto-repeat while held is ignored.
    pub fn press(&mut self, button: B) {
        if !self.is_pressed(&button) && !self.is_down(&button) {
            self.pressed.push(button.clone());
        }
        if !self.is_down(&button) {
            self.down.push(button);
        }
    }

    /// Record a button going up.
    pub fn release(&mut self, button: B) {
        self.down.retain(|b| *b != button);
        if !self.is_released(&button) {
            self.released.push(button);
        }
    }

    /// Whether `button` went down this frame.
    #[must_use]
    pub fn is_pressed(&self, button: &B) -> bool {
        self.pressed.contains(button)
    }

    /// Whether `button` is held.
    #[must_use]
    pub fn is_down(&self, button: &B) -> bool {
        self.down.contains(button)
    }

    /// Whether `button` went up this frame.
    #[must_use]
    pub fn is_released(&self, button: &B) -> bool {
        self.released.contains(button)
    }

    /// Buttons that went down this frame, in press order.
    pub fn pressed(&self) -> &[B] {
        &self.pressed
    }

    /// Buttons currently held, in press order.
    pub fn down(&self) -> &[B] {
        &self.down
    }

    /// Buttons that went up this frame, in release order.
    pub fn released(&self) -> &[B] {
        &self.released
    }

    /// Forget the edge-triggered sets; held buttons stay down.
    pub fn clear_edges(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    /// Forget everything, e.g. when the host loses focus.
    pub fn reset(&mut self) {
        self.clear_edges();
        self.down.clear();
    }
}

impl<B: Clone + PartialEq> Default for ButtonInput<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyboard state. Keys are identified by their lowercased name.
#[derive(Debug, Default)]
pub struct Keyboard {
    keys: ButtonInput<String>,
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: &str) {
        self.keys.press(key.to_lowercase());
    }

    pub fn key_up(&mut self, key: &str) {
        self.keys.release(key.to_lowercase());
    }

    /// Drop all key state.
    pub fn blur(&mut self) {
        self.keys.reset();
    }

    /// Whether `key` went down this frame. Keys are matched case-insensitively.
    #[must_use]
    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.keys.is_pressed(&key.to_lowercase())
    }

    /// Whether `key` is held.
    #[must_use]
    pub fn is_key_down(&self, key: &str) -> bool {
        self.keys.is_down(&key.to_lowercase())
    }

    /// Whether `key` went up this frame.
    #[must_use]
    pub fn is_key_released(&self, key: &str) -> bool {
        self.keys.is_released(&key.to_lowercase())
    }

    #[must_use]
    pub fn keys(&self) -> &ButtonInput<String> {
        &self.keys
    }
}

fn emit_keys(engine: &mut Engine, _args: &[Value]) -> anyhow::Result<()> {
    let Some(keyboard) = engine.module::<Keyboard>() else {
        return Ok(());
    };
    let keys = keyboard.keys.clone();
    for key in keys.pressed() {
        engine.emit_event("keyPressed", &[json!(key)])?;
    }
    for key in keys.down() {
        engine.emit_event("keyDown", &[json!(key)])?;
    }
    for key in keys.released() {
        engine.emit_event("keyUp", &[json!(key)])?;
    }
    Ok(())
}

impl Module for Keyboard {
    fn init(&mut self, engine: &mut Engine) -> Result<(), EngineError> {
        engine.add_event_handler(Lifecycle::Update.as_str(), emit_keys);
        engine.add_event_handler(Lifecycle::AfterUpdate.as_str(), |engine, _| {
            if let Some(keyboard) = engine.module_mut::<Keyboard>() {
                keyboard.keys.clear_edges();
            }
            Ok(())
        });
        debug!("keyboard input attached");
        Ok(())
    }
}

/// Mouse buttons, as numbered by DOM-style `button` indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Back,
    Forward,
}

impl MouseButton {
    /// Map a device button index; unknown indices yield `None`.
    #[must_use]
    pub fn from_index(index: i16) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Middle),
            2 => Some(Self::Right),
            3 => Some(Self::Back),
            4 => Some(Self::Forward),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
            Self::Back => "back",
            Self::Forward => "forward",
        }
    }
}

/// Mouse state: buttons, pointer position and the entities under it.
#[derive(Debug, Default)]
pub struct Mouse {
    buttons: ButtonInput<MouseButton>,
    position_in_room: Vec2,
    position_in_viewport: Vec2,
    entities_under_mouse: Vec<EntityId>,
}

impl Mouse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unknown button indices are ignored.
    pub fn button_down(&mut self, index: i16) {
        if let Some(button) = MouseButton::from_index(index) {
            self.buttons.press(button);
        }
    }

    pub fn button_up(&mut self, index: i16) {
        if let Some(button) = MouseButton::from_index(index) {
            self.buttons.release(button);
        }
    }

    pub fn blur(&mut self) {
        self.buttons.reset();
    }

    /// Whether `button` went down this frame.
    #[must_use]
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.is_pressed(&button)
    }

    /// Whether `button` is held.
    #[must_use]
    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.is_down(&button)
    }

    /// Whether `button` went up this frame.
    #[must_use]
    pub fn is_button_released(&self, button: MouseButton) -> bool {
        self.buttons.is_released(&button)
    }

    #[must_use]
    pub fn position_in_room(&self) -> Vec2 {
        self.position_in_room
    }

    #[must_use]
    pub fn position_in_viewport(&self) -> Vec2 {
        self.position_in_viewport
    }

    /// Entities under the pointer as of the last `beforeUpdate`, front-most
    /// first.
    #[must_use]
    pub fn entities_under_mouse(&self) -> &[EntityId] {
        &self.entities_under_mouse
    }

    /// Move the pointer to `surface_position` (relative to the drawing
    /// surface's top-left corner, in device pixels) and emit `mouseMove`.
    ///
    /// The position is clamped to the surface, unscaled, and mapped into room
    /// space through the viewport under the pointer (or the first viewport of
    /// the current room when none is).
    ///
    /// # Errors
    ///
    /// Propagates errors from `mouseMove` handlers.
    pub fn handle_move(engine: &mut Engine, surface_position: Vec2) -> anyhow::Result<()> {
        let scale = engine.scale();
        let surface_size = engine.size().to_vec2() * scale;
        let in_viewport = (surface_position.clamp(Vec2::ZERO, surface_size) / scale).round();

        let viewports = engine.get_viewports_in_current_room().unwrap_or_default();
        let focus = viewports
            .iter()
            .find(|viewport| {
                let max = viewport.origin + viewport.size.to_vec2();
                in_viewport.cmpge(viewport.origin).all() && in_viewport.cmple(max).all()
            })
            .or_else(|| viewports.first());
        let in_room = match focus {
            Some(viewport) => (in_viewport + viewport.position - viewport.origin).clamp(
                viewport.position,
                viewport.position + viewport.size.to_vec2(),
            ),
            None => in_viewport,
        };

        let Some(mouse) = engine.module_mut::<Mouse>() else {
            return Ok(());
        };
        mouse.position_in_viewport = in_viewport;
        mouse.position_in_room = in_room;
        let args = [
            position_json(in_room),
            position_json(in_viewport),
            json!(mouse.entities_under_mouse),
        ];
        engine.emit_event("mouseMove", &args)
    }

    fn event_args(&self, button: MouseButton) -> [Value; 4] {
        [
            json!(button.as_str()),
            position_json(self.position_in_room),
            position_json(self.position_in_viewport),
            json!(self.entities_under_mouse),
        ]
    }
}

fn position_json(v: Vec2) -> Value {
    json!(Position::from(v))
}

fn emit_buttons(engine: &mut Engine, _args: &[Value]) -> anyhow::Result<()> {
    let Some(mouse) = engine.module::<Mouse>() else {
        return Ok(());
    };
    let events: Vec<(&str, [Value; 4])> = mouse
        .buttons
        .pressed()
        .iter()
        .map(|b| ("mousePressed", mouse.event_args(*b)))
        .chain(
            mouse
                .buttons
                .down()
                .iter()
                .map(|b| ("mouseDown", mouse.event_args(*b))),
        )
        .chain(
            mouse
                .buttons
                .released()
                .iter()
                .map(|b| ("mouseUp", mouse.event_args(*b))),
        )
        .collect();
    for (event, args) in events {
        engine.emit_event(event, &args)?;
    }
    Ok(())
}

impl Module for Mouse {
    fn init(&mut self, engine: &mut Engine) -> Result<(), EngineError> {
        engine.add_event_handler(Lifecycle::BeforeUpdate.as_str(), |engine, _| {
            let Some(position) = engine.module::<Mouse>().map(Mouse::position_in_room) else {
                return Ok(());
            };
            let under = find_entities_at_position(engine, position);
            if let Some(mouse) = engine.module_mut::<Mouse>() {
                mouse.entities_under_mouse = under;
            }
            Ok(())
        });
        engine.add_event_handler(Lifecycle::Update.as_str(), emit_buttons);
        engine.add_event_handler(Lifecycle::AfterUpdate.as_str(), |engine, _| {
            if let Some(mouse) = engine.module_mut::<Mouse>() {
                mouse.buttons.clear_edges();
            }
            Ok(())
        });
        debug!("mouse input attached");
        Ok(())
    }
}
