//! # heks_engine
//!
//! The runtime half of the heks engine: everything above the entity/component
//! store.
//!
//! This crate provides:
//!
//! - [`Engine`]: the facade game code talks to: rooms, viewports, entities,
//!   components, filters, events and modules.
//! - [`Rooms`]: room membership, layers and viewports.
//! - [`EventHandlers`] / [`Lifecycle`]: the engine-scoped event bus and the
//!   fixed six-phase tick.
//! - [`EventEmitter`]: a state-threading emitter whose `emit` is a left fold.
//! - [`Module`]: installable extensions: [`Keyboard`], [`Mouse`],
//!   [`SpriteManager`] and [`Renderer`].
//! - [`GameLoopRunner`]: drives the tick from a [`FrameScheduler`].

pub mod config;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod events;
pub mod input;
pub mod module;
pub mod renderer;
pub mod room;
pub mod runner;
pub mod sprite;

pub use config::EngineConfig;
pub use emitter::{EventEmitter, HandlerId};
pub use engine::{Engine, EngineBuilder, Filter};
pub use error::EngineError;
pub use events::{EventHandler, EventHandlers, Lifecycle};
pub use input::{ButtonInput, Keyboard, Mouse, MouseButton};
pub use module::Module;
pub use renderer::{DrawSurface, Renderer};
pub use room::{DEFAULT_LAYER, Room, RoomId, Rooms, Viewport, ViewportId, ViewportOptions};
pub use runner::{
    FrameScheduler, GameLoopRunner, IntervalScheduler, MIN_FRAME_PERIOD,
    calculate_frames_per_second,
};
pub use sprite::{
    SPRITE_COMPONENT, Sprite, SpriteComponent, SpriteFrame, SpriteManager, SpriteSheet,
};
