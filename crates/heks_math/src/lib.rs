//! # heks_math
//!
//! 2D math types for the heks engine. Re-exports [`glam::Vec2`] for camera
//! arithmetic and defines the plain-data shapes that are stored inside
//! components (`{x, y}`, `{width, height}`, `{top, left}`).

pub mod collision;
pub mod geometry;

// Re-export glam types for convenience.
pub use glam::Vec2;

pub use collision::{is_point_in_point, is_point_in_rectangle, is_rectangle_in_rectangle};
pub use geometry::{Bounds, Offset, Position, Size};
