//! Plain 2D shapes.
//!
//! These mirror the JSON shapes that game code stores in components, so they
//! derive `Serialize`/`Deserialize` with the same field names. Conversions to
//! [`Vec2`] are provided for arithmetic.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A point in room space, stored as `{"x": .., "y": ..}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Position> for Vec2 {
    fn from(p: Position) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// Width and height, stored as `{"width": .., "height": ..}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    /// A zero-area size, used for entities without a sprite.
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// An offset from a top-left corner, stored as `{"top": .., "left": ..}`.
///
/// Used for sprite origins and frame offsets inside a sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub top: f32,
    pub left: f32,
}

impl Offset {
    pub const ZERO: Self = Self {
        top: 0.0,
        left: 0.0,
    };

    #[must_use]
    pub const fn new(top: f32, left: f32) -> Self {
        Self { top, left }
    }

    /// Returns the offset as an `(x, y)` vector.
    #[must_use]
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }
}

/// An axis-aligned rectangle: a position plus a size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    #[must_use]
    pub fn new(position: Position, size: Size) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        }
    }

    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Midpoint of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test: points on the edges count as inside.
    #[must_use]
    pub fn contains(&self, point: Position) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x <= self.x + self.width
            && point.y <= self.y + self.height
    }

    /// Strict overlap test: rectangles that only share an edge do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.x < other.x + other.width
            && self.y < other.y + other.height
            && self.x + self.width > other.x
            && self.y + self.height > other.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_deserializes_from_component_shape() {
        let p: Position = serde_json::from_value(serde_json::json!({"x": 3, "y": 4.5})).unwrap();
        assert_eq!(p, Position::new(3.0, 4.5));
    }

    #[test]
    fn test_offset_vec2_is_left_top() {
        let o = Offset::new(2.0, 7.0);
        assert_eq!(o.to_vec2(), Vec2::new(7.0, 2.0));
    }

    #[test]
    fn test_bounds_center() {
        let b = Bounds::new(Position::new(10.0, 20.0), Size::new(4.0, 8.0));
        assert_eq!(b.center(), Vec2::new(12.0, 24.0));
    }

    #[test]
    fn test_bounds_contains_edges() {
        let b = Bounds::new(Position::new(0.0, 0.0), Size::new(10.0, 10.0));
        assert!(b.contains(Position::new(10.0, 10.0)));
        assert!(b.contains(Position::new(0.0, 5.0)));
        assert!(!b.contains(Position::new(10.1, 5.0)));
    }

    #[test]
    fn test_bounds_overlap_excludes_touching_edges() {
        let a = Bounds::new(Position::new(0.0, 0.0), Size::new(10.0, 10.0));
        let b = Bounds::new(Position::new(10.0, 0.0), Size::new(10.0, 10.0));
        let c = Bounds::new(Position::new(9.0, 9.0), Size::new(10.0, 10.0));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }
}
