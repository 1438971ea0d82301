//! Overlap tests on points and rectangles.
//!
//! Rectangles are given as `[top_left, bottom_right]` corner pairs. Unlike
//! [`Bounds::contains`](crate::Bounds::contains), point containment here is
//! half-open: the right and bottom edges are outside.

use glam::Vec2;

/// Returns `true` if both points are identical.
#[must_use]
pub fn is_point_in_point(a: Vec2, b: Vec2) -> bool {
    a == b
}

/// Returns `true` if `point` lies in `[left, right) × [top, bottom)`.
#[must_use]
pub fn is_point_in_rectangle(point: Vec2, [top_left, bottom_right]: [Vec2; 2]) -> bool {
    point.x >= top_left.x
        && point.y >= top_left.y
        && point.x < bottom_right.x
        && point.y < bottom_right.y
}

/// Returns `true` if the two rectangles overlap with non-zero area.
#[must_use]
pub fn is_rectangle_in_rectangle([a_min, a_max]: [Vec2; 2], [b_min, b_max]: [Vec2; 2]) -> bool {
    a_min.x < b_max.x && a_max.x > b_min.x && a_min.y < b_max.y && a_max.y > b_min.y
}
