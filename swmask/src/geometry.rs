// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer pixel geometry.

use crate::kurbo::Rect;

/// An axis-aligned rectangle with integer pixel coordinates.
///
/// The rectangle covers the pixels `x0..x1` horizontally and `y0..y1` vertically, so the right
/// and bottom edges are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntRect {
    /// The minimum x coordinate.
    pub x0: i32,
    /// The minimum y coordinate.
    pub y0: i32,
    /// The maximum x coordinate (exclusive).
    pub x1: i32,
    /// The maximum y coordinate (exclusive).
    pub y1: i32,
}

impl IntRect {
    /// The empty rectangle at the origin.
    pub const EMPTY: Self = Self::new(0, 0, 0, 0);

    /// Create a new rectangle from its edges.
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Create a new rectangle from its origin and size.
    pub fn from_xywh(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::new(
            x,
            y,
            x.saturating_add_unsigned(width),
            y.saturating_add_unsigned(height),
        )
    }

    /// Create a rectangle at the origin with the given size.
    pub fn from_wh(width: u32, height: u32) -> Self {
        Self::from_xywh(0, 0, width, height)
    }

    /// The smallest integer rectangle that contains `rect`.
    ///
    /// Coordinates outside the `i32` range saturate.
    pub fn round_out(rect: Rect) -> Self {
        let rect = rect.abs();
        Self::new(
            rect.x0.floor() as i32,
            rect.y0.floor() as i32,
            rect.x1.ceil() as i32,
            rect.y1.ceil() as i32,
        )
    }

    /// The width of the rectangle, or 0 if it is inverted.
    pub fn width(&self) -> u32 {
        if self.x1 > self.x0 {
            self.x1.abs_diff(self.x0)
        } else {
            0
        }
    }

    /// The height of the rectangle, or 0 if it is inverted.
    pub fn height(&self) -> u32 {
        if self.y1 > self.y0 {
            self.y1.abs_diff(self.y0)
        } else {
            0
        }
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// The intersection of two rectangles.
    ///
    /// The result is [`IntRect::EMPTY`] if they don't overlap.
    pub fn intersect(&self, other: &Self) -> Self {
        let r = Self::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        if r.is_empty() {
            Self::EMPTY
        } else {
            r
        }
    }

    /// Whether the pixel at `(x, y)` lies inside the rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.is_empty()
            || (other.x0 >= self.x0
                && other.y0 >= self.y0
                && other.x1 <= self.x1
                && other.y1 <= self.y1)
    }

    /// Move the rectangle by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x0.saturating_add(dx),
            self.y0.saturating_add(dy),
            self.x1.saturating_add(dx),
            self.y1.saturating_add(dy),
        )
    }

    /// Convert to a floating point rectangle.
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x0),
            f64::from(self.y0),
            f64::from(self.x1),
            f64::from(self.y1),
        )
    }
}
