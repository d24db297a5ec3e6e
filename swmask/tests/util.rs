// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use swmask::MaskBuffer;
use swmask::geometry::IntRect;
use swmask::kurbo::Rect;

pub(crate) const RECT_A: Rect = Rect::new(0.0, 0.0, 60.0, 60.0);
pub(crate) const RECT_B: Rect = Rect::new(40.0, 40.0, 100.0, 100.0);

pub(crate) fn in_rect(rect: Rect, x: u16, y: u16) -> bool {
    let (x, y) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
    x > rect.x0 && x < rect.x1 && y > rect.y0 && y < rect.y1
}

/// Assert that every pixel of `mask` is either fully covered or empty, as decided by
/// `expected`.
pub(crate) fn check_binary(mask: &MaskBuffer, expected: impl Fn(u16, u16) -> bool) {
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            let want = if expected(x, y) { 255 } else { 0 };
            assert_eq!(mask.sample(x, y), want, "pixel ({x}, {y})");
        }
    }
}

pub(crate) fn square() -> IntRect {
    IntRect::from_xywh(0, 0, 100, 100)
}
