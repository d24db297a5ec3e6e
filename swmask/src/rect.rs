// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fast rendering of axis-aligned rectangles.
//!
//! This bypasses the full path processing pipeline (flatten → accumulate → resolve) by
//! computing the covered area of each pixel directly. The coverage of a pixel is the product of
//! its horizontal and vertical overlap with the rectangle, which is exactly what the path
//! pipeline computes for the same rectangle.

use crate::geometry::IntRect;
use crate::kurbo::{Affine, Rect};

/// Whether `affine` maps axis-aligned rectangles to axis-aligned rectangles.
pub fn is_axis_aligned(affine: &Affine) -> bool {
    let [_, b, c, _, _, _] = affine.as_coeffs();
    b == 0.0 && c == 0.0
}

/// Render `rect`, given in device space, into `out`, a row-major `width * height` coverage
/// buffer.
///
/// Every pixel of `out` is written. Returns the pixel bounds that received coverage, or `None`
/// if the rectangle misses the buffer.
///
/// # Panics
///
/// Panics if `out` is not of length `width * height`.
pub fn render(
    rect: Rect,
    width: u16,
    height: u16,
    aliasing_threshold: Option<u8>,
    out: &mut [u8],
) -> Option<IntRect> {
    let w = usize::from(width);
    assert_eq!(
        out.len(),
        w * usize::from(height),
        "Expected `out` to have length of exactly `width * height`"
    );
    out.fill(0);

    let rect = rect.abs();
    if !rect.is_finite() {
        return None;
    }

    let bounds = IntRect::round_out(rect)
        .intersect(&IntRect::from_wh(u32::from(width), u32::from(height)));
    if bounds.is_empty() {
        return None;
    }

    for y in bounds.y0..bounds.y1 {
        let cov_y = overlap(y, rect.y0, rect.y1);
        let row = &mut out[y as usize * w..][..w];
        for x in bounds.x0..bounds.x1 {
            let coverage = overlap(x, rect.x0, rect.x1) * cov_y;
            let mut value = (coverage * 255.0 + 0.5) as u8;
            if let Some(threshold) = aliasing_threshold {
                value = if value >= threshold { 255 } else { 0 };
            }
            row[x as usize] = value;
        }
    }

    Some(bounds)
}

/// The length of the overlap between pixel `i` and the span `lo..hi`.
#[inline(always)]
fn overlap(i: i32, lo: f64, hi: f64) -> f64 {
    let i = f64::from(i);
    ((i + 1.0).min(hi) - i.max(lo)).clamp(0.0, 1.0)
}
