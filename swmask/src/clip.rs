// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The raster clip of a mask.

use crate::geometry::IntRect;
use crate::op::mul_255;

/// The region draws into a mask may affect.
///
/// A raster clip is either a pixel-aligned rectangle, or a rectangle combined with an 8-bit
/// coverage value per pixel for antialiased clips. It starts out as the full buffer and can only
/// shrink through intersections until it is reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterClip {
    /// The extent of the buffer the clip belongs to.
    full: IntRect,
    /// The pixels that may be touched at all.
    bounds: IntRect,
    /// Per-pixel coverage over the whole buffer, if the clip isn't a plain rectangle.
    coverage: Option<Vec<u8>>,
}

impl RasterClip {
    /// Create a clip covering a whole `width * height` buffer.
    pub fn new(width: u16, height: u16) -> Self {
        let full = IntRect::from_wh(u32::from(width), u32::from(height));
        Self {
            full,
            bounds: full,
            coverage: None,
        }
    }

    /// Reset the clip to the whole buffer.
    pub fn reset(&mut self) {
        self.bounds = self.full;
        self.coverage = None;
    }

    /// The bounds of the clip. Pixels outside of them are never touched.
    pub fn bounds(&self) -> IntRect {
        self.bounds
    }

    /// Whether the clip excludes every pixel.
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Whether the clip is a pixel-aligned rectangle with full coverage inside.
    pub fn is_rect(&self) -> bool {
        self.coverage.is_none()
    }

    /// Intersect the clip with a pixel rectangle.
    pub fn intersect_rect(&mut self, rect: IntRect) {
        self.bounds = self.bounds.intersect(&rect);
        if self.bounds.is_empty() {
            self.coverage = None;
        }
    }

    /// Intersect the clip with per-pixel coverage.
    ///
    /// `coverage` holds one value per pixel of the whole buffer, in row-major order; `bounds`
    /// are the pixels where it may be non-zero.
    ///
    /// # Panics
    ///
    /// Panics if `coverage` doesn't cover the whole buffer.
    pub fn intersect_coverage(&mut self, bounds: IntRect, coverage: &[u8]) {
        let width = self.full.width() as usize;
        assert_eq!(
            coverage.len(),
            width * self.full.height() as usize,
            "Expected one coverage value per pixel"
        );

        self.intersect_rect(bounds);
        if self.is_empty() {
            return;
        }

        let clip = self.coverage.get_or_insert_with(|| vec![255; coverage.len()]);
        let mut opaque = true;
        for y in self.bounds.y0..self.bounds.y1 {
            let row = y as usize * width;
            for x in self.bounds.x0 as usize..self.bounds.x1 as usize {
                let c = mul_255(clip[row + x], coverage[row + x]);
                opaque &= c == 255;
                clip[row + x] = c;
            }
        }

        // A pixel-aligned clip collapses back to a rectangle.
        if opaque {
            self.coverage = None;
        }
    }

    /// The clip coverage of the pixel at `(x, y)`.
    #[inline]
    pub fn coverage(&self, x: i32, y: i32) -> u8 {
        if !self.bounds.contains(x, y) {
            return 0;
        }
        match &self.coverage {
            None => 255,
            Some(coverage) => coverage[y as usize * self.full.width() as usize + x as usize],
        }
    }

    /// The clip coverage of row `y`, restricted to the columns `x0..x1` of the clip bounds.
    ///
    /// Returns `None` for rectangular clips, where every pixel inside the bounds is fully
    /// covered.
    #[inline]
    pub(crate) fn row_coverage(&self, y: i32) -> Option<&[u8]> {
        let width = self.full.width() as usize;
        self.coverage.as_ref().map(|coverage| {
            let row = &coverage[y as usize * width..][..width];
            &row[self.bounds.x0 as usize..self.bounds.x1 as usize]
        })
    }
}
