// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exact-area coverage rasterization of flattened paths.
//!
//! Every line adds its signed area to an accumulation row; a prefix sum over the row then yields
//! the fractional winding number of each pixel, which is turned into an alpha value according to
//! the fill rule. Rows are processed in bands of [`BAND_HEIGHT`] so the accumulation memory stays
//! proportional to the mask width.

use crate::flatten::Line;
use crate::geometry::IntRect;
use crate::peniko::Fill;
use smallvec::SmallVec;

/// The number of rows accumulated at once.
pub const BAND_HEIGHT: u16 = 16;

/// The alpha threshold used when antialiasing is disabled.
pub const ALIASING_THRESHOLD: u8 = 128;

/// A reusable rasterizer that turns line segments into per-pixel coverage.
#[derive(Debug, Default)]
pub struct Rasterizer {
    acc: Vec<f32>,
}

impl Rasterizer {
    /// Create a new rasterizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasterize `lines` into `out`, a row-major `width * height` coverage buffer.
    ///
    /// Every pixel of `out` is written. Lines outside of the buffer still contribute their
    /// winding to the pixels to their right. If `aliasing_threshold` is set, alpha values are
    /// snapped to 0 or 255 depending on whether they reach the threshold.
    ///
    /// # Panics
    ///
    /// Panics if `out` is not of length `width * height`.
    pub fn render(
        &mut self,
        lines: &[Line],
        width: u16,
        height: u16,
        fill_rule: Fill,
        aliasing_threshold: Option<u8>,
        out: &mut [u8],
    ) {
        let w = usize::from(width);
        assert_eq!(
            out.len(),
            w * usize::from(height),
            "Expected `out` to have length of exactly `width * height`"
        );
        out.fill(0);

        let Some(bounds) = coverage_bounds(lines, width, height) else {
            return;
        };

        // Two extra columns: one for lines at exactly `x == width`, and one for the remainder of
        // the last partially covered cell.
        let stride = w + 2;
        self.acc.clear();
        self.acc.resize(stride * usize::from(BAND_HEIGHT), 0.0);

        let row_end = bounds.y1 as u16;
        let mut band_y = bounds.y0 as u16;
        while band_y < row_end {
            let band_end = band_y.saturating_add(BAND_HEIGHT).min(row_end);

            for line in lines {
                accumulate_line(&mut self.acc, stride, width, band_y, band_end, line);
            }

            for y in band_y..band_end {
                let row = &mut self.acc[usize::from(y - band_y) * stride..][..stride];
                let out_row = &mut out[usize::from(y) * w..][..w];
                resolve_row(row, out_row, fill_rule, aliasing_threshold);
            }

            band_y = band_end;
        }
    }
}

/// The pixel bounds that can receive coverage from `lines` inside a `width * height` buffer.
///
/// Returns `None` if no pixel can be covered.
pub fn coverage_bounds(lines: &[Line], width: u16, height: u16) -> Option<IntRect> {
    let first = lines.first()?;
    let (mut x0, mut y0) = (first.p0.x, first.p0.y);
    let (mut x1, mut y1) = (x0, y0);
    for line in lines {
        for p in [line.p0, line.p1] {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
    }

    let bounds = IntRect::new(
        x0.floor() as i32,
        y0.floor() as i32,
        x1.ceil() as i32,
        y1.ceil() as i32,
    )
    .intersect(&IntRect::from_wh(u32::from(width), u32::from(height)));

    (!bounds.is_empty()).then_some(bounds)
}

/// Add the part of `line` that lies within rows `band_y0..band_y1` to the accumulation rows.
fn accumulate_line(
    acc: &mut [f32],
    stride: usize,
    width: u16,
    band_y0: u16,
    band_y1: u16,
    line: &Line,
) {
    let (p0, p1) = (line.p0, line.p1);
    if p0.y == p1.y {
        return;
    }

    let (dir, top, bottom) = if p0.y < p1.y {
        (1.0, p0, p1)
    } else {
        (-1.0, p1, p0)
    };

    let band_top = f32::from(band_y0);
    let band_bottom = f32::from(band_y1);
    if bottom.y <= band_top || top.y >= band_bottom {
        return;
    }

    let dxdy = (bottom.x - top.x) / (bottom.y - top.y);
    let ya = top.y.max(band_top);
    let yb = bottom.y.min(band_bottom);
    let xa = top.x + (ya - top.y) * dxdy;
    let xb = top.x + (yb - top.y) * dxdy;

    let right = f32::from(width);
    for [xa, ya, xb, yb] in split_at_edges(xa, ya, xb, yb, right) {
        accumulate_piece(acc, stride, band_y0, [xa, ya, xb, yb], dir, right);
    }
}

/// Split a segment (with `ya < yb`) where it crosses `x = 0` or `x = right`.
///
/// Each returned piece lies entirely on one side of both edges, so clamping its x coordinates
/// to `0..=right` doesn't change the coverage it contributes inside the buffer.
fn split_at_edges(xa: f32, ya: f32, xb: f32, yb: f32, right: f32) -> SmallVec<[[f32; 4]; 3]> {
    let mut ys: SmallVec<[f32; 2]> = SmallVec::new();
    for edge in [0.0, right] {
        if (xa - edge) * (xb - edge) < 0.0 {
            let t = (edge - xa) / (xb - xa);
            ys.push(ya + t * (yb - ya));
        }
    }
    if ys.len() == 2 && ys[0] > ys[1] {
        ys.swap(0, 1);
    }

    let x_at = |y: f32| {
        if yb == ya {
            xa
        } else {
            xa + (y - ya) / (yb - ya) * (xb - xa)
        }
    };

    let mut pieces = SmallVec::new();
    let mut prev_y = ya;
    let mut prev_x = xa;
    for y in ys.into_iter().chain(core::iter::once(yb)) {
        let x = if y == yb { xb } else { x_at(y) };
        if y > prev_y {
            pieces.push([prev_x, prev_y, x, y]);
        }
        prev_y = y;
        prev_x = x;
    }

    pieces
}

fn accumulate_piece(
    acc: &mut [f32],
    stride: usize,
    band_y0: u16,
    [xa, ya, xb, yb]: [f32; 4],
    dir: f32,
    right: f32,
) {
    let dxdy = (xb - xa) / (yb - ya);
    let row_start = ya.floor() as usize;
    let row_end = yb.ceil() as usize;

    for y in row_start..row_end {
        let row_top = (y as f32).max(ya);
        let row_bottom = ((y + 1) as f32).min(yb);
        if row_bottom <= row_top {
            continue;
        }

        let x0 = (xa + (row_top - ya) * dxdy).clamp(0.0, right);
        let x1 = (xa + (row_bottom - ya) * dxdy).clamp(0.0, right);
        let d = (row_bottom - row_top) * dir;

        let band_row = y - usize::from(band_y0);
        accumulate_cells(&mut acc[band_row * stride..][..stride], x0, x1, d);
    }
}

/// Add the coverage deltas of a segment spanning one row, from `x0` to `x1`, with signed height
/// `d`.
///
/// The coverage of cell `i` is `d` times the mean fraction of the cell lying to the right of the
/// segment. Only differences between neighbouring cells are stored, so the prefix sum over the
/// row reconstructs the coverage, including the full `d` for every cell right of the segment.
fn accumulate_cells(row: &mut [f32], x0: f32, x1: f32, d: f32) {
    let (x0, x1) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
    let last = row.len() - 2;
    let i0 = (x0 as usize).min(last);
    let i1 = (x1 as usize).min(last);

    if i0 == i1 || x1 - x0 < 1e-3 {
        let cov = d * (i0 as f32 + 1.0 - 0.5 * (x0 + x1)).clamp(0.0, 1.0);
        row[i0] += cov;
        row[i0 + 1] += d - cov;
        return;
    }

    // The antiderivative of `clamp(t, 0, 1)`.
    let integral = |t: f32| {
        if t <= 0.0 {
            0.0
        } else if t < 1.0 {
            0.5 * t * t
        } else {
            t - 0.5
        }
    };

    let inv_dx = (x1 - x0).recip();
    let mut prev = 0.0;
    for i in i0..=i1 {
        let edge = i as f32 + 1.0;
        let cov = d * (integral(edge - x0) - integral(edge - x1)) * inv_dx;
        row[i] += cov - prev;
        prev = cov;
    }
    row[i1 + 1] += d - prev;
}

fn resolve_row(row: &mut [f32], out: &mut [u8], fill_rule: Fill, aliasing_threshold: Option<u8>) {
    let mut winding = 0.0_f32;
    for (acc, alpha) in row.iter().zip(out.iter_mut()) {
        winding += *acc;
        let coverage = match fill_rule {
            Fill::NonZero => winding.abs(),
            Fill::EvenOdd => {
                let nearest_even = 2.0 * (0.5 * winding + 0.5).floor();
                (winding - nearest_even).abs()
            }
        };

        let mut value = (coverage.min(1.0) * 255.0 + 0.5) as u8;
        if let Some(threshold) = aliasing_threshold {
            value = if value >= threshold { 255 } else { 0 };
        }
        *alpha = value;
    }
    row.fill(0.0);
}
