// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Signed distance fields from coverage masks.
//!
//! The boundary of a mask lies where its coverage crosses 50%. Distances are measured in pixels,
//! positive outside of the covered area and negative inside.
//!
//! Pixels with fractional coverage, or with a 4-neighbour on the other side of the boundary,
//! are edge pixels. Their distance is estimated from the coverage alone, as `0.5 - alpha`. Every
//! other pixel finds its nearest edge pixel `e` through two sequential passes over its 8
//! neighbours, and its distance is the distance to `e` added to the edge distance of `e`.

use crate::error::{MaskError, Result};
use crate::mask::MaskBuffer;

/// The largest distance, in pixels, that an encoded distance field can represent.
pub const DISTANCE_FIELD_MAGNITUDE: f32 = 4.0;

/// The encoded value of the boundary.
pub const BOUNDARY_VALUE: u8 = 128;

const NO_SEED: u32 = u32::MAX;

/// Compute the signed distance of every pixel of `mask` to its boundary.
///
/// The result is in row-major order. A mask without any boundary gets `±(width + height)`
/// everywhere.
pub fn distance_field(mask: &MaskBuffer) -> Vec<f32> {
    let width = usize::from(mask.width());
    let height = usize::from(mask.height());
    let data = mask.data();
    let len = width * height;

    let inside = |idx: usize| data[idx] >= BOUNDARY_VALUE;

    // The estimated distance of each edge pixel to the boundary, and the index of the nearest
    // edge pixel for every pixel.
    let mut edge_distance = vec![0.0_f32; len];
    let mut seeds = vec![NO_SEED; len];

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let alpha = data[idx];
            let is_inside = inside(idx);

            let fractional = alpha != 0 && alpha != 255;
            let crosses = [(-1, 0), (1, 0), (0, -1), (0, 1)]
                .into_iter()
                .filter_map(|(dx, dy)| neighbour(x, y, dx, dy, width, height))
                .any(|n| inside(n) != is_inside);

            if fractional {
                edge_distance[idx] = 0.5 - f32::from(alpha) / 255.0;
                seeds[idx] = idx as u32;
            } else if crosses {
                edge_distance[idx] = if is_inside { -0.5 } else { 0.5 };
                seeds[idx] = idx as u32;
            }
        }
    }

    propagate(&mut seeds, width, height);

    let no_boundary = (width + height) as f32;
    (0..len)
        .map(|idx| {
            let sign = if inside(idx) { -1.0 } else { 1.0 };
            match seeds[idx] {
                NO_SEED => sign * no_boundary,
                seed => {
                    let seed = seed as usize;
                    let dist = distance(idx, seed, width).sqrt();
                    edge_distance[seed] + sign * dist
                }
            }
        })
        .collect()
}

/// Encode a signed distance as a byte.
///
/// The distance is pinned to `[-DISTANCE_FIELD_MAGNITUDE, DISTANCE_FIELD_MAGNITUDE * 127 / 128]`
/// and mapped so that [`BOUNDARY_VALUE`] is the boundary and larger values are inside.
pub fn encode_distance(dist: f32) -> u8 {
    let dist = (-dist).clamp(
        -DISTANCE_FIELD_MAGNITUDE,
        DISTANCE_FIELD_MAGNITUDE * 127.0 / 128.0,
    );
    ((dist + DISTANCE_FIELD_MAGNITUDE) / (2.0 * DISTANCE_FIELD_MAGNITUDE) * 256.0).round() as u8
}

/// Write the encoded distance field of `mask` into `out`.
///
/// `out` must hold exactly `width * height` bytes.
pub fn generate(mask: &MaskBuffer, out: &mut [u8]) -> Result<()> {
    let expected = usize::from(mask.width()) * usize::from(mask.height());
    if out.len() != expected {
        return Err(MaskError::BufferSizeMismatch {
            expected,
            actual: out.len(),
        });
    }

    for (byte, dist) in out.iter_mut().zip(distance_field(mask)) {
        *byte = encode_distance(dist);
    }

    Ok(())
}

fn neighbour(x: usize, y: usize, dx: isize, dy: isize, w: usize, h: usize) -> Option<usize> {
    let nx = x.checked_add_signed(dx).filter(|&nx| nx < w)?;
    let ny = y.checked_add_signed(dy).filter(|&ny| ny < h)?;
    Some(ny * w + nx)
}

fn distance(a: usize, b: usize, width: usize) -> f32 {
    let dx = (a % width) as f32 - (b % width) as f32;
    let dy = (a / width) as f32 - (b / width) as f32;
    dx * dx + dy * dy
}

/// Spread the nearest seed of every pixel to its neighbours, in a forward and a backward pass.
fn propagate(seeds: &mut [u32], width: usize, height: usize) {
    let relax = |seeds: &mut [u32], x: usize, y: usize, dx: isize, dy: isize| {
        let Some(n) = neighbour(x, y, dx, dy, width, height) else {
            return;
        };
        let candidate = seeds[n];
        if candidate == NO_SEED {
            return;
        }
        let idx = y * width + x;
        let current = seeds[idx];
        if current == NO_SEED
            || distance(idx, candidate as usize, width) < distance(idx, current as usize, width)
        {
            seeds[idx] = candidate;
        }
    };

    for y in 0..height {
        for x in 0..width {
            for (dx, dy) in [(-1, 0), (-1, -1), (0, -1), (1, -1)] {
                relax(seeds, x, y, dx, dy);
            }
        }
        for x in (0..width).rev() {
            relax(seeds, x, y, 1, 0);
        }
    }

    for y in (0..height).rev() {
        for x in (0..width).rev() {
            for (dx, dy) in [(1, 0), (1, 1), (0, 1), (-1, 1)] {
                relax(seeds, x, y, dx, dy);
            }
        }
        for x in 0..width {
            relax(seeds, x, y, -1, 0);
        }
    }
}
