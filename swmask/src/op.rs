// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Boolean region operations on coverage.

use crate::peniko::Compose;

/// How the coverage of a new shape is combined with the coverage already in a mask.
///
/// The operations follow region algebra, evaluated per pixel on normalized coverage. With `s`
/// the coverage of the new shape (scaled by its alpha) and `d` the existing coverage:
///
/// | op                  | result                    |
/// |---------------------|---------------------------|
/// | `Difference`        | `d · (1 − s)`             |
/// | `Intersect`         | `d · s`                   |
/// | `Union`             | `d + s · (1 − d)`         |
/// | `Xor`               | `s · (1 − d) + d · (1 − s)` |
/// | `ReverseDifference` | `s · (1 − d)`             |
/// | `Replace`           | `s`                       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskOp {
    /// Subtract the shape from the mask.
    Difference,
    /// Keep only the parts of the mask covered by the shape.
    Intersect,
    /// Add the shape to the mask.
    Union,
    /// Keep the parts covered by exactly one of the mask and the shape.
    Xor,
    /// Subtract the mask from the shape.
    ReverseDifference,
    /// Replace the mask with the shape.
    Replace,
}

impl MaskOp {
    /// All operations.
    pub const ALL: [Self; 6] = [
        Self::Difference,
        Self::Intersect,
        Self::Union,
        Self::Xor,
        Self::ReverseDifference,
        Self::Replace,
    ];

    /// The Porter-Duff composition mode that implements this operation on alpha.
    pub fn compose(self) -> Compose {
        match self {
            Self::Difference => Compose::DestOut,
            Self::Intersect => Compose::DestIn,
            Self::Union => Compose::SrcOver,
            Self::Xor => Compose::Xor,
            Self::ReverseDifference => Compose::SrcOut,
            Self::Replace => Compose::Copy,
        }
    }

    /// Whether a pixel the shape doesn't cover keeps its value.
    ///
    /// For the other operations, every pixel inside the clip has to be visited.
    pub fn preserves_uncovered(self) -> bool {
        matches!(self, Self::Difference | Self::Union | Self::Xor)
    }

    /// Combine the source coverage `src` with the existing coverage `dst`.
    #[inline(always)]
    pub fn apply(self, src: u8, dst: u8) -> u8 {
        match self {
            Self::Difference => mul_255(dst, 255 - src),
            Self::Intersect => mul_255(dst, src),
            Self::Union => dst + mul_255(src, 255 - dst),
            Self::Xor => mul_255(src, 255 - dst).saturating_add(mul_255(dst, 255 - src)),
            Self::ReverseDifference => mul_255(src, 255 - dst),
            Self::Replace => src,
        }
    }

    /// Combine `src` with `dst`, where the pixel is only partially inside the clip.
    ///
    /// The result is interpolated between the old value and the combined value by `clip`.
    #[inline(always)]
    pub fn apply_clipped(self, src: u8, dst: u8, clip: u8) -> u8 {
        match clip {
            0 => dst,
            255 => self.apply(src, dst),
            _ => lerp(dst, self.apply(src, dst), clip),
        }
    }
}

/// Multiply two normalized `u8` values, rounding to nearest.
#[inline(always)]
pub fn mul_255(a: u8, b: u8) -> u8 {
    let t = u32::from(a) * u32::from(b) + 128;
    ((t + (t >> 8)) >> 8) as u8
}

/// Interpolate between `a` and `b` by `t / 255`.
#[inline(always)]
pub fn lerp(a: u8, b: u8, t: u8) -> u8 {
    mul_255(a, 255 - t) + mul_255(b, t)
}

#[cfg(test)]
mod tests {
    use super::{MaskOp, lerp, mul_255};

    #[test]
    fn mul_255_is_exact_at_the_extremes() {
        assert_eq!(mul_255(255, 255), 255);
        assert_eq!(mul_255(255, 0), 0);
        assert_eq!(mul_255(255, 128), 128);
        assert_eq!(mul_255(128, 128), 64);
    }

    #[test]
    fn binary_coverage_follows_region_algebra() {
        for op in MaskOp::ALL {
            for (s, d) in [(0, 0), (0, 255), (255, 0), (255, 255)] {
                let (s_in, d_in) = (s == 255, d == 255);
                let expected = match op {
                    MaskOp::Difference => d_in && !s_in,
                    MaskOp::Intersect => d_in && s_in,
                    MaskOp::Union => d_in || s_in,
                    MaskOp::Xor => d_in != s_in,
                    MaskOp::ReverseDifference => s_in && !d_in,
                    MaskOp::Replace => s_in,
                };
                assert_eq!(
                    op.apply(s, d),
                    if expected { 255 } else { 0 },
                    "{op:?} with s = {s}, d = {d}"
                );
            }
        }
    }

    #[test]
    fn uncovered_pixels() {
        for op in MaskOp::ALL {
            let unchanged = op.apply(0, 200) == 200;
            assert_eq!(unchanged, op.preserves_uncovered(), "{op:?}");
        }
    }

    #[test]
    fn union_never_overflows() {
        for s in 0..=255 {
            for d in (0..=255).step_by(5) {
                let _ = MaskOp::Union.apply(s, d);
                let _ = MaskOp::Xor.apply(s, d);
            }
        }
    }

    #[test]
    fn partial_clip_interpolates() {
        assert_eq!(MaskOp::Replace.apply_clipped(255, 0, 0), 0);
        assert_eq!(MaskOp::Replace.apply_clipped(255, 0, 128), 128);
        assert_eq!(lerp(0, 255, 255), 255);
        assert_eq!(lerp(100, 100, 77), 100);
    }
}
