// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The CPU-side accumulation surface of a mask.

use crate::error::{MaskError, Result};
use crate::peniko::color::PremulRgba8;

/// An 8-bit alpha buffer backed by [`u8`][core::u8].
///
/// The dimensions are fixed for the lifetime of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskBuffer {
    /// Width of the buffer in pixels.
    width: u16,
    /// Height of the buffer in pixels.
    height: u16,
    /// Coverage values in row-major order.
    data: Vec<u8>,
}

impl MaskBuffer {
    /// Try to allocate a new buffer with the given width and height in pixels.
    ///
    /// All pixels are initialized to 0. Returns [`MaskError::AllocationFailed`] if the memory
    /// can't be reserved.
    pub fn try_new(width: u16, height: u16) -> Result<Self> {
        let len = usize::from(width) * usize::from(height);
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| MaskError::AllocationFailed {
                width: u32::from(width),
                height: u32::from(height),
            })?;
        data.resize(len, 0);

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a new buffer with the given alpha data.
    ///
    /// The `data` vector must be of length `width * height` exactly.
    ///
    /// The pixels are in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if the `data` vector is not of length `width * height`.
    pub fn from_parts(data: Vec<u8>, width: u16, height: u16) -> Self {
        assert_eq!(
            data.len(),
            usize::from(width) * usize::from(height),
            "Expected `data` to have length of exactly `width * height`"
        );

        Self {
            width,
            height,
            data,
        }
    }

    /// Return the width of the buffer.
    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Return the height of the buffer.
    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Set every pixel to `alpha`.
    pub fn erase(&mut self, alpha: u8) {
        self.data.fill(alpha);
    }

    /// Returns a reference to the underlying alpha data, in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a mutable reference to the underlying alpha data, in row-major order.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns row `y` of the buffer.
    #[inline]
    pub fn row(&self, y: u16) -> &[u8] {
        let w = usize::from(self.width);
        &self.data[usize::from(y) * w..][..w]
    }

    /// Sample the value at a specific location.
    ///
    /// This function might panic or yield a wrong result if the location
    /// is out-of-bounds.
    #[inline(always)]
    pub fn sample(&self, x: u16, y: u16) -> u8 {
        debug_assert!(
            x < self.width && y < self.height,
            "cannot sample mask outside of its range"
        );

        self.data[usize::from(y) * usize::from(self.width) + usize::from(x)]
    }

    /// Expand the mask to premultiplied white, with the coverage as alpha.
    pub fn to_premul_rgba8(&self) -> Vec<PremulRgba8> {
        self.data
            .iter()
            .map(|&a| PremulRgba8 {
                r: a,
                g: a,
                b: a,
                a,
            })
            .collect()
    }

    /// Return the buffer as a grayscale PNG.
    #[cfg(feature = "png")]
    pub fn to_png(&self) -> core::result::Result<Vec<u8>, png::EncodingError> {
        let mut data = Vec::new();
        let mut encoder = png::Encoder::new(&mut data, self.width.into(), self.height.into());
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.data)?;
        writer.finish().map(|_| data)
    }
}

#[cfg(test)]
mod tests {
    use super::MaskBuffer;

    #[test]
    fn new_buffer_is_transparent() {
        let mask = MaskBuffer::try_new(3, 2).unwrap();
        assert_eq!(mask.data(), &[0; 6]);
        assert_eq!(mask.row(1).len(), 3);
    }

    #[test]
    fn premultiplied_expansion() {
        let mut mask = MaskBuffer::try_new(2, 1).unwrap();
        mask.data_mut()[1] = 77;
        let rgba = mask.to_premul_rgba8();
        assert_eq!(rgba[0].a, 0);
        assert_eq!((rgba[1].r, rgba[1].g, rgba[1].b, rgba[1].a), (77, 77, 77, 77));
    }
}
