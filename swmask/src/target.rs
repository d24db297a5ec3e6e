// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render targets that masks are composited into.

use crate::geometry::IntRect;
use crate::kurbo::{Affine, Point, Rect};
use crate::op::mul_255;
use crate::peniko::Color;
use crate::peniko::color::PremulRgba8;
use crate::texture::CpuTexture;

/// A solid paint.
///
/// Paints are composited with source-over blending.
#[derive(Debug, Clone, Copy)]
pub struct Paint {
    /// The color of the paint.
    pub color: Color,
}

impl Paint {
    /// A paint with a solid color.
    pub fn solid(color: Color) -> Self {
        Self { color }
    }
}

/// A device clip applied by a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetClip {
    /// Draw everywhere.
    #[default]
    None,
    /// Only draw inside a pixel rectangle.
    Rect(IntRect),
}

impl TargetClip {
    fn bounds(&self, full: IntRect) -> IntRect {
        match self {
            Self::None => full,
            Self::Rect(rect) => full.intersect(rect),
        }
    }
}

/// A comparison between the stencil reference and the stored stencil value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// The test never passes.
    Never,
    /// Passes if the reference is less than the stored value.
    Less,
    /// Passes if the reference equals the stored value.
    Equal,
    /// Passes if the reference is less than or equal to the stored value.
    LessEqual,
    /// Passes if the reference is greater than the stored value.
    Greater,
    /// Passes if the reference differs from the stored value.
    NotEqual,
    /// Passes if the reference is greater than or equal to the stored value.
    GreaterEqual,
    /// The test always passes.
    Always,
}

impl CompareFunction {
    fn passes(self, reference: u8, stored: u8) -> bool {
        match self {
            Self::Never => false,
            Self::Less => reference < stored,
            Self::Equal => reference == stored,
            Self::LessEqual => reference <= stored,
            Self::Greater => reference > stored,
            Self::NotEqual => reference != stored,
            Self::GreaterEqual => reference >= stored,
            Self::Always => true,
        }
    }
}

/// How the stored stencil value changes after the stencil test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    /// Keep the stored value.
    Keep,
    /// Set the stored value to 0.
    Zero,
    /// Set the stored value to the reference.
    Replace,
    /// Invert the bits of the stored value.
    Invert,
    /// Increment the stored value, saturating at 255.
    IncrementClamp,
    /// Decrement the stored value, saturating at 0.
    DecrementClamp,
}

/// Stencil state for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserStencilSettings {
    /// The comparison that decides whether a pixel is drawn.
    pub compare: CompareFunction,
    /// The reference value.
    pub reference: u8,
    /// Bits of the reference and the stored value taking part in the comparison.
    pub read_mask: u8,
    /// Bits of the stored value that stencil operations may change.
    pub write_mask: u8,
    /// Applied to pixels passing the test.
    pub pass_op: StencilOp,
    /// Applied to pixels failing the test.
    pub fail_op: StencilOp,
}

impl UserStencilSettings {
    /// Stencil state that neither tests nor modifies the stencil.
    pub const UNUSED: Self = Self {
        compare: CompareFunction::Always,
        reference: 0,
        read_mask: 0xFF,
        write_mask: 0xFF,
        pass_op: StencilOp::Keep,
        fail_op: StencilOp::Keep,
    };

    /// Run the stencil test against `stored` and update it.
    ///
    /// Returns whether the pixel passed.
    pub fn test_and_update(&self, stored: &mut u8) -> bool {
        let passed = self
            .compare
            .passes(self.reference & self.read_mask, *stored & self.read_mask);
        let op = if passed { self.pass_op } else { self.fail_op };
        let updated = match op {
            StencilOp::Keep => *stored,
            StencilOp::Zero => 0,
            StencilOp::Replace => self.reference,
            StencilOp::Invert => !*stored,
            StencilOp::IncrementClamp => stored.saturating_add(1),
            StencilOp::DecrementClamp => stored.saturating_sub(1),
        };
        *stored = (*stored & !self.write_mask) | (updated & self.write_mask);
        passed
    }
}

impl Default for UserStencilSettings {
    fn default() -> Self {
        Self::UNUSED
    }
}

/// A rectangle fill whose coverage is modulated by a mask texture.
#[derive(Debug)]
pub struct MaskedRectDraw<'a, T> {
    /// The rectangle to fill, in device space. Pixels are filled if their center lies inside.
    pub rect: Rect,
    /// Maps device space to the local space of the paint.
    ///
    /// Solid paints don't depend on it, so [`SoftwareTarget`] ignores it.
    pub local_matrix: Affine,
    /// The mask texture.
    pub mask: &'a T,
    /// Maps device space to texel coordinates of the mask.
    pub mask_matrix: Affine,
    /// The paint.
    pub paint: Paint,
    /// Stencil state.
    pub stencil: UserStencilSettings,
    /// Device clip.
    pub clip: TargetClip,
}

/// A render target that can fill rectangles through a mask texture.
pub trait MaskCompositor {
    /// The kind of texture masks are sampled from.
    type Texture;

    /// Fill `draw.rect` with `draw.paint`, multiplying the coverage of every pixel with the
    /// mask texel it maps to. Texels outside of the texture count as transparent.
    fn fill_rect_with_mask(&mut self, draw: &MaskedRectDraw<'_, Self::Texture>);
}

/// A render target in main memory, with premultiplied RGBA8 pixels and an 8-bit stencil.
#[derive(Debug, Clone)]
pub struct SoftwareTarget {
    width: u16,
    height: u16,
    pixels: Vec<PremulRgba8>,
    stencil: Vec<u8>,
}

impl SoftwareTarget {
    /// Create a transparent target with a zeroed stencil.
    pub fn new(width: u16, height: u16) -> Self {
        let len = usize::from(width) * usize::from(height);
        Self {
            width,
            height,
            pixels: vec![PremulRgba8::from_u32(0); len],
            stencil: vec![0; len],
        }
    }

    /// Return the width of the target.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Return the height of the target.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The pixels of the target, in row-major order.
    pub fn pixels(&self) -> &[PremulRgba8] {
        &self.pixels
    }

    /// The pixel at `(x, y)`.
    pub fn pixel(&self, x: u16, y: u16) -> PremulRgba8 {
        self.pixels[self.index(x, y)]
    }

    /// The stencil value at `(x, y)`.
    pub fn stencil(&self, x: u16, y: u16) -> u8 {
        self.stencil[self.index(x, y)]
    }

    /// Set the stencil value of every pixel in `rect` to `value`.
    pub fn fill_stencil(&mut self, rect: IntRect, value: u8) {
        let rect = rect.intersect(&self.full());
        for y in rect.y0..rect.y1 {
            let row = y as usize * usize::from(self.width);
            self.stencil[row + rect.x0 as usize..row + rect.x1 as usize].fill(value);
        }
    }

    /// Return the target as an RGBA PNG.
    #[cfg(feature = "png")]
    pub fn to_png(&self) -> Result<Vec<u8>, png::EncodingError> {
        let mut data = Vec::new();
        let mut encoder = png::Encoder::new(&mut data, self.width.into(), self.height.into());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(bytemuck::cast_slice(&self.pixels))?;
        writer.finish().map(|_| data)
    }

    fn full(&self) -> IntRect {
        IntRect::from_wh(u32::from(self.width), u32::from(self.height))
    }

    fn index(&self, x: u16, y: u16) -> usize {
        usize::from(y) * usize::from(self.width) + usize::from(x)
    }
}

impl MaskCompositor for SoftwareTarget {
    type Texture = CpuTexture;

    fn fill_rect_with_mask(&mut self, draw: &MaskedRectDraw<'_, CpuTexture>) {
        // Pixel rows and columns whose centers lie in the rect.
        let rect = draw.rect.abs();
        let covered = IntRect::new(
            (rect.x0 - 0.5).ceil() as i32,
            (rect.y0 - 0.5).ceil() as i32,
            (rect.x1 - 0.5).ceil() as i32,
            (rect.y1 - 0.5).ceil() as i32,
        );
        let region = draw.clip.bounds(self.full()).intersect(&covered);
        if region.is_empty() {
            return;
        }

        let paint = draw.paint.color.premultiply().to_rgba8();
        let (mask_width, mask_height) = (draw.mask.width(), draw.mask.height());
        let width = usize::from(self.width);

        for y in region.y0..region.y1 {
            for x in region.x0..region.x1 {
                let idx = y as usize * width + x as usize;
                if !draw.stencil.test_and_update(&mut self.stencil[idx]) {
                    continue;
                }

                let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                let texel = draw.mask_matrix * center;
                let (tx, ty) = (texel.x.floor(), texel.y.floor());
                let coverage = if tx >= 0.0
                    && ty >= 0.0
                    && tx < f64::from(mask_width)
                    && ty < f64::from(mask_height)
                {
                    draw.mask.texel(tx as u32, ty as u32)
                } else {
                    0
                };
                if coverage == 0 {
                    continue;
                }

                self.pixels[idx] = src_over(scale(paint, coverage), self.pixels[idx]);
            }
        }
    }
}

fn scale(color: PremulRgba8, coverage: u8) -> PremulRgba8 {
    PremulRgba8 {
        r: mul_255(color.r, coverage),
        g: mul_255(color.g, coverage),
        b: mul_255(color.b, coverage),
        a: mul_255(color.a, coverage),
    }
}

fn src_over(src: PremulRgba8, dst: PremulRgba8) -> PremulRgba8 {
    let inv = 255 - src.a;
    PremulRgba8 {
        r: src.r.saturating_add(mul_255(dst.r, inv)),
        g: src.g.saturating_add(mul_255(dst.g, inv)),
        b: src.b.saturating_add(mul_255(dst.b, inv)),
        a: src.a + mul_255(dst.a, inv),
    }
}
