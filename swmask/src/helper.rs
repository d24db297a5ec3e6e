// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generating masks in software and moving them to textures.

use crate::clip::RasterClip;
use crate::error::{MaskError, Result};
use crate::flatten::Line;
use crate::geometry::IntRect;
use crate::kurbo::{Affine, Rect};
use crate::mask::MaskBuffer;
use crate::op::{MaskOp, mul_255};
use crate::raster::{self, ALIASING_THRESHOLD, Rasterizer};
use crate::settings::MaskSettings;
use crate::shape::Shape;
use crate::target::{MaskCompositor, MaskedRectDraw, Paint, TargetClip, UserStencilSettings};
use crate::texture::{TextureDescriptor, TextureProvider};
use crate::{rect, sdf};
use core::fmt;
use log::{debug, warn};

/// The state of one mask generation session, created by [`SwMaskHelper::init`].
#[derive(Debug)]
struct Session {
    /// The device-space bounds of the mask.
    bounds: IntRect,
    /// Maps shape space to mask pixels.
    transform: Affine,
    mask: MaskBuffer,
    clip: RasterClip,
}

/// Generates coverage masks on the CPU and moves them to textures.
///
/// A helper goes through sessions: [`init`](Self::init) allocates a mask covering some
/// device-space bounds, draws combine shapes into it with [`MaskOp`]s, and
/// [`to_texture`](Self::to_texture) or [`to_sdf`](Self::to_sdf) consume the result. The mask
/// can then be cleared and reused, or the helper can be initialized again.
///
/// The helper borrows a [`TextureProvider`] for its whole lifetime. It never keeps any of the
/// textures it creates or writes to.
pub struct SwMaskHelper<'a, P: TextureProvider> {
    provider: &'a mut P,
    settings: MaskSettings,
    session: Option<Session>,
    rasterizer: Rasterizer,
    line_buf: Vec<Line>,
    /// Coverage of the shape being drawn, one value per mask pixel.
    coverage: Vec<u8>,
}

impl<P: TextureProvider> fmt::Debug for SwMaskHelper<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwMaskHelper")
            .field("settings", &self.settings)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<'a, P: TextureProvider> SwMaskHelper<'a, P> {
    /// Create a helper with default settings.
    pub fn new(provider: &'a mut P) -> Self {
        Self::with_settings(provider, MaskSettings::default())
    }

    /// Create a helper with custom settings.
    pub fn with_settings(provider: &'a mut P, settings: MaskSettings) -> Self {
        Self {
            provider,
            settings,
            session: None,
            rasterizer: Rasterizer::new(),
            line_buf: Vec::new(),
            coverage: Vec::new(),
        }
    }

    /// The settings of the helper.
    pub fn settings(&self) -> &MaskSettings {
        &self.settings
    }

    /// Start a new session with a transparent mask covering `result_bounds`.
    ///
    /// Shapes drawn afterwards are mapped through `transform` (identity if `None`) into device
    /// space; the mask pixel `(0, 0)` corresponds to the device pixel at the top-left corner of
    /// `result_bounds`. The clip is reset to the whole mask.
    ///
    /// Fails with [`MaskError::EmptyBounds`] if the bounds have no area, and with
    /// [`MaskError::AllocationFailed`] if they are larger than
    /// [`MaskSettings::max_dimension`] or the mask can't be allocated.
    pub fn init(&mut self, result_bounds: IntRect, transform: Option<Affine>) -> Result<()> {
        if result_bounds.is_empty() {
            return Err(MaskError::EmptyBounds);
        }

        let (width, height) = (result_bounds.width(), result_bounds.height());
        let max_dimension = self.settings.max_dimension.min(u32::from(u16::MAX));
        if width > max_dimension || height > max_dimension {
            warn!("Mask of {width}x{height} exceeds the maximum dimension of {max_dimension}");
            return Err(MaskError::AllocationFailed { width, height });
        }
        let (width, height) = (width as u16, height as u16);

        // Reuse the previous buffer if it has the right size.
        let mask = match self.session.take() {
            Some(Session { mut mask, .. })
                if mask.width() == width && mask.height() == height =>
            {
                mask.erase(0);
                mask
            }
            _ => MaskBuffer::try_new(width, height).inspect_err(|_| {
                warn!("Failed to allocate a {width}x{height} mask");
            })?,
        };

        let translate = Affine::translate((
            -f64::from(result_bounds.x0),
            -f64::from(result_bounds.y0),
        ));
        debug!("Initialized a {width}x{height} mask at {result_bounds:?}");
        self.session = Some(Session {
            bounds: result_bounds,
            transform: translate * transform.unwrap_or(Affine::IDENTITY),
            mask,
            clip: RasterClip::new(width, height),
        });

        Ok(())
    }

    /// The device-space bounds of the current session.
    pub fn bounds(&self) -> Option<IntRect> {
        self.session.as_ref().map(|session| session.bounds)
    }

    /// The mask of the current session.
    pub fn mask(&self) -> Option<&MaskBuffer> {
        self.session.as_ref().map(|session| &session.mask)
    }

    /// Draw a rectangle into the mask.
    ///
    /// The rectangle is mapped through the session transform. Its coverage, scaled by `alpha`,
    /// is combined with the mask according to `op` inside the clip.
    pub fn draw_rect(&mut self, rect: Rect, op: MaskOp, anti_alias: bool, alpha: u8) {
        self.draw_shape(&Shape::from_rect(rect), op, anti_alias, alpha);
    }

    /// Draw a shape into the mask.
    ///
    /// The shape is mapped through the session transform. Its coverage, scaled by `alpha`, is
    /// combined with the mask according to `op` inside the clip. Operations that change pixels
    /// the shape doesn't cover ([`MaskOp::Intersect`], [`MaskOp::ReverseDifference`] and
    /// [`MaskOp::Replace`]) affect every pixel inside the clip.
    pub fn draw_shape(&mut self, shape: &Shape, op: MaskOp, anti_alias: bool, alpha: u8) {
        if !self.expect_session("draw_shape") {
            return;
        }
        let covered = self.rasterize(shape, anti_alias);

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let region = if op.preserves_uncovered() {
            match covered {
                Some(covered) => covered.intersect(&session.clip.bounds()),
                None => return,
            }
        } else {
            session.clip.bounds()
        };
        if region.is_empty() {
            return;
        }

        let width = usize::from(session.mask.width());
        let clip_x0 = session.clip.bounds().x0;
        let data = session.mask.data_mut();
        for y in region.y0..region.y1 {
            let row = y as usize * width;
            let clip_row = session.clip.row_coverage(y);
            for x in region.x0..region.x1 {
                let idx = row + x as usize;
                let src = mul_255(self.coverage[idx], alpha);
                let clip = clip_row.map_or(255, |clip_row| clip_row[(x - clip_x0) as usize]);
                data[idx] = op.apply_clipped(src, data[idx], clip);
            }
        }
    }

    /// Set every pixel of the mask to `alpha`, ignoring the clip.
    pub fn clear(&mut self, alpha: u8) {
        if !self.expect_session("clear") {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.mask.erase(alpha);
        }
    }

    /// Intersect the clip with a rectangle mapped through the session transform.
    pub fn clip_rect(&mut self, rect: Rect, anti_alias: bool) {
        self.clip_shape(&Shape::from_rect(rect), anti_alias);
    }

    /// Intersect the clip with a shape mapped through the session transform.
    ///
    /// The clip can only shrink until it is reset.
    pub fn clip_shape(&mut self, shape: &Shape, anti_alias: bool) {
        if !self.expect_session("clip_shape") {
            return;
        }
        let covered = self.rasterize(shape, anti_alias);

        let Some(session) = self.session.as_mut() else {
            return;
        };
        match covered {
            Some(covered) => session.clip.intersect_coverage(covered, &self.coverage),
            None => session.clip.intersect_rect(IntRect::EMPTY),
        }
    }

    /// Reset the clip to the whole mask.
    pub fn reset_clip(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.clip.reset();
        }
    }

    /// Create a texture the mask fits into, sized according to [`MaskSettings::texture_fit`].
    ///
    /// Returns `None` before [`init`](Self::init) or if the provider can't create the texture.
    pub fn create_texture(&mut self) -> Option<P::Texture> {
        let session = self.session.as_ref()?;
        let max_size = self.provider.max_texture_size();
        let fit = self.settings.texture_fit;
        let desc = TextureDescriptor {
            width: fit.fit(u32::from(session.mask.width()), max_size),
            height: fit.fit(u32::from(session.mask.height()), max_size),
            format: self.settings.texture_format,
        };

        let texture = self.provider.create_texture(&desc);
        if texture.is_none() {
            warn!(
                "Failed to create a {}x{} mask texture",
                desc.width, desc.height
            );
        }
        texture
    }

    /// Write the mask into the top-left corner of `texture`.
    ///
    /// Fails with [`MaskError::TextureTooSmall`] if the mask doesn't fit into the texture.
    pub fn to_texture(&mut self, texture: &mut P::Texture) -> Result<()> {
        let session = self.session.as_ref().ok_or(MaskError::Uninitialized)?;
        let (width, height) = (
            u32::from(session.mask.width()),
            u32::from(session.mask.height()),
        );
        let (texture_width, texture_height) = self.provider.texture_size(texture);
        if width > texture_width || height > texture_height {
            return Err(MaskError::TextureTooSmall {
                width,
                height,
                texture_width,
                texture_height,
            });
        }

        debug!("Uploading a {width}x{height} mask into a {texture_width}x{texture_height} texture");
        self.provider.write_pixels(texture, &session.mask);
        Ok(())
    }

    /// Write the encoded signed distance field of the mask into `out`.
    ///
    /// `out` must hold one byte per mask pixel, see [`sdf::generate`].
    pub fn to_sdf(&self, out: &mut [u8]) -> Result<()> {
        let session = self.session.as_ref().ok_or(MaskError::Uninitialized)?;
        sdf::generate(&session.mask, out)
    }

    /// Render `shape` into a new texture.
    ///
    /// The mask covers `result_bounds` in device space, after mapping the shape through
    /// `transform`. Returns `None` if the bounds are empty, the mask can't be allocated or the
    /// texture can't be created.
    pub fn draw_shape_mask_to_texture(
        provider: &'a mut P,
        shape: &Shape,
        result_bounds: IntRect,
        anti_alias: bool,
        transform: Option<Affine>,
    ) -> Option<P::Texture> {
        let mut helper = Self::new(provider);
        if let Err(err) = helper.init(result_bounds, transform) {
            debug!("Not drawing shape mask: {err}");
            return None;
        }
        helper.draw_shape(shape, MaskOp::Replace, anti_alias, 0xFF);

        let mut texture = helper.create_texture()?;
        helper.to_texture(&mut texture).ok()?;
        Some(texture)
    }

    fn expect_session(&self, operation: &str) -> bool {
        let initialized = self.session.is_some();
        debug_assert!(initialized, "`{operation}` called before `init`");
        if !initialized {
            warn!("Ignoring `{operation}` on an uninitialized mask");
        }
        initialized
    }

    /// Rasterize the coverage of `shape` into `self.coverage`.
    ///
    /// Returns the pixels that may be covered, or `None` if the shape misses the mask.
    fn rasterize(&mut self, shape: &Shape, anti_alias: bool) -> Option<IntRect> {
        let Self {
            settings,
            session,
            rasterizer,
            line_buf,
            coverage,
            ..
        } = self;
        let session = session.as_ref()?;
        let (width, height) = (session.mask.width(), session.mask.height());
        coverage.resize(usize::from(width) * usize::from(height), 0);
        let aliasing_threshold = (!anti_alias).then_some(ALIASING_THRESHOLD);

        let covered = match shape.as_rect() {
            Some(r) if rect::is_axis_aligned(&session.transform) => rect::render(
                session.transform.transform_rect_bbox(r),
                width,
                height,
                aliasing_threshold,
                coverage,
            ),
            _ => {
                line_buf.clear();
                shape.flatten(session.transform, settings.tolerance, line_buf);
                rasterizer.render(
                    line_buf,
                    width,
                    height,
                    shape.fill_rule(),
                    aliasing_threshold,
                    coverage,
                );
                raster::coverage_bounds(line_buf, width, height)
            }
        };

        if shape.is_inverse() {
            for c in coverage.iter_mut() {
                *c = 255 - *c;
            }
            return Some(IntRect::from_wh(u32::from(width), u32::from(height)));
        }

        covered
    }
}

/// Fill the device rectangle `rect` of `target` with `paint`, using `texture` as coverage mask.
///
/// The mask's top-left texel maps to the top-left corner of `rect`. `view_matrix` is the
/// transform that was used to draw the mask; the paint is evaluated in the local coordinates it
/// maps from. Nothing is drawn if `view_matrix` can't be inverted.
pub fn draw_to_target_with_shape_mask<C: MaskCompositor>(
    texture: &C::Texture,
    target: &mut C,
    paint: Paint,
    stencil: &UserStencilSettings,
    clip: &TargetClip,
    view_matrix: Affine,
    rect: IntRect,
) {
    let det = view_matrix.determinant();
    if det == 0.0 || !det.is_finite() {
        debug!("Not drawing a shape mask with a singular view matrix");
        return;
    }

    let mask_matrix = Affine::translate((-f64::from(rect.x0), -f64::from(rect.y0)));
    target.fill_rect_with_mask(&MaskedRectDraw {
        rect: rect.to_rect(),
        local_matrix: view_matrix.inverse(),
        mask: texture,
        mask_matrix,
        paint,
        stencil: *stencil,
        clip: *clip,
    });
}

#[cfg(test)]
mod tests {
    use super::SwMaskHelper;
    use crate::geometry::IntRect;
    use crate::kurbo::{Affine, Point, Rect};
    use crate::op::MaskOp;
    use crate::texture::CpuTextureProvider;

    #[test]
    fn init_rejects_empty_and_oversized_bounds() {
        let mut provider = CpuTextureProvider::new();
        let mut helper = SwMaskHelper::new(&mut provider);
        assert_eq!(
            helper.init(IntRect::new(5, 5, 5, 10), None),
            Err(crate::MaskError::EmptyBounds)
        );
        assert_eq!(
            helper.init(IntRect::from_xywh(0, 0, 70_000, 1), None),
            Err(crate::MaskError::AllocationFailed {
                width: 70_000,
                height: 1
            })
        );
        assert!(helper.mask().is_none());
    }

    #[test]
    fn bounds_origin_maps_to_the_first_pixel() {
        let mut provider = CpuTextureProvider::new();
        let mut helper = SwMaskHelper::new(&mut provider);
        helper.init(IntRect::new(10, 20, 14, 24), None).unwrap();
        helper.draw_rect(Rect::new(10.0, 20.0, 11.0, 21.0), MaskOp::Union, true, 0xFF);

        let mask = helper.mask().unwrap();
        assert_eq!(mask.sample(0, 0), 255);
        assert_eq!(mask.data().iter().filter(|&&a| a != 0).count(), 1);
    }

    #[test]
    fn transform_is_applied_before_the_bounds_offset() {
        let mut provider = CpuTextureProvider::new();
        let mut helper = SwMaskHelper::new(&mut provider);
        helper
            .init(IntRect::new(4, 4, 8, 8), Some(Affine::scale(2.0)))
            .unwrap();
        helper.draw_rect(Rect::new(2.0, 2.0, 3.0, 3.0), MaskOp::Replace, true, 0xFF);

        let mask = helper.mask().unwrap();
        assert_eq!(mask.sample(0, 0), 255);
        assert_eq!(mask.sample(1, 1), 255);
        assert_eq!(mask.sample(2, 2), 0);
    }

    #[test]
    fn rotated_rects_use_the_path_pipeline() {
        let mut provider = CpuTextureProvider::new();
        let mut helper = SwMaskHelper::new(&mut provider);
        let rotate = Affine::rotate_about(core::f64::consts::FRAC_PI_2, Point::new(5.0, 5.0));
        helper.init(IntRect::from_wh(10, 10), Some(rotate)).unwrap();
        helper.draw_rect(Rect::new(0.0, 0.0, 5.0, 10.0), MaskOp::Replace, true, 0xFF);

        let mask = helper.mask().unwrap();
        // The left half rotates into the top half.
        assert_eq!(mask.sample(5, 2), 255);
        assert_eq!(mask.sample(5, 7), 0);
    }

    #[test]
    fn alpha_scales_coverage() {
        let mut provider = CpuTextureProvider::new();
        let mut helper = SwMaskHelper::new(&mut provider);
        helper.init(IntRect::from_wh(4, 4), None).unwrap();
        helper.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), MaskOp::Replace, false, 0x80);
        assert!(helper.mask().unwrap().data().iter().all(|&a| a == 0x80));
    }

    #[test]
    fn reinit_starts_a_fresh_session() {
        let mut provider = CpuTextureProvider::new();
        let mut helper = SwMaskHelper::new(&mut provider);
        helper.init(IntRect::from_wh(4, 4), None).unwrap();
        helper.clear(0xFF);
        helper.clip_rect(Rect::new(0.0, 0.0, 1.0, 1.0), false);

        helper.init(IntRect::from_wh(4, 4), None).unwrap();
        assert!(helper.mask().unwrap().data().iter().all(|&a| a == 0));
        helper.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), MaskOp::Replace, false, 0xFF);
        assert!(helper.mask().unwrap().data().iter().all(|&a| a == 0xFF));
    }

    #[test]
    fn uninitialized_consumers_fail() {
        let mut provider = CpuTextureProvider::new();
        let mut helper = SwMaskHelper::new(&mut provider);
        assert!(helper.create_texture().is_none());
        assert_eq!(
            helper.to_sdf(&mut []),
            Err(crate::MaskError::Uninitialized)
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "`draw_shape` called before `init`")]
    fn drawing_before_init_panics_in_debug_builds() {
        let mut provider = CpuTextureProvider::new();
        let mut helper = SwMaskHelper::new(&mut provider);
        helper.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), MaskOp::Union, true, 0xFF);
    }
}
