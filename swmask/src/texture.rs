// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Textures that finished masks are uploaded to.
//!
//! Mask generation doesn't own any device memory. Instead, it asks a [`TextureProvider`] for
//! textures and for uploads into them. This module also contains [`CpuTextureProvider`], a
//! provider with reference-counted textures in main memory, which is useful for software
//! rendering and for testing.

use crate::mask::MaskBuffer;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The smallest size of an approximately fitting texture.
const MIN_APPROX_SIZE: u32 = 16;
/// Up to this size, approximately fitting textures are sized to powers of two.
const APPROX_POW2_LIMIT: u32 = 1024;

/// The pixel format of a mask texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// One 8-bit coverage value per texel.
    Alpha8,
    /// Premultiplied 8-bit RGBA texels. Masks are expanded to white with the coverage as alpha.
    Rgba8,
}

impl TextureFormat {
    /// The size of one texel in bytes.
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Self::Alpha8 => 1,
            Self::Rgba8 => 4,
        }
    }
}

/// How closely a texture's size matches the mask it is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFit {
    /// The texture has exactly the size of the mask.
    Exact,
    /// The texture may be larger than the mask, so that it can be reused for other masks of a
    /// similar size.
    Approx,
}

impl TextureFit {
    /// The texture dimension used for a mask dimension of `value`, where textures can't exceed
    /// `max_size`.
    pub fn fit(self, value: u32, max_size: u32) -> u32 {
        match self {
            Self::Exact => value,
            Self::Approx => {
                let approx = approx_size(value);
                if approx > max_size && value <= max_size {
                    value
                } else {
                    approx
                }
            }
        }
    }
}

/// Round `value` up to a size that is likely to be reused.
///
/// Sizes are rounded up to the next power of two, at least 16. Above 1024, sizes halfway between
/// two powers of two are used as well, to limit the amount of wasted memory.
pub fn approx_size(value: u32) -> u32 {
    let value = value.max(MIN_APPROX_SIZE);
    let Some(ceil_pow2) = value.checked_next_power_of_two() else {
        return value;
    };
    if value <= APPROX_POW2_LIMIT {
        return ceil_pow2;
    }

    let floor_pow2 = ceil_pow2 >> 1;
    let mid = floor_pow2 + (floor_pow2 >> 1);
    if value <= mid {
        mid
    } else {
        ceil_pow2
    }
}

/// A request for a new texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// The width in texels.
    pub width: u32,
    /// The height in texels.
    pub height: u32,
    /// The texel format.
    pub format: TextureFormat,
}

/// A factory and uploader for the textures that hold finished masks.
///
/// Mask generation only borrows the provider; the textures it creates are owned by the caller.
pub trait TextureProvider {
    /// A handle to a texture.
    type Texture;

    /// The largest width or height of a texture.
    fn max_texture_size(&self) -> u32;

    /// Create a texture.
    ///
    /// The initial contents of the texture are unspecified. Returns `None` if the texture
    /// couldn't be created.
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Option<Self::Texture>;

    /// The width and height of `texture`, in texels.
    fn texture_size(&self, texture: &Self::Texture) -> (u32, u32);

    /// Write the contents of `mask` into the top-left corner of `texture`.
    ///
    /// The texture must be at least as large as the mask. Texels outside of the mask keep their
    /// contents.
    fn write_pixels(&mut self, texture: &mut Self::Texture, mask: &MaskBuffer);
}

#[derive(Debug)]
struct TextureRepr {
    width: u32,
    height: u32,
    format: TextureFormat,
    data: Vec<u8>,
    /// The byte count of all live textures of the provider this texture came from.
    live_bytes: Arc<AtomicUsize>,
}

impl Clone for TextureRepr {
    fn clone(&self) -> Self {
        self.live_bytes.fetch_add(self.data.len(), Ordering::Relaxed);
        Self {
            width: self.width,
            height: self.height,
            format: self.format,
            data: self.data.clone(),
            live_bytes: self.live_bytes.clone(),
        }
    }
}

impl Drop for TextureRepr {
    fn drop(&mut self) {
        self.live_bytes.fetch_sub(self.data.len(), Ordering::Relaxed);
    }
}

impl PartialEq for TextureRepr {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.format == other.format
            && self.data == other.data
    }
}

impl Eq for TextureRepr {}

/// A reference-counted texture in main memory.
///
/// Cloning the handle is cheap. Writing to a texture whose handle has been cloned copies the
/// texels first, so other handles keep seeing the old contents. The copy counts towards the
/// budget of the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuTexture(Arc<TextureRepr>);

impl CpuTexture {
    /// Return the width of the texture.
    pub fn width(&self) -> u32 {
        self.0.width
    }

    /// Return the height of the texture.
    pub fn height(&self) -> u32 {
        self.0.height
    }

    /// Return the format of the texture.
    pub fn format(&self) -> TextureFormat {
        self.0.format
    }

    /// Returns the raw texel data, in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    /// The coverage stored at `(x, y)`.
    ///
    /// For [`TextureFormat::Rgba8`] textures, this is the alpha channel.
    ///
    /// # Panics
    ///
    /// Panics if the location is out of bounds.
    pub fn texel(&self, x: u32, y: u32) -> u8 {
        assert!(
            x < self.0.width && y < self.0.height,
            "cannot sample texture outside of its range"
        );
        let idx = (y as usize * self.0.width as usize + x as usize)
            * self.0.format.bytes_per_texel() as usize;
        match self.0.format {
            TextureFormat::Alpha8 => self.0.data[idx],
            TextureFormat::Rgba8 => self.0.data[idx + 3],
        }
    }

    /// The number of handles to this texture.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    fn write_mask(&mut self, mask: &MaskBuffer) {
        let repr = Arc::make_mut(&mut self.0);
        debug_assert!(
            u32::from(mask.width()) <= repr.width && u32::from(mask.height()) <= repr.height,
            "mask doesn't fit into the texture"
        );

        let bpp = repr.format.bytes_per_texel() as usize;
        let texture_stride = repr.width as usize * bpp;
        let mask_stride = usize::from(mask.width()) * bpp;
        let expanded;
        let src: &[u8] = match repr.format {
            TextureFormat::Alpha8 => mask.data(),
            TextureFormat::Rgba8 => {
                expanded = mask.to_premul_rgba8();
                bytemuck::cast_slice(&expanded)
            }
        };

        for (dst, src) in repr
            .data
            .chunks_exact_mut(texture_stride)
            .zip(src.chunks_exact(mask_stride))
        {
            dst[..mask_stride].copy_from_slice(src);
        }
    }
}

/// A [`TextureProvider`] for [`CpuTexture`]s.
///
/// The provider can be given a budget for the memory of all textures that are still alive;
/// creating a texture that would exceed it fails.
#[derive(Debug)]
pub struct CpuTextureProvider {
    max_texture_size: u32,
    budget: Option<usize>,
    live_bytes: Arc<AtomicUsize>,
}

impl Default for CpuTextureProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuTextureProvider {
    /// The default maximum texture size.
    pub const DEFAULT_MAX_TEXTURE_SIZE: u32 = 16384;

    /// Create a new provider without a memory budget.
    pub fn new() -> Self {
        Self {
            max_texture_size: Self::DEFAULT_MAX_TEXTURE_SIZE,
            budget: None,
            live_bytes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the largest width or height of a texture.
    pub fn with_max_texture_size(mut self, max_texture_size: u32) -> Self {
        self.max_texture_size = max_texture_size;
        self
    }

    /// Limit the memory of all live textures to `bytes`.
    pub fn with_budget(mut self, bytes: usize) -> Self {
        self.budget = Some(bytes);
        self
    }

    /// The memory used by textures that are still referenced, in bytes.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }
}

impl TextureProvider for CpuTextureProvider {
    type Texture = CpuTexture;

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Option<CpuTexture> {
        if desc.width == 0
            || desc.height == 0
            || desc.width > self.max_texture_size
            || desc.height > self.max_texture_size
        {
            warn!(
                "Rejecting a {}x{} texture, the maximum size is {}",
                desc.width, desc.height, self.max_texture_size
            );
            return None;
        }

        let len = (desc.width as usize)
            .checked_mul(desc.height as usize)?
            .checked_mul(desc.format.bytes_per_texel() as usize)?;
        if let Some(budget) = self.budget {
            let live = self.live_bytes();
            if live.saturating_add(len) > budget {
                warn!(
                    "Texture budget of {budget} bytes exceeded ({live} live, {len} requested)"
                );
                return None;
            }
        }

        let mut data = Vec::new();
        data.try_reserve_exact(len).ok()?;
        data.resize(len, 0);

        debug!(
            "Created a {}x{} {:?} texture",
            desc.width, desc.height, desc.format
        );
        self.live_bytes.fetch_add(len, Ordering::Relaxed);

        Some(CpuTexture(Arc::new(TextureRepr {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            data,
            live_bytes: self.live_bytes.clone(),
        })))
    }

    fn texture_size(&self, texture: &CpuTexture) -> (u32, u32) {
        (texture.width(), texture.height())
    }

    fn write_pixels(&mut self, texture: &mut CpuTexture, mask: &MaskBuffer) {
        texture.write_mask(mask);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CpuTextureProvider, TextureDescriptor, TextureFit, TextureFormat, TextureProvider,
        approx_size,
    };
    use crate::mask::MaskBuffer;

    fn desc(width: u32, height: u32, format: TextureFormat) -> TextureDescriptor {
        TextureDescriptor {
            width,
            height,
            format,
        }
    }

    #[test]
    fn approx_sizes() {
        assert_eq!(approx_size(1), 16);
        assert_eq!(approx_size(16), 16);
        assert_eq!(approx_size(17), 32);
        assert_eq!(approx_size(100), 128);
        assert_eq!(approx_size(1024), 1024);
        assert_eq!(approx_size(1025), 1536);
        assert_eq!(approx_size(1536), 1536);
        assert_eq!(approx_size(1537), 2048);
    }

    #[test]
    fn approx_fit_respects_the_maximum() {
        assert_eq!(TextureFit::Approx.fit(1100, 1200), 1100);
        assert_eq!(TextureFit::Approx.fit(100, 1200), 128);
        assert_eq!(TextureFit::Exact.fit(100, 1200), 100);
    }

    #[test]
    fn budget_counts_only_live_textures() {
        let mut provider = CpuTextureProvider::new().with_budget(1000);
        let first = provider.create_texture(&desc(20, 20, TextureFormat::Alpha8));
        assert!(first.is_some());
        assert!(provider
            .create_texture(&desc(20, 20, TextureFormat::Rgba8))
            .is_none());

        drop(first);
        assert_eq!(provider.live_bytes(), 0);
        assert!(provider
            .create_texture(&desc(15, 15, TextureFormat::Rgba8))
            .is_some());
    }

    #[test]
    fn oversized_textures_are_rejected() {
        let mut provider = CpuTextureProvider::new().with_max_texture_size(64);
        assert!(provider
            .create_texture(&desc(65, 1, TextureFormat::Alpha8))
            .is_none());
        assert!(provider
            .create_texture(&desc(0, 1, TextureFormat::Alpha8))
            .is_none());
    }

    #[test]
    fn writes_expand_to_rgba() {
        let mut provider = CpuTextureProvider::new();
        let mut texture = provider
            .create_texture(&desc(4, 4, TextureFormat::Rgba8))
            .unwrap();
        let mask = MaskBuffer::from_parts(vec![10, 20, 30, 40], 2, 2);
        provider.write_pixels(&mut texture, &mask);

        assert_eq!(texture.texel(1, 1), 40);
        assert_eq!(&texture.data()[..8], &[10, 10, 10, 10, 20, 20, 20, 20]);
        assert_eq!(texture.texel(2, 0), 0);
    }

    #[test]
    fn writes_to_shared_textures_copy() {
        let mut provider = CpuTextureProvider::new();
        let mut texture = provider
            .create_texture(&desc(2, 1, TextureFormat::Alpha8))
            .unwrap();
        let snapshot = texture.clone();
        assert_eq!(texture.ref_count(), 2);

        provider.write_pixels(&mut texture, &MaskBuffer::from_parts(vec![255, 255], 2, 1));
        assert_eq!(texture.texel(0, 0), 255);
        assert_eq!(snapshot.texel(0, 0), 0);
    }

    #[test]
    fn written_textures_stay_in_the_budget() {
        let mut provider = CpuTextureProvider::new().with_budget(300);
        let mut first = provider
            .create_texture(&desc(16, 16, TextureFormat::Alpha8))
            .unwrap();
        provider.write_pixels(&mut first, &MaskBuffer::from_parts(vec![255; 4], 2, 2));

        assert_eq!(first.ref_count(), 1);
        assert_eq!(provider.live_bytes(), 256);
        assert!(provider
            .create_texture(&desc(16, 16, TextureFormat::Alpha8))
            .is_none());
    }

    #[test]
    fn copies_on_write_are_counted() {
        let mut provider = CpuTextureProvider::new();
        let mut texture = provider
            .create_texture(&desc(16, 16, TextureFormat::Alpha8))
            .unwrap();
        let snapshot = texture.clone();
        assert_eq!(provider.live_bytes(), 256);

        provider.write_pixels(&mut texture, &MaskBuffer::from_parts(vec![255], 1, 1));
        assert_eq!(provider.live_bytes(), 512);

        drop(snapshot);
        assert_eq!(provider.live_bytes(), 256);
        drop(texture);
        assert_eq!(provider.live_bytes(), 0);
    }

    #[test]
    fn dropped_textures_release_their_bytes() {
        let mut provider = CpuTextureProvider::new().with_budget(256);
        for _ in 0..10_000 {
            let mut texture = provider
                .create_texture(&desc(16, 16, TextureFormat::Alpha8))
                .unwrap();
            provider.write_pixels(&mut texture, &MaskBuffer::from_parts(vec![1], 1, 1));
        }
        assert_eq!(provider.live_bytes(), 0);

        let mut unbudgeted = CpuTextureProvider::new();
        for _ in 0..10_000 {
            drop(unbudgeted.create_texture(&desc(16, 16, TextureFormat::Alpha8)));
        }
        assert_eq!(unbudgeted.live_bytes(), 0);
    }
}
