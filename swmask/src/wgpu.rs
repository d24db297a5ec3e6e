// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uploading masks to [`wgpu`] textures.

use crate::mask::MaskBuffer;
use crate::texture::{TextureDescriptor, TextureFormat, TextureProvider};
use log::{debug, warn};
use wgpu::{
    Device, Extent3d, ImageCopyTexture, ImageDataLayout, Origin3d, Queue, Texture, TextureAspect,
    TextureDimension, TextureUsages,
};

/// A [`TextureProvider`] creating textures on a [`wgpu::Device`].
///
/// Alpha masks are stored as [`wgpu::TextureFormat::R8Unorm`], RGBA masks as
/// [`wgpu::TextureFormat::Rgba8Unorm`] with premultiplied alpha.
#[derive(Debug)]
pub struct WgpuTextureProvider<'a> {
    device: &'a Device,
    queue: &'a Queue,
}

impl<'a> WgpuTextureProvider<'a> {
    /// Create a provider for `device`, writing through `queue`.
    pub fn new(device: &'a Device, queue: &'a Queue) -> Self {
        Self { device, queue }
    }
}

fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Alpha8 => wgpu::TextureFormat::R8Unorm,
        TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
    }
}

impl TextureProvider for WgpuTextureProvider<'_> {
    type Texture = Texture;

    fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Option<Texture> {
        let max = self.max_texture_size();
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            warn!(
                "Rejecting a {}x{} mask texture, the device limit is {max}",
                desc.width, desc.height
            );
            return None;
        }

        debug!(
            "Creating a {}x{} {:?} mask texture",
            desc.width, desc.height, desc.format
        );
        Some(self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("swmask::mask"),
            size: Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: texture_format(desc.format),
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        }))
    }

    fn texture_size(&self, texture: &Texture) -> (u32, u32) {
        (texture.width(), texture.height())
    }

    fn write_pixels(&mut self, texture: &mut Texture, mask: &MaskBuffer) {
        let width = u32::from(mask.width());
        let height = u32::from(mask.height());
        if width == 0 || height == 0 {
            return;
        }

        let expanded;
        let (data, bytes_per_texel): (&[u8], u32) = match texture.format() {
            wgpu::TextureFormat::R8Unorm => (mask.data(), 1),
            _ => {
                expanded = mask.to_premul_rgba8();
                (bytemuck::cast_slice(&expanded), 4)
            }
        };

        self.queue.write_texture(
            ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            data,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * bytes_per_texel),
                rows_per_image: None,
            },
            Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}
