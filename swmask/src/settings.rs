// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::flatten::DEFAULT_TOLERANCE;
use crate::texture::{TextureFit, TextureFormat};

/// Options for generating masks with a [`SwMaskHelper`](crate::SwMaskHelper).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskSettings {
    /// The maximum distance, in device pixels, between a curve and its flattened lines.
    pub tolerance: f64,
    /// The largest width or height of a mask, in pixels.
    ///
    /// Initializing a mask with larger bounds fails with
    /// [`MaskError::AllocationFailed`](crate::MaskError::AllocationFailed). Values above
    /// [`u16::MAX`] are treated as [`u16::MAX`].
    pub max_dimension: u32,
    /// How textures created for a mask are sized.
    pub texture_fit: TextureFit,
    /// The format of textures created for a mask.
    pub texture_format: TextureFormat,
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_dimension: 8192,
            texture_fit: TextureFit::Approx,
            texture_format: TextureFormat::Alpha8,
        }
    }
}
