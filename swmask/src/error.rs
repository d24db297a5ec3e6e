// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Errors that can occur while generating a mask.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MaskError {
    /// The requested result bounds have zero area.
    #[error("Mask bounds are empty")]
    EmptyBounds,
    /// The backing buffer for the mask couldn't be allocated.
    ///
    /// This happens when the bounds exceed [`MaskSettings::max_dimension`](crate::MaskSettings)
    /// or when the allocation itself fails.
    #[error("Couldn't allocate a {width}x{height} mask buffer")]
    AllocationFailed {
        /// The requested width in pixels.
        width: u32,
        /// The requested height in pixels.
        height: u32,
    },
    /// The helper was used before a successful call to
    /// [`SwMaskHelper::init`](crate::SwMaskHelper::init).
    #[error("Mask helper used before `init`")]
    Uninitialized,
    /// The destination texture can't hold the whole mask.
    #[error("Texture is {texture_width}x{texture_height}, but the mask is {width}x{height}")]
    TextureTooSmall {
        /// The width of the mask.
        width: u32,
        /// The height of the mask.
        height: u32,
        /// The width of the texture.
        texture_width: u32,
        /// The height of the texture.
        texture_height: u32,
    },
    /// A caller-provided output buffer has the wrong length.
    #[error("Output buffer has {actual} bytes, expected {expected}")]
    BufferSizeMismatch {
        /// The length required for the mask.
        expected: usize,
        /// The length of the provided buffer.
        actual: usize,
    },
}

/// A specialized [`Result`](core::result::Result) for mask generation.
pub type Result<T, E = MaskError> = core::result::Result<T, E>;
