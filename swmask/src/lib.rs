// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software generation of coverage masks.
//!
//! This crate rasterizes vector shapes into an 8-bit coverage mask on the CPU, combining
//! successive shapes with boolean region operations under a raster clip, and then moves the
//! result to a GPU texture or converts it into a signed distance field.
//!
//! The central type is [`SwMaskHelper`], which is intended to be used as:
//!
//! ```
//! use swmask::kurbo::Rect;
//! use swmask::texture::CpuTextureProvider;
//! use swmask::{IntRect, MaskOp, SwMaskHelper};
//!
//! let mut provider = CpuTextureProvider::new();
//! let mut helper = SwMaskHelper::new(&mut provider);
//! helper.init(IntRect::from_xywh(0, 0, 100, 100), None).unwrap();
//!
//! // Draw one or more rects/shapes specifying the required boolean ops.
//! helper.draw_rect(Rect::new(0.0, 0.0, 50.0, 50.0), MaskOp::Replace, false, 0xFF);
//!
//! // Move the result from the internal buffer to the GPU.
//! let mut texture = helper.create_texture().unwrap();
//! helper.to_texture(&mut texture).unwrap();
//! assert_eq!(texture.texel(10, 10), 0xFF);
//! ```
//!
//! The final mask ends up in the upper left hand corner of the texture.
//!
//! # Features
//!
//! - `png`: Allow exporting [`MaskBuffer`]s and [`SoftwareTarget`](target::SoftwareTarget)s
//!   as PNG images, for debugging.
//! - `wgpu`: Provide [`WgpuTextureProvider`](crate::wgpu::WgpuTextureProvider), which uploads
//!   masks to textures owned by a [`wgpu`](https://crates.io/crates/wgpu) device.

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod clip;
mod error;
pub mod flatten;
pub mod geometry;
mod helper;
pub mod mask;
pub mod op;
pub mod raster;
pub mod rect;
pub mod sdf;
mod settings;
pub mod shape;
pub mod target;
pub mod texture;
#[cfg(feature = "wgpu")]
pub mod wgpu;

pub use error::{MaskError, Result};
pub use geometry::IntRect;
pub use helper::{SwMaskHelper, draw_to_target_with_shape_mask};
pub use mask::MaskBuffer;
pub use op::MaskOp;
pub use settings::MaskSettings;
pub use shape::{Shape, Style};

pub use peniko;
pub use peniko::color;
pub use peniko::kurbo;
