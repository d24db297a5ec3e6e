// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for uploading masks to `wgpu` textures.

#![cfg(feature = "wgpu")]

use swmask::kurbo::Rect;
use swmask::wgpu::WgpuTextureProvider;
use swmask::{IntRect, MaskOp, SwMaskHelper};

fn device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter =
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))?;
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default(), None)).ok()
}

#[test]
fn upload_to_a_device_texture() {
    let Some((device, queue)) = device() else {
        eprintln!("No adapter available, skipping");
        return;
    };

    let mut provider = WgpuTextureProvider::new(&device, &queue);
    let mut helper = SwMaskHelper::new(&mut provider);
    helper.init(IntRect::from_xywh(0, 0, 100, 30), None).unwrap();
    helper.draw_rect(Rect::new(0.0, 0.0, 50.0, 30.0), MaskOp::Replace, true, 0xFF);

    let mut texture = helper.create_texture().unwrap();
    helper.to_texture(&mut texture).unwrap();
    assert_eq!((texture.width(), texture.height()), (128, 32));
    assert_eq!(texture.format(), wgpu::TextureFormat::R8Unorm);
    queue.submit([]);
}
