// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for compositing mask textures into render targets.

use swmask::color::PremulRgba8;
use swmask::color::palette::css::RED;
use swmask::kurbo::{Affine, Rect};
use swmask::target::{
    CompareFunction, Paint, SoftwareTarget, StencilOp, TargetClip, UserStencilSettings,
};
use swmask::texture::{CpuTexture, CpuTextureProvider};
use swmask::{IntRect, Shape, SwMaskHelper, draw_to_target_with_shape_mask};

const MASK_BOUNDS: IntRect = IntRect::new(20, 20, 30, 30);
const OPAQUE_RED: PremulRgba8 = PremulRgba8 {
    r: 255,
    g: 0,
    b: 0,
    a: 255,
};
const TRANSPARENT: PremulRgba8 = PremulRgba8 {
    r: 0,
    g: 0,
    b: 0,
    a: 0,
};

/// A mask covering the left half of `MASK_BOUNDS`.
fn left_half_mask(provider: &mut CpuTextureProvider) -> CpuTexture {
    SwMaskHelper::draw_shape_mask_to_texture(
        provider,
        &Shape::from_rect(Rect::new(20.0, 20.0, 25.0, 30.0)),
        MASK_BOUNDS,
        true,
        None,
    )
    .unwrap()
}

fn draw(target: &mut SoftwareTarget, stencil: &UserStencilSettings, clip: &TargetClip) {
    let mut provider = CpuTextureProvider::new();
    let mask = left_half_mask(&mut provider);
    draw_to_target_with_shape_mask(
        &mask,
        target,
        Paint::solid(RED),
        stencil,
        clip,
        Affine::IDENTITY,
        MASK_BOUNDS,
    );
}

#[test]
fn mask_modulates_the_paint() {
    let mut target = SoftwareTarget::new(40, 40);
    draw(&mut target, &UserStencilSettings::UNUSED, &TargetClip::None);

    assert_eq!(target.pixel(22, 25), OPAQUE_RED);
    assert_eq!(target.pixel(27, 25), TRANSPARENT);
    assert_eq!(target.pixel(10, 10), TRANSPARENT);
    assert_eq!(target.pixel(22, 30), TRANSPARENT);
}

#[test]
fn partial_coverage_is_premultiplied() {
    let mut provider = CpuTextureProvider::new();
    let mask = SwMaskHelper::draw_shape_mask_to_texture(
        &mut provider,
        &Shape::from_rect(Rect::new(0.0, 0.0, 1.5, 1.0)),
        IntRect::from_xywh(0, 0, 2, 1),
        true,
        None,
    )
    .unwrap();

    let mut target = SoftwareTarget::new(2, 1);
    draw_to_target_with_shape_mask(
        &mask,
        &mut target,
        Paint::solid(RED),
        &UserStencilSettings::UNUSED,
        &TargetClip::None,
        Affine::IDENTITY,
        IntRect::from_xywh(0, 0, 2, 1),
    );

    assert_eq!(target.pixel(0, 0), OPAQUE_RED);
    assert_eq!(
        target.pixel(1, 0),
        PremulRgba8 {
            r: 128,
            g: 0,
            b: 0,
            a: 128
        }
    );
}

#[test]
fn singular_view_matrix_draws_nothing() {
    let mut provider = CpuTextureProvider::new();
    let mask = left_half_mask(&mut provider);
    let mut target = SoftwareTarget::new(40, 40);
    draw_to_target_with_shape_mask(
        &mask,
        &mut target,
        Paint::solid(RED),
        &UserStencilSettings::UNUSED,
        &TargetClip::None,
        Affine::scale(0.0),
        MASK_BOUNDS,
    );
    assert!(target.pixels().iter().all(|&p| p == TRANSPARENT));
}

#[test]
fn target_clip_limits_the_fill() {
    let mut target = SoftwareTarget::new(40, 40);
    draw(
        &mut target,
        &UserStencilSettings::UNUSED,
        &TargetClip::Rect(IntRect::new(20, 20, 22, 30)),
    );

    assert_eq!(target.pixel(21, 25), OPAQUE_RED);
    assert_eq!(target.pixel(23, 25), TRANSPARENT);
}

#[test]
fn stencil_test_and_update() {
    let mut target = SoftwareTarget::new(40, 40);
    target.fill_stencil(IntRect::new(20, 20, 30, 25), 1);
    let stencil = UserStencilSettings {
        compare: CompareFunction::Equal,
        reference: 1,
        pass_op: StencilOp::IncrementClamp,
        ..UserStencilSettings::UNUSED
    };
    draw(&mut target, &stencil, &TargetClip::None);

    assert_eq!(target.pixel(21, 21), OPAQUE_RED);
    assert_eq!(target.stencil(21, 21), 2);
    assert_eq!(target.pixel(21, 27), TRANSPARENT);
    assert_eq!(target.stencil(21, 27), 0);
    // The stencil is updated even where the mask is empty.
    assert_eq!(target.stencil(27, 21), 2);
    assert_eq!(target.stencil(10, 10), 0);
}
