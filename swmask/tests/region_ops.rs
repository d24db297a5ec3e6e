// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for combining shapes with region operations.

use crate::util::{RECT_A, RECT_B, check_binary, in_rect, square};
use swmask::kurbo::Rect;
use swmask::texture::CpuTextureProvider;
use swmask::{MaskOp, SwMaskHelper};

fn combine(op: MaskOp, expected: impl Fn(bool, bool) -> bool) {
    let mut provider = CpuTextureProvider::new();
    let mut helper = SwMaskHelper::new(&mut provider);
    helper.init(square(), None).unwrap();
    helper.draw_rect(RECT_A, MaskOp::Replace, false, 0xFF);
    helper.draw_rect(RECT_B, op, false, 0xFF);

    check_binary(helper.mask().unwrap(), |x, y| {
        expected(in_rect(RECT_A, x, y), in_rect(RECT_B, x, y))
    });
}

#[test]
fn union() {
    combine(MaskOp::Union, |a, b| a || b);
}

#[test]
fn intersect() {
    combine(MaskOp::Intersect, |a, b| a && b);
}

#[test]
fn difference() {
    combine(MaskOp::Difference, |a, b| a && !b);
}

#[test]
fn reverse_difference() {
    combine(MaskOp::ReverseDifference, |a, b| b && !a);
}

#[test]
fn xor() {
    combine(MaskOp::Xor, |a, b| a != b);
}

#[test]
fn replace() {
    combine(MaskOp::Replace, |_, b| b);
}

#[test]
fn intersect_with_a_shape_outside_of_the_mask_clears_it() {
    let mut provider = CpuTextureProvider::new();
    let mut helper = SwMaskHelper::new(&mut provider);
    helper.init(square(), None).unwrap();
    helper.clear(0xFF);
    helper.draw_rect(
        Rect::new(200.0, 200.0, 300.0, 300.0),
        MaskOp::Intersect,
        true,
        0xFF,
    );
    assert!(helper.mask().unwrap().data().iter().all(|&a| a == 0));
}

#[test]
fn partial_alpha_unions_accumulate() {
    let mut provider = CpuTextureProvider::new();
    let mut helper = SwMaskHelper::new(&mut provider);
    helper.init(square(), None).unwrap();
    helper.draw_rect(RECT_A, MaskOp::Union, false, 0x80);
    helper.draw_rect(RECT_A, MaskOp::Union, false, 0x80);

    // 0.5 + 0.5 * (1 - 0.5)
    assert_eq!(helper.mask().unwrap().sample(10, 10), 192);
    assert_eq!(helper.mask().unwrap().sample(70, 70), 0);
}
