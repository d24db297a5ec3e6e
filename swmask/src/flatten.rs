// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattening filled and stroked paths.

use crate::kurbo::{self, Affine, PathEl, Stroke, StrokeOpts};
use log::warn;

/// The default flattening tolerance, in device pixels.
pub const DEFAULT_TOLERANCE: f64 = 0.25;

/// A point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// The x coordinate of the point.
    pub x: f32,
    /// The y coordinate of the point.
    pub y: f32,
}

impl Point {
    /// The point `(0, 0)`.
    pub const ZERO: Self = Self::new(0., 0.);

    /// Create a new point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    /// The start point of the line.
    pub p0: Point,
    /// The end point of the line.
    pub p1: Point,
}

impl Line {
    /// Create a new line.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self { p0, p1 }
    }
}

/// Flatten a filled bezier path into line segments.
///
/// Every subpath is implicitly closed. The line buffer is cleared first. If the transformed
/// path contains a non-finite coordinate, it is ignored and the buffer is left empty.
pub fn fill(
    path: impl IntoIterator<Item = PathEl>,
    affine: Affine,
    tolerance: f64,
    line_buf: &mut Vec<Line>,
) {
    line_buf.clear();
    let transformed: Vec<PathEl> = path.into_iter().map(|el| affine * el).collect();

    // A path that contains NaN or infinities is ill-defined, so ignore it. This also has to happen
    // before flattening, as the subdivision count of a non-finite curve is unbounded.
    if !transformed.iter().all(is_finite) {
        warn!("A path contains non-finite coordinates, ignoring it.");

        return;
    }

    let mut lb = FlattenerCallback {
        line_buf,
        start: Point::ZERO,
        p0: Point::ZERO,
    };

    kurbo::flatten(transformed, tolerance, |el| lb.callback(el));
    lb.close();
}

/// Flatten a stroked bezier path into line segments.
///
/// The stroke is expanded in path space, so its width is scaled by the transform.
pub fn stroke(
    path: impl IntoIterator<Item = PathEl>,
    style: &Stroke,
    affine: Affine,
    tolerance: f64,
    line_buf: &mut Vec<Line>,
) {
    // The expansion happens before the transform, so the tolerance has to be scaled down to stay
    // within bounds on the device.
    let path: Vec<PathEl> = path.into_iter().collect();
    if !path.iter().all(is_finite) {
        warn!("A stroked path contains non-finite coordinates, ignoring it.");
        line_buf.clear();

        return;
    }

    let [a, b, c, d, _, _] = affine.as_coeffs();
    let scale = a.hypot(b).max(c.hypot(d)).max(1.0);
    let expanded = expand_stroke(path, style, tolerance / scale);
    fill(&expanded, affine, tolerance, line_buf);
}

/// Flatten a path stroked one device pixel wide, regardless of the transform.
pub fn hairline(
    path: impl IntoIterator<Item = PathEl>,
    affine: Affine,
    tolerance: f64,
    line_buf: &mut Vec<Line>,
) {
    let device_path: Vec<PathEl> = path.into_iter().map(|el| affine * el).collect();
    if !device_path.iter().all(is_finite) {
        warn!("A hairline path contains non-finite coordinates, ignoring it.");
        line_buf.clear();

        return;
    }

    let expanded = expand_stroke(device_path, &Stroke::new(1.0), tolerance);
    fill(&expanded, Affine::IDENTITY, tolerance, line_buf);
}

/// Expand a stroked path to a filled path.
pub fn expand_stroke(
    path: impl IntoIterator<Item = PathEl>,
    style: &Stroke,
    tolerance: f64,
) -> kurbo::BezPath {
    kurbo::stroke(path, style, &StrokeOpts::default(), tolerance)
}

struct FlattenerCallback<'a> {
    line_buf: &'a mut Vec<Line>,
    start: Point,
    p0: Point,
}

impl FlattenerCallback<'_> {
    fn callback(&mut self, el: PathEl) {
        match el {
            PathEl::MoveTo(p) => {
                self.close();

                self.start = Point::new(p.x as f32, p.y as f32);
                self.p0 = self.start;
            }
            PathEl::LineTo(p) => {
                let p = Point::new(p.x as f32, p.y as f32);
                self.line_buf.push(Line::new(self.p0, p));
                self.p0 = p;
            }
            PathEl::ClosePath => self.close(),
            // `kurbo::flatten` only emits lines.
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => unreachable!(),
        }
    }

    fn close(&mut self) {
        if self.p0 != self.start {
            self.line_buf.push(Line::new(self.p0, self.start));
        }
        self.p0 = self.start;
    }
}

fn is_finite(el: &PathEl) -> bool {
    match *el {
        PathEl::MoveTo(p) | PathEl::LineTo(p) => p.is_finite(),
        PathEl::QuadTo(p1, p2) => p1.is_finite() && p2.is_finite(),
        PathEl::CurveTo(p1, p2, p3) => p1.is_finite() && p2.is_finite() && p3.is_finite(),
        PathEl::ClosePath => true,
    }
}
