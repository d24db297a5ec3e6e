// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shapes that can be drawn into a mask.

use crate::flatten::{self, Line};
use crate::kurbo::{Affine, BezPath, PathEl, Rect, Shape as _, Stroke};
use crate::peniko::Fill;

/// How the geometry of a [`Shape`] turns into covered area.
#[derive(Debug, Clone, PartialEq)]
pub enum Style {
    /// Fill the interior according to the fill rule.
    Fill,
    /// Stroke the outline. The width is in shape space, so it is scaled by the transform.
    Stroke(Stroke),
    /// Stroke the outline one device pixel wide, whatever the transform.
    Hairline,
}

#[derive(Debug, Clone, PartialEq)]
enum Geometry {
    Rect(Rect),
    Path(BezPath),
}

/// A shape: geometry together with a fill rule, a style and an optional inverse fill.
///
/// Shapes are immutable inputs to mask generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    geometry: Geometry,
    fill_rule: Fill,
    style: Style,
    inverse: bool,
}

impl Shape {
    /// A filled path using the non-zero fill rule.
    pub fn new(path: BezPath) -> Self {
        Self {
            geometry: Geometry::Path(path),
            fill_rule: Fill::NonZero,
            style: Style::Fill,
            inverse: false,
        }
    }

    /// A filled rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            geometry: Geometry::Rect(rect),
            ..Self::new(BezPath::new())
        }
    }

    /// Set the fill rule.
    pub fn with_fill_rule(mut self, fill_rule: Fill) -> Self {
        self.fill_rule = fill_rule;
        self
    }

    /// Set the style.
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Cover everything except the shape instead.
    pub fn inverted(mut self) -> Self {
        self.inverse = !self.inverse;
        self
    }

    /// The fill rule used to resolve the covered area.
    ///
    /// Strokes always use [`Fill::NonZero`], so overlapping parts of the outline stay covered.
    pub fn fill_rule(&self) -> Fill {
        match self.style {
            Style::Fill => self.fill_rule,
            Style::Stroke(_) | Style::Hairline => Fill::NonZero,
        }
    }

    /// The style of the shape.
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Whether the shape has an inverse fill.
    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// The shape as a plain filled rectangle, if it is one.
    pub fn as_rect(&self) -> Option<Rect> {
        match (&self.geometry, &self.style, self.inverse) {
            (Geometry::Rect(rect), Style::Fill, false) => Some(*rect),
            _ => None,
        }
    }

    /// The path elements of the shape's geometry.
    pub fn path_elements(&self, tolerance: f64) -> impl Iterator<Item = PathEl> + '_ {
        let (rect, path) = match &self.geometry {
            Geometry::Rect(rect) => (Some(rect.path_elements(tolerance)), None),
            Geometry::Path(path) => (None, Some(path.iter())),
        };
        rect.into_iter().flatten().chain(path.into_iter().flatten())
    }

    /// Flatten the covered outline of the shape into device space line segments.
    ///
    /// The inverse flag is not applied here; callers invert the resulting coverage.
    pub fn flatten(&self, affine: Affine, tolerance: f64, line_buf: &mut Vec<Line>) {
        let path = self.path_elements(tolerance);
        match &self.style {
            Style::Fill => flatten::fill(path, affine, tolerance, line_buf),
            Style::Stroke(stroke) => flatten::stroke(path, stroke, affine, tolerance, line_buf),
            Style::Hairline => flatten::hairline(path, affine, tolerance, line_buf),
        }
    }
}

impl From<BezPath> for Shape {
    fn from(path: BezPath) -> Self {
        Self::new(path)
    }
}

impl From<Rect> for Shape {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}
