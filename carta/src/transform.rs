// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utilities for transformations between world, canvas and screen space.

use core::ops::{Deref, DerefMut};

use geo::Coord;
use peniko::kurbo::{Affine, Point, Rect, Vec2};

use crate::canvas::Canvas;
use crate::error::{Error, Result};
use crate::view::Viewport;

/// A direct isometry.
///
/// Direct isometries do not include reflections.
#[derive(Debug, Clone, Copy)]
pub struct DirectIsometry {
    /// Angle in radians to rotate at the origin.
    pub angle: f64,
    /// Displacement from the origin.
    pub displacement: Vec2,
}

impl DirectIsometry {
    /// Make a new `DirectIsometry` from an `angle` and a `displacement`.
    #[inline(always)]
    pub fn new(angle: f64, displacement: Vec2) -> Self {
        Self {
            angle,
            displacement,
        }
    }
}

impl From<DirectIsometry> for Affine {
    #[inline]
    fn from(
        DirectIsometry {
            angle,
            displacement,
        }: DirectIsometry,
    ) -> Self {
        Self::rotate(angle).then_translate(displacement)
    }
}

/// Mapping helpers on [`Affine`] used throughout the pipeline.
pub trait AffineExt {
    /// Map a world coordinate to a point.
    fn map_coord(&self, c: Coord<f64>) -> Point;

    /// Map a rectangle, returning the axis aligned bounds of the result.
    fn map_rect(&self, r: Rect) -> Rect;

    /// Mean radius of a circle of radius `r` after mapping.
    ///
    /// Used to turn pixel widths into world widths so strokes keep their
    /// visual size when drawn under the world transform.
    fn map_radius(&self, r: f64) -> f64;
}

impl AffineExt for Affine {
    fn map_coord(&self, c: Coord<f64>) -> Point {
        *self * Point::new(c.x, c.y)
    }

    fn map_rect(&self, r: Rect) -> Rect {
        self.transform_rect_bbox(r)
    }

    fn map_radius(&self, r: f64) -> f64 {
        let [a, b, c, d, _, _] = self.as_coeffs();
        let d0 = Vec2::new(a * r, b * r).hypot();
        let d1 = Vec2::new(c * r, d * r).hypot();
        (d0 * d1).sqrt()
    }
}

/// The affine maps between world, canvas and screen space.
///
/// `world_to_canvas` scales by the view scale (flipping y) and then translates.
/// `canvas_to_world` is always its exact inverse; the pair is only ever
/// recomputed together through [`TransformPipeline::update`].
/// `canvas_to_screen` is whatever transform the drawing surface carried when
/// [`TransformPipeline::apply`] was last called.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    world_to_canvas: Affine,
    canvas_to_world: Affine,
    canvas_to_screen: Affine,
}

impl TransformPipeline {
    /// Build the pipeline for a viewport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SingularTransform`] if the viewport scale is degenerate.
    pub fn new(view: &Viewport) -> Result<Self> {
        let mut tx = Self {
            world_to_canvas: Affine::IDENTITY,
            canvas_to_world: Affine::IDENTITY,
            canvas_to_screen: Affine::IDENTITY,
        };
        tx.update(view)?;
        Ok(tx)
    }

    /// Recompute the world/canvas transforms after the viewport bounds or size
    /// changed. CRS changes do not affect the transforms.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SingularTransform`] if the viewport scale is degenerate,
    /// leaving the previous transforms in place.
    pub fn update(&mut self, view: &Viewport) -> Result<()> {
        let world_to_canvas = Affine::scale_non_uniform(view.scale_x(), -view.scale_y())
            .then_translate(Vec2::new(view.translate_x(), view.translate_y()));

        let det = world_to_canvas.determinant();
        if !det.is_finite() || det.abs() <= f64::EPSILON * f64::EPSILON {
            return Err(Error::SingularTransform(det));
        }

        self.world_to_canvas = world_to_canvas;
        self.canvas_to_world = world_to_canvas.inverse();
        Ok(())
    }

    /// Transform from world coordinates to canvas coordinates.
    ///
    /// ```text
    /// | scx   0   tx |
    /// |  0  -scy  ty |
    /// |  0    0    1 |
    /// ```
    pub fn world_to_canvas(&self) -> Affine {
        self.world_to_canvas
    }

    /// Transform from canvas coordinates to world coordinates.
    pub fn canvas_to_world(&self) -> Affine {
        self.canvas_to_world
    }

    /// The surface transform captured by the last [`apply`](Self::apply).
    pub fn canvas_to_screen(&self) -> Affine {
        self.canvas_to_screen
    }

    /// Concatenated transform from world coordinates to the screen.
    pub fn world_to_screen(&self) -> Affine {
        self.canvas_to_screen * self.world_to_canvas
    }

    /// Capture the surface's current transform and install world to screen.
    pub fn apply(&mut self, canvas: &mut dyn Canvas) {
        self.canvas_to_screen = canvas.transform();
        canvas.set_transform(self.world_to_screen());
    }

    /// Restore the surface transform captured by [`apply`](Self::apply).
    pub fn reset(&self, canvas: &mut dyn Canvas) {
        canvas.set_transform(self.canvas_to_screen);
    }

    /// Draw in raw device space until the returned guard is dropped, at which point
    /// the surface gets back whatever transform it had before.
    pub fn pixel_space<'c>(&self, canvas: &'c mut dyn Canvas) -> TransformGuard<'c> {
        TransformGuard::new(canvas, self.canvas_to_screen)
    }
}

/// Installs a transform on a [`Canvas`] and restores the previous one on drop.
pub struct TransformGuard<'c> {
    canvas: &'c mut dyn Canvas,
    restore: Affine,
}

impl<'c> TransformGuard<'c> {
    /// Install `transform` on `canvas`.
    pub fn new(canvas: &'c mut dyn Canvas, transform: Affine) -> Self {
        let restore = canvas.transform();
        canvas.set_transform(transform);
        Self { canvas, restore }
    }
}

impl core::fmt::Debug for TransformGuard<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransformGuard")
            .field("restore", &self.restore)
            .finish_non_exhaustive()
    }
}

impl<'c> Deref for TransformGuard<'c> {
    type Target = dyn Canvas + 'c;

    fn deref(&self) -> &Self::Target {
        &*self.canvas
    }
}

impl<'c> DerefMut for TransformGuard<'c> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.canvas
    }
}

impl Drop for TransformGuard<'_> {
    fn drop(&mut self) {
        self.canvas.set_transform(self.restore);
    }
}
