// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing surface contract.

use peniko::{
    kurbo::{Affine, BezPath, Point, Rect, Size},
    Image,
};

use crate::{
    paint::{FatPaint, ImagePaint, TextPaint},
    text::TextMetrics,
};

/// A 2D drawing surface with a current affine transform.
///
/// All drawing operations are interpreted through the current transform.
/// Text measurement is always in device pixels regardless of the transform.
pub trait Canvas {
    /// Pixel dimensions of the surface.
    fn size(&self) -> Size;

    /// The current transform.
    fn transform(&self) -> Affine;

    /// Replace the current transform.
    fn set_transform(&mut self, transform: Affine);

    /// Fill and/or stroke a path, fill first.
    fn draw_path(&mut self, path: &BezPath, paint: &FatPaint);

    /// Draw the `src` pixel rectangle of `image` into `dst`.
    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect, paint: &ImagePaint);

    /// Measure `text` as it would be drawn with `paint`.
    fn measure_text(&mut self, text: &str, paint: &TextPaint) -> TextMetrics;

    /// Draw `text` with its baseline through `origin`, positioned horizontally by
    /// the paint's alignment.
    fn draw_text(&mut self, text: &str, origin: Point, paint: &TextPaint);
}
