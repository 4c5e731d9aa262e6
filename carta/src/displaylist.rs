// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`Canvas`] that records draw calls instead of rasterizing them.

use peniko::{
    kurbo::{Affine, BezPath, Point, Rect, Size},
    Image,
};

use crate::{
    canvas::Canvas,
    paint::{FatPaint, ImagePaint, TextPaint},
    text::TextMetrics,
};

/// Items for [`DisplayList`]
#[derive(Debug, Clone)]
pub enum DisplayItem {
    /// A filled and/or stroked path.
    Path {
        /// Transform current when the path was drawn.
        transform: Affine,
        /// Path in local coordinates.
        path: BezPath,
        /// Paint information.
        paint: FatPaint,
    },
    /// A bitmap composited into a rectangle.
    Image {
        /// Transform current when the bitmap was drawn.
        transform: Affine,
        /// The bitmap.
        image: Image,
        /// Source pixel rectangle.
        src: Rect,
        /// Destination rectangle.
        dst: Rect,
        /// Paint information.
        paint: ImagePaint,
    },
    /// A run of text.
    Text {
        /// Transform current when the text was drawn.
        transform: Affine,
        /// Text content.
        text: String,
        /// Baseline origin in local coordinates.
        origin: Point,
        /// Paint information.
        paint: TextPaint,
    },
}

/// Fixed advance text metrics, proportional to the font size.
#[derive(Debug, Clone, Copy)]
pub struct FixedMetrics {
    /// Advance of every character as a fraction of the font size.
    pub advance: f64,
    /// Height above the baseline as a fraction of the font size.
    pub ascent: f64,
    /// Depth below the baseline as a fraction of the font size.
    pub descent: f64,
}

impl Default for FixedMetrics {
    fn default() -> Self {
        Self {
            advance: 0.6,
            ascent: 0.8,
            descent: 0.2,
        }
    }
}

/// Simple display list
///
/// Useful for headless rendering, for replaying a frame into another surface,
/// and for inspecting what a render pass produced.
#[derive(Debug, Clone)]
pub struct DisplayList {
    /// Items in `DisplayList`
    pub items: Vec<DisplayItem>,
    size: Size,
    transform: Affine,
    metrics: FixedMetrics,
}

impl DisplayList {
    /// Make an empty display list for a surface of `size` pixels.
    pub fn new(size: Size) -> Self {
        Self {
            items: Vec::new(),
            size,
            transform: Affine::IDENTITY,
            metrics: FixedMetrics::default(),
        }
    }

    /// Use `metrics` when measuring text.
    #[must_use]
    pub fn with_metrics(mut self, metrics: FixedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Push a [`DisplayItem`], returning its index.
    pub fn push(&mut self, i: impl Into<DisplayItem>) -> usize {
        let n = self.items.len();
        self.items.push(i.into());
        n
    }

    /// Iterate over the recorded paths.
    pub fn paths(&self) -> impl Iterator<Item = (&Affine, &BezPath, &FatPaint)> {
        self.items.iter().filter_map(|i| match i {
            DisplayItem::Path {
                transform,
                path,
                paint,
            } => Some((transform, path, paint)),
            _ => None,
        })
    }

    /// Iterate over the recorded text runs.
    pub fn texts(&self) -> impl Iterator<Item = (&Affine, &str, Point)> {
        self.items.iter().filter_map(|i| match i {
            DisplayItem::Text {
                transform,
                text,
                origin,
                ..
            } => Some((transform, text.as_str(), *origin)),
            _ => None,
        })
    }

    /// Replay the recorded items onto another canvas.
    pub fn replay(&self, target: &mut dyn Canvas) {
        let restore = target.transform();
        for item in &self.items {
            match item {
                DisplayItem::Path {
                    transform,
                    path,
                    paint,
                } => {
                    target.set_transform(restore * *transform);
                    target.draw_path(path, paint);
                }
                DisplayItem::Image {
                    transform,
                    image,
                    src,
                    dst,
                    paint,
                } => {
                    target.set_transform(restore * *transform);
                    target.draw_image(image, *src, *dst, paint);
                }
                DisplayItem::Text {
                    transform,
                    text,
                    origin,
                    paint,
                } => {
                    target.set_transform(restore * *transform);
                    target.draw_text(text, *origin, paint);
                }
            }
        }
        target.set_transform(restore);
    }
}

impl Canvas for DisplayList {
    fn size(&self) -> Size {
        self.size
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn draw_path(&mut self, path: &BezPath, paint: &FatPaint) {
        self.push(DisplayItem::Path {
            transform: self.transform,
            path: path.clone(),
            paint: paint.clone(),
        });
    }

    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect, paint: &ImagePaint) {
        self.push(DisplayItem::Image {
            transform: self.transform,
            image: image.clone(),
            src,
            dst,
            paint: *paint,
        });
    }

    fn measure_text(&mut self, text: &str, paint: &TextPaint) -> TextMetrics {
        let FixedMetrics {
            advance,
            ascent,
            descent,
        } = self.metrics;
        let advances: Vec<f64> = text.chars().map(|_| advance * paint.size).collect();
        let width = advances.iter().sum();
        TextMetrics {
            bounds: Rect::new(0.0, -ascent * paint.size, width, descent * paint.size),
            advances,
        }
    }

    fn draw_text(&mut self, text: &str, origin: Point, paint: &TextPaint) {
        self.push(DisplayItem::Text {
            transform: self.transform,
            text: text.into(),
            origin,
            paint: paint.clone(),
        });
    }
}
