// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolved paint parameters handed to a [`Canvas`](crate::canvas::Canvas).

use peniko::{kurbo::Stroke, BlendMode, Brush, Color};

use crate::text::TextAlign;

/// Paint style for a path.
///
/// Symbolizers produce one `FatPaint` per pass, so a polygon with both fill and
/// outline yields a fill-only paint and a stroke-only paint, each carrying its
/// own composition mode.
#[derive(Debug, Clone)]
pub struct FatPaint {
    /// Stroke information
    pub stroke: Stroke,
    /// `Brush` for stroke
    pub stroke_paint: Option<Brush>,
    /// `Brush` for fill
    pub fill_paint: Option<Brush>,
    /// Composition mode, `None` for plain source-over.
    pub blend: Option<BlendMode>,
    /// Whether edges are anti-aliased.
    pub anti_alias: bool,
}

impl Default for FatPaint {
    fn default() -> Self {
        Self {
            stroke: Stroke::default(),
            stroke_paint: None,
            fill_paint: None,
            blend: None,
            anti_alias: true,
        }
    }
}

impl FatPaint {
    /// `true` if neither fill nor stroke would produce anything.
    pub fn is_empty(&self) -> bool {
        self.stroke_paint.is_none() && self.fill_paint.is_none()
    }
}

/// Glow drawn behind text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Halo {
    /// Halo colour.
    pub color: Color,
    /// Halo radius in pixels.
    pub radius: f64,
}

/// Paint style for text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPaint {
    /// Glyph fill colour.
    pub fill: Color,
    /// Font size in pixels.
    pub size: f64,
    /// Which part of the text sits on the drawing origin.
    pub align: TextAlign,
    /// Optional halo.
    pub halo: Option<Halo>,
    /// Whether glyph edges are anti-aliased.
    pub anti_alias: bool,
}

impl Default for TextPaint {
    fn default() -> Self {
        Self {
            fill: Color::BLACK,
            size: 10.0,
            align: TextAlign::Left,
            halo: None,
            anti_alias: true,
        }
    }
}

/// Paint style for bitmaps.
#[derive(Debug, Clone, Copy)]
pub struct ImagePaint {
    /// Opacity multiplied into the bitmap.
    pub opacity: f32,
    /// Composition mode, `None` for plain source-over.
    pub blend: Option<BlendMode>,
    /// Whether the bitmap is filtered when scaled.
    pub anti_alias: bool,
}

impl Default for ImagePaint {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            blend: None,
            anti_alias: true,
        }
    }
}
