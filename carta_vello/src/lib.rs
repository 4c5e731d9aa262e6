// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vello drawing surface for Carta.
//!
//! [`VelloCanvas`] implements [`Canvas`] by encoding into a Vello [`Scene`].
//! Text is shaped and measured with Parley.

use carta::{
    canvas::Canvas,
    paint::{FatPaint, ImagePaint, TextPaint},
    peniko::{
        kurbo::{Affine, BezPath, Point, Rect, Size, Stroke},
        BlendMode, Color, Fill, Image, ImageQuality,
    },
    text::TextMetrics,
};

use parley::{Alignment, FontContext, Layout, LayoutContext, PositionedLayoutItem, StyleProperty};
use vello::Scene;

/// Expensive state for rendering.
#[derive(Default)]
#[expect(
    missing_debug_implementations,
    reason = "Not useful, and members don't implement Debug."
)]
pub struct Environment {
    /// Font context.
    ///
    /// This contains a font collection that is expensive to reproduce.
    pub(crate) font_cx: FontContext,
    /// Layout context.
    pub(crate) layout_cx: LayoutContext<Option<Color>>,
}

impl Environment {
    /// Lay out `text` on a single line at `size` pixels.
    fn layout(&mut self, text: &str, size: f64) -> Layout<Option<Color>> {
        let Self { font_cx, layout_cx } = self;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "font sizes are far inside f32 range"
        )]
        let size = size as f32;
        let mut builder = layout_cx.ranged_builder(font_cx, text, 1.0, true);
        builder.push_default(StyleProperty::FontSize(size));
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout.align(None, Alignment::Start, Default::default());
        layout
    }
}

/// Ascent and descent of the first line, or of the whole layout if it is empty.
fn line_extent(layout: &Layout<Option<Color>>) -> (f64, f64) {
    layout
        .lines()
        .next()
        .map(|line| {
            let m = line.metrics();
            (f64::from(m.ascent), f64::from(m.descent))
        })
        .unwrap_or((f64::from(layout.height()), 0.0))
}

/// A [`Canvas`] that encodes into a Vello [`Scene`].
#[expect(
    missing_debug_implementations,
    reason = "Scene and Environment don't implement Debug."
)]
pub struct VelloCanvas<'a> {
    scene: &'a mut Scene,
    env: &'a mut Environment,
    size: Size,
    transform: Affine,
}

impl<'a> VelloCanvas<'a> {
    /// Draw into `scene` for a surface of `size` pixels.
    pub fn new(scene: &'a mut Scene, env: &'a mut Environment, size: Size) -> Self {
        Self {
            scene,
            env,
            size,
            transform: Affine::IDENTITY,
        }
    }

    /// Run `f` inside a compositing layer for `blend`, when there is one.
    fn blended(&mut self, blend: Option<BlendMode>, f: impl FnOnce(&mut Scene, Affine)) {
        let transform = self.transform;
        match blend {
            Some(blend) => {
                let all = Rect::from_origin_size(Point::ORIGIN, self.size);
                self.scene.push_layer(blend, 1.0, Affine::IDENTITY, &all);
                f(self.scene, transform);
                self.scene.pop_layer();
            }
            None => f(self.scene, transform),
        }
    }

    /// Draw `layout` with its first baseline at `origin`, in device space
    /// under `transform`.
    fn draw_layout(
        &mut self,
        layout: &Layout<Option<Color>>,
        origin: Point,
        paint: &TextPaint,
        transform: Affine,
    ) {
        let (ascent, _) = line_extent(layout);
        let width = f64::from(layout.width());
        let placement = transform
            * Affine::translate((origin.x - paint.align.select(width), origin.y - ascent));

        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let run = glyph_run.run();
                let glyph_transform = run
                    .synthesis()
                    .skew()
                    .map(|angle| Affine::skew(f64::from(angle.to_radians().tan()), 0.0));
                let glyphs = || {
                    let mut x = glyph_run.offset();
                    let y = glyph_run.baseline();
                    glyph_run.glyphs().map(move |g| {
                        let gx = x + g.x;
                        let gy = y - g.y;
                        x += g.advance;
                        vello::Glyph {
                            id: g.id as _,
                            x: gx,
                            y: gy,
                        }
                    })
                };

                if let Some(halo) = paint.halo.filter(|h| h.radius > 0.0) {
                    self.scene
                        .draw_glyphs(run.font())
                        .brush(halo.color)
                        .hint(false)
                        .transform(placement)
                        .glyph_transform(glyph_transform)
                        .font_size(run.font_size())
                        .normalized_coords(run.normalized_coords())
                        .draw(&Stroke::new(2.0 * halo.radius), glyphs());
                }
                self.scene
                    .draw_glyphs(run.font())
                    .brush(paint.fill)
                    .hint(false)
                    .transform(placement)
                    .glyph_transform(glyph_transform)
                    .font_size(run.font_size())
                    .normalized_coords(run.normalized_coords())
                    .draw(Fill::NonZero, glyphs());
            }
        }
    }
}

impl Canvas for VelloCanvas<'_> {
    fn size(&self) -> Size {
        self.size
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    // Vello always anti-aliases, so `anti_alias` is not consulted for paths.
    fn draw_path(&mut self, path: &BezPath, paint: &FatPaint) {
        if paint.is_empty() {
            return;
        }
        let FatPaint {
            stroke,
            stroke_paint,
            fill_paint,
            blend,
            ..
        } = paint;
        self.blended(*blend, |scene, transform| {
            if let Some(fill_paint) = fill_paint {
                scene.fill(Fill::NonZero, transform, fill_paint, None, path);
            }
            if let Some(stroke_paint) = stroke_paint {
                scene.stroke(stroke, transform, stroke_paint, None, path);
            }
        });
    }

    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect, paint: &ImagePaint) {
        if src.width() <= 0.0 || src.height() <= 0.0 {
            return;
        }
        let local = Affine::translate(dst.origin().to_vec2())
            * Affine::scale_non_uniform(dst.width() / src.width(), dst.height() / src.height())
            * Affine::translate(-src.origin().to_vec2());
        let transform = self.transform * local;
        let image = if paint.anti_alias {
            image.clone()
        } else {
            image.clone().with_quality(ImageQuality::Low)
        };

        self.scene
            .push_layer(paint.blend.unwrap_or_default(), paint.opacity, transform, &src);
        self.scene.draw_image(&image, transform);
        self.scene.pop_layer();
    }

    #[tracing::instrument(skip_all)]
    fn measure_text(&mut self, text: &str, paint: &TextPaint) -> TextMetrics {
        let layout = self.env.layout(text, paint.size);
        let (ascent, descent) = line_extent(&layout);
        let advances = text
            .chars()
            .map(|c| {
                let mut buf = [0_u8; 4];
                f64::from(self.env.layout(c.encode_utf8(&mut buf), paint.size).width())
            })
            .collect();
        TextMetrics {
            bounds: Rect::new(0.0, -ascent, f64::from(layout.width()), descent),
            advances,
        }
    }

    fn draw_text(&mut self, text: &str, origin: Point, paint: &TextPaint) {
        let layout = self.env.layout(text, paint.size);
        let transform = self.transform;
        self.draw_layout(&layout, origin, paint, transform);
    }
}
