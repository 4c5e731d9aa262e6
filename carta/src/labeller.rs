// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Label layout and rendering.
//!
//! Point labels are boxes anchored at the centroid of their geometry. Line
//! labels are laid out glyph by glyph along the line with a [`LineSampler`],
//! and rejected when the line is too short or bends too sharply between two
//! glyphs.

use geo::{Centroid, Geometry};
use peniko::kurbo::{Affine, BezPath, Line, Point, Rect, Size, Vec2};

use crate::canvas::Canvas;
use crate::error::{Error, Result};
use crate::label::{Label, LabelIndex, LineLabel, PointLabel};
use crate::paint::TextPaint;
use crate::sampler::{LineSampler, DEFAULT_TOLERANCE};
use crate::symbolizer::LabelStyle;
use crate::text::{expand, TextAlign};
use crate::transform::{AffineExt, DirectIsometry, TransformPipeline};

/// Labeller configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabellerOptions {
    /// Largest bend between consecutive glyphs of a line label, in degrees,
    /// for styles that do not set `text-max-char-angle-delta`.
    pub max_char_angle_delta: f64,
    /// Distance tolerance of the line sampler.
    pub sampler_tolerance: f64,
}

impl Default for LabellerOptions {
    fn default() -> Self {
        Self {
            max_char_angle_delta: 22.5,
            sampler_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// How a label follows its geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Anchored at the centroid.
    Point,
    /// Along the line.
    Line,
}

/// Everything needed to place one label.
#[derive(Debug, Clone, Copy)]
pub struct LabelRequest<'a> {
    /// Text to place.
    pub text: &'a str,
    /// Paint the text will be drawn with.
    pub paint: &'a TextPaint,
    /// Offsets, padding and bend limit.
    pub style: &'a LabelStyle,
    /// Geometry being labelled, in world coordinates.
    pub geometry: &'a Geometry<f64>,
    /// Point or line placement.
    pub placement: Placement,
}

/// Lays out and draws labels.
#[derive(Debug, Clone, Default)]
pub struct Labeller {
    options: LabellerOptions,
}

/// Angle of a baseline segment, folded into `[-π/2, π/2]`.
fn baseline_angle(l: Line) -> f64 {
    let d = l.p1 - l.p0;
    if d.x == 0.0 && d.y == 0.0 {
        return 0.0;
    }
    (d.y / d.x).atan()
}

fn line_coords(geometry: &Geometry<f64>) -> Option<Vec<Point>> {
    let ls = match geometry {
        Geometry::LineString(ls) => ls,
        Geometry::MultiLineString(mls) if mls.0.len() == 1 => &mls.0[0],
        Geometry::Line(l) => {
            return Some(vec![
                Point::new(l.start.x, l.start.y),
                Point::new(l.end.x, l.end.y),
            ]);
        }
        _ => return None,
    };
    Some(ls.coords().map(|c| Point::new(c.x, c.y)).collect())
}

/// Ring around glyph baselines: each baseline start, the final end point, then
/// the same points offset by `height` along the left normal, in reverse.
fn ribbon(path: &[Line], height: f64) -> Vec<Point> {
    let mut bottom = Vec::with_capacity(path.len() + 1);
    let mut top = Vec::with_capacity(path.len() + 1);
    for (i, seg) in path.iter().enumerate() {
        let d = seg.p1 - seg.p0;
        let theta = d.y.atan2(d.x);
        let offset = Vec2::new(-theta.sin(), theta.cos()) * height;
        bottom.push(seg.p0);
        top.push(seg.p0 + offset);
        if i == path.len() - 1 {
            bottom.push(seg.p1);
            top.push(seg.p1 + offset);
        }
    }
    bottom.extend(top.into_iter().rev());
    bottom
}

impl Labeller {
    /// A labeller using `options`.
    pub fn new(options: LabellerOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    pub fn options(&self) -> &LabellerOptions {
        &self.options
    }

    /// Lay out `request` and submit the result to `index`.
    ///
    /// Returns whether the label was placed and accepted.
    pub fn layout(
        &self,
        request: &LabelRequest<'_>,
        canvas: &mut dyn Canvas,
        tx: &TransformPipeline,
        index: &mut LabelIndex,
    ) -> bool {
        let label = match request.placement {
            Placement::Point => self.layout_point(request, canvas, tx).map(Label::Point),
            Placement::Line => self.layout_line(request, canvas, tx).map(Label::Line),
        };
        label.is_some_and(|l| index.insert(l))
    }

    /// Place a label at the centroid of the request's geometry.
    pub fn layout_point(
        &self,
        request: &LabelRequest<'_>,
        canvas: &mut dyn Canvas,
        tx: &TransformPipeline,
    ) -> Option<PointLabel> {
        let centroid = request.geometry.centroid()?;
        let w2c = tx.world_to_canvas();
        let c2w = tx.canvas_to_world();

        let anchor =
            w2c.map_coord(centroid.0) + Vec2::new(request.style.dx, request.style.dy);

        let mut extent = canvas.measure_text(request.text, request.paint).bounds;
        if request.style.padding > 0.0 {
            extent = expand(extent, request.style.padding);
        }
        let extent = c2w.map_rect(extent);

        let anchor = c2w * anchor;
        let bounds = request
            .paint
            .align
            .anchored_box(anchor, Size::new(extent.width(), extent.height()));

        Some(PointLabel {
            text: request.text.to_owned(),
            paint: request.paint.clone(),
            anchor,
            bounds,
        })
    }

    /// Place one glyph per baseline segment along the request's line.
    ///
    /// Returns `None` for anything but a single line, lines shorter than the
    /// text, and placements that bend too sharply.
    pub fn layout_line(
        &self,
        request: &LabelRequest<'_>,
        canvas: &mut dyn Canvas,
        tx: &TransformPipeline,
    ) -> Option<LineLabel> {
        let mut line = line_coords(request.geometry)?;
        if line.len() < 2 {
            return None;
        }
        let c2w = tx.canvas_to_world();

        let metrics = canvas.measure_text(request.text, request.paint);
        let extent = c2w.map_rect(metrics.bounds);

        let length: f64 = line.windows(2).map(|w| w[0].distance(w[1])).sum();
        if length < extent.width() {
            return None;
        }

        // Read left to right.
        if line[0].x > line[line.len() - 1].x {
            line.reverse();
        }

        let widths = metrics
            .advances
            .iter()
            .map(|&w| c2w.map_rect(Rect::new(0.0, 0.0, w, 1.0)).width());
        let space = c2w.map_radius(1.0);
        let max_delta = request
            .style
            .max_angle_delta
            .unwrap_or_else(|| self.options.max_char_angle_delta.to_radians());

        let mut sampler = LineSampler::new(&line).with_tolerance(self.options.sampler_tolerance);
        let mut path: Vec<Line> = Vec::with_capacity(metrics.advances.len());
        for width in widths {
            let start = sampler.sample();
            let end = sampler.advance(width).sample();
            let (Some(start), Some(end)) = (start, end) else {
                return None;
            };
            let seg = Line::new(start, end);
            if let Some(prev) = path.last() {
                if (baseline_angle(seg) - baseline_angle(*prev)).abs() > max_delta {
                    return None;
                }
            }
            path.push(seg);
            sampler.advance(space);
        }
        if path.is_empty() {
            return None;
        }

        let shape = ribbon(&path, extent.height());
        Some(LineLabel {
            text: request.text.to_owned(),
            paint: request.paint.clone(),
            path,
            shape,
        })
    }

    /// Draw an accepted label in device space.
    pub fn render(&self, label: &Label, canvas: &mut dyn Canvas, tx: &TransformPipeline) {
        let w2c = tx.world_to_canvas();
        let mut canvas = tx.pixel_space(canvas);
        match label {
            Label::Point(l) => {
                canvas.draw_text(&l.text, w2c * l.anchor, &l.paint);
            }
            Label::Line(l) => {
                let base = canvas.transform();
                let paint = TextPaint {
                    align: TextAlign::Left,
                    ..l.paint.clone()
                };
                let mut buf = [0_u8; 4];
                for (ch, seg) in l.text.chars().zip(&l.path) {
                    let p0 = w2c * seg.p0;
                    let p1 = w2c * seg.p1;
                    let theta = baseline_angle(Line::new(p0, p1));
                    let glyph = DirectIsometry::new(theta, p0.to_vec2());
                    canvas.set_transform(base * Affine::from(glyph));
                    canvas.draw_text(ch.encode_utf8(&mut buf), Point::ORIGIN, &paint);
                }
                canvas.set_transform(base);
            }
        }
    }
}

/// Control points for a smooth cubic curve through `coords`.
///
/// Returns two control points per consecutive pair of coordinates. A `tension`
/// of `1` puts the control points on the coordinates themselves, giving
/// straight segments; `0` gives the loosest curve.
///
/// # Errors
///
/// [`Error::InvalidTension`] if `tension` is outside `[0, 1]`, and
/// [`Error::TooFewCoordinates`] for fewer than two coordinates.
pub fn cubic_spline_control_points(coords: &[Point], tension: f64) -> Result<Vec<Point>> {
    if !(0.0..=1.0).contains(&tension) {
        return Err(Error::InvalidTension(tension));
    }
    let n = coords.len();
    if n < 2 {
        return Err(Error::TooFewCoordinates(n));
    }

    let reflect = |a: Point, b: Point| a + (a - b);
    let first = reflect(coords[0], coords[1]);
    let last = reflect(coords[n - 1], coords[n - 2]);

    let mut ctrl = Vec::with_capacity(2 * (n - 1));
    let mut next = coords[0];
    let mut mid = first.midpoint(next);
    let mut dv = first.distance(next);

    for i in 0..n {
        let curr = next;
        next = if i < n - 1 { coords[i + 1] } else { last };

        let mid_prev = mid;
        mid = curr.midpoint(next);

        let dv_prev = dv;
        dv = curr.distance(next);
        let total = dv_prev + dv;
        let p = if total > 0.0 { dv_prev / total } else { 0.5 };

        let anchor = mid_prev.lerp(mid, p);
        let d = anchor - curr;

        if i > 0 {
            ctrl.push(mid_prev - d + (curr - mid_prev + d) * tension);
        }
        if i < n - 1 {
            ctrl.push(mid - d + (curr - mid + d) * tension);
        }
    }
    Ok(ctrl)
}

/// A cubic Bézier path through `coords`.
///
/// # Errors
///
/// As for [`cubic_spline_control_points`].
pub fn smooth_path(coords: &[Point], tension: f64) -> Result<BezPath> {
    let ctrl = cubic_spline_control_points(coords, tension)?;
    let mut path = BezPath::new();
    path.move_to(coords[0]);
    for (c, pair) in coords[1..].iter().zip(ctrl.chunks_exact(2)) {
        path.curve_to(pair[0], pair[1], *c);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::displaylist::DisplayList;
    use crate::view::Viewport;
    use geo::{line_string, point, MultiLineString};
    use peniko::kurbo::PathEl;

    fn setup() -> (DisplayList, TransformPipeline) {
        // 1:1 world to pixel, y flipped.
        let vp = Viewport::new(Rect::new(0.0, 0.0, 200.0, 100.0), 200, 100).unwrap();
        let tx = TransformPipeline::new(&vp).unwrap();
        (DisplayList::new(Size::new(200.0, 100.0)), tx)
    }

    fn request<'a>(
        text: &'a str,
        paint: &'a TextPaint,
        style: &'a LabelStyle,
        geometry: &'a Geometry<f64>,
        placement: Placement,
    ) -> LabelRequest<'a> {
        LabelRequest {
            text,
            paint,
            style,
            geometry,
            placement,
        }
    }

    fn near(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn point_label_box_follows_alignment() {
        let (mut canvas, tx) = setup();
        let g = Geometry::Point(point!(x: 50.0, y: 50.0));
        let style = LabelStyle::default();
        let labeller = Labeller::default();

        // "abc" at size 10 measures 18 x 10 pixels.
        let left = TextPaint::default();
        let l = labeller
            .layout_point(&request("abc", &left, &style, &g, Placement::Point), &mut canvas, &tx)
            .unwrap();
        assert!(near(l.anchor, Point::new(50.0, 50.0)));
        assert_eq!(l.bounds, Rect::new(50.0, 50.0, 68.0, 60.0));

        let right = TextPaint {
            align: TextAlign::Right,
            ..Default::default()
        };
        let r = labeller
            .layout_point(&request("abc", &right, &style, &g, Placement::Point), &mut canvas, &tx)
            .unwrap();
        assert_eq!(r.bounds, Rect::new(32.0, 50.0, 50.0, 60.0));
    }

    #[test]
    fn point_label_offsets_and_padding() {
        let (mut canvas, tx) = setup();
        let g = Geometry::Point(point!(x: 50.0, y: 50.0));
        let style = LabelStyle {
            dx: 5.0,
            dy: 10.0,
            padding: 2.0,
            ..Default::default()
        };
        let paint = TextPaint::default();
        let l = Labeller::default()
            .layout_point(&request("abc", &paint, &style, &g, Placement::Point), &mut canvas, &tx)
            .unwrap();
        // dy is in device pixels, pointing down, so the world anchor moves down.
        assert!(near(l.anchor, Point::new(55.0, 40.0)));
        assert_eq!(l.bounds.size(), Size::new(22.0, 14.0));
    }

    #[test]
    fn line_label_follows_straight_line() {
        let (mut canvas, tx) = setup();
        let g = Geometry::LineString(line_string![(x: 10.0, y: 20.0), (x: 110.0, y: 20.0)]);
        let style = LabelStyle::default();
        let paint = TextPaint::default();
        let l = Labeller::default()
            .layout_line(&request("road", &paint, &style, &g, Placement::Line), &mut canvas, &tx)
            .unwrap();
        assert_eq!(l.path.len(), 4);
        // 6 pixel glyphs separated by 1 pixel.
        assert!(near(l.path[0].p0, Point::new(10.0, 20.0)));
        assert!(near(l.path[0].p1, Point::new(16.0, 20.0)));
        assert!(near(l.path[1].p0, Point::new(17.0, 20.0)));
        // Glyph height is 10 pixels, so the ribbon is 10 units tall.
        let b = Label::Line(l).bounds();
        assert!((b.height() - 10.0).abs() < 1e-9);
        assert!((b.y0 - 20.0).abs() < 1e-9);
    }

    #[test]
    fn line_label_reads_left_to_right() {
        let (mut canvas, tx) = setup();
        let g = Geometry::LineString(line_string![(x: 110.0, y: 20.0), (x: 10.0, y: 20.0)]);
        let style = LabelStyle::default();
        let paint = TextPaint::default();
        let l = Labeller::default()
            .layout_line(&request("ab", &paint, &style, &g, Placement::Line), &mut canvas, &tx)
            .unwrap();
        assert!(near(l.path[0].p0, Point::new(10.0, 20.0)));
    }

    #[test]
    fn line_label_rejections() {
        let (mut canvas, tx) = setup();
        let style = LabelStyle::default();
        let paint = TextPaint::default();
        let labeller = Labeller::default();
        let mut index = LabelIndex::new();

        let short = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]);
        let req = request("too long", &paint, &style, &short, Placement::Line);
        assert!(!labeller.layout(&req, &mut canvas, &tx, &mut index));

        let multi = Geometry::MultiLineString(MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
            line_string![(x: 0.0, y: 10.0), (x: 100.0, y: 10.0)],
        ]));
        let req = request("ab", &paint, &style, &multi, Placement::Line);
        assert!(!labeller.layout(&req, &mut canvas, &tx, &mut index));

        // As long as the glyphs, but the gaps between them run past the end.
        let exact = Geometry::LineString(line_string![(x: 0.0, y: 50.0), (x: 24.0, y: 50.0)]);
        let req = request("abcd", &paint, &style, &exact, Placement::Line);
        assert!(labeller.layout_line(&req, &mut canvas, &tx).is_none());
        assert!(!labeller.layout(&req, &mut canvas, &tx, &mut index));

        // A right angle turn one glyph in.
        let bent = Geometry::LineString(line_string![
            (x: 10.0, y: 10.0),
            (x: 16.0, y: 10.0),
            (x: 16.0, y: 90.0),
        ]);
        let req = request("abc", &paint, &style, &bent, Placement::Line);
        assert!(labeller.layout_line(&req, &mut canvas, &tx).is_none());
        assert!(!labeller.layout(&req, &mut canvas, &tx, &mut index));
        assert!(index.is_empty());

        // The same turn is fine with a permissive limit.
        let loose = LabelStyle {
            max_angle_delta: Some(core::f64::consts::PI),
            ..Default::default()
        };
        let req = request("abc", &paint, &loose, &bent, Placement::Line);
        assert!(labeller.layout(&req, &mut canvas, &tx, &mut index));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn line_labels_render_per_glyph() {
        let (mut canvas, tx) = setup();
        let g = Geometry::LineString(line_string![(x: 10.0, y: 20.0), (x: 110.0, y: 20.0)]);
        let style = LabelStyle::default();
        let paint = TextPaint::default();
        let labeller = Labeller::default();
        let l = labeller
            .layout_line(&request("hey", &paint, &style, &g, Placement::Line), &mut canvas, &tx)
            .unwrap();
        labeller.render(&Label::Line(l), &mut canvas, &tx);
        let glyphs: Vec<_> = canvas.texts().map(|(a, t, o)| (t.to_owned(), *a * o)).collect();
        assert_eq!(glyphs.len(), 3);
        assert_eq!(glyphs[0].0, "h");
        // World y = 20 is device y = 80.
        assert!(near(glyphs[0].1, Point::new(10.0, 80.0)));
        assert_eq!(canvas.transform(), Affine::IDENTITY);
    }

    #[test]
    fn spline_control_points() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ];
        let loose = cubic_spline_control_points(&pts, 0.0).unwrap();
        assert_eq!(
            loose,
            vec![
                Point::new(0.5, 0.0),
                Point::new(0.5, 0.0),
                Point::new(1.5, 0.0),
                Point::new(1.5, 0.0),
            ]
        );
        let tight = cubic_spline_control_points(&pts, 1.0).unwrap();
        assert_eq!(tight, vec![pts[0], pts[1], pts[1], pts[2]]);
    }

    #[test]
    fn spline_rejects_bad_input() {
        let pts = [Point::ORIGIN, Point::new(1.0, 1.0)];
        assert!(matches!(
            cubic_spline_control_points(&pts, 1.5),
            Err(Error::InvalidTension(_))
        ));
        assert!(matches!(
            cubic_spline_control_points(&pts[..1], 0.5),
            Err(Error::TooFewCoordinates(1))
        ));
        assert_eq!(cubic_spline_control_points(&pts, 0.5).unwrap().len(), 2);
    }

    #[test]
    fn smooth_path_has_one_curve_per_segment() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(20.0, 0.0),
        ];
        let path = smooth_path(&pts, 0.5).unwrap();
        let els = path.elements();
        assert_eq!(els.len(), 3);
        assert!(matches!(els[0], PathEl::MoveTo(p) if p == pts[0]));
        assert!(matches!(els[2], PathEl::CurveTo(_, _, p) if p == pts[2]));
    }
}
