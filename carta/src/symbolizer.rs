// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolution of collapsed style rules into paints.
//!
//! Every function here is total: missing properties take their documented
//! defaults and unrecognised values are logged and replaced, never reported
//! as errors. `None` means the rule asks for nothing to be drawn.

use peniko::kurbo::{Affine, Cap, Join, Stroke};
use peniko::{BlendMode, Color, Compose, Mix};

use crate::paint::{FatPaint, Halo, ImagePaint, TextPaint};
use crate::source::Feature;
use crate::style::{Property, Rule};
use crate::text::TextAlign;
use crate::transform::AffineExt;

/// Multiply `opacity`, clamped to `[0, 1]`, into the alpha of `color`.
pub fn with_opacity(color: Color, opacity: f64) -> Color {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "opacity is clamped to [0, 1] first"
    )]
    let opacity = opacity.clamp(0.0, 1.0) as f32;
    color.multiply_alpha(opacity)
}

/// Parse a `line-cap` name, ignoring case.
pub fn parse_cap(s: &str) -> Option<Cap> {
    match s.trim().to_ascii_lowercase().as_str() {
        "butt" => Some(Cap::Butt),
        "round" => Some(Cap::Round),
        "square" => Some(Cap::Square),
        _ => None,
    }
}

/// Parse a `line-join` name, ignoring case.
pub fn parse_join(s: &str) -> Option<Join> {
    match s.trim().to_ascii_lowercase().as_str() {
        "miter" => Some(Join::Miter),
        "round" => Some(Join::Round),
        "bevel" => Some(Join::Bevel),
        _ => None,
    }
}

/// Parse a `text-align` name, ignoring case.
pub fn parse_align(s: &str) -> Option<TextAlign> {
    match s.trim().to_ascii_lowercase().as_str() {
        "left" => Some(TextAlign::Left),
        "center" | "centre" => Some(TextAlign::Center),
        "right" => Some(TextAlign::Right),
        _ => None,
    }
}

fn keyword<T>(
    rule: &Rule,
    feature: Option<&Feature>,
    property: Property,
    parse: fn(&str) -> Option<T>,
    fallback: T,
) -> T {
    let Some(s) = rule.string(property, feature) else {
        return fallback;
    };
    parse(&s).unwrap_or_else(|| {
        tracing::debug!(%property, value = %s, "unrecognized value, using default");
        fallback
    })
}

/// Resolved `line-cap`.
pub fn line_cap(rule: &Rule, feature: Option<&Feature>) -> Cap {
    keyword(rule, feature, Property::LineCap, parse_cap, Cap::Butt)
}

/// Resolved `line-join`.
pub fn line_join(rule: &Rule, feature: Option<&Feature>) -> Join {
    keyword(rule, feature, Property::LineJoin, parse_join, Join::Miter)
}

/// Resolved `text-align`.
pub fn text_align(rule: &Rule, feature: Option<&Feature>) -> TextAlign {
    keyword(rule, feature, Property::TextAlign, parse_align, TextAlign::Left)
}

/// Resolved `anti-alias`.
pub fn anti_alias(rule: &Rule, feature: Option<&Feature>) -> bool {
    rule.boolean(Property::AntiAlias, feature).unwrap_or(true)
}

/// The blend mode for a CartoCSS `comp-op` name.
///
/// Returns `None` for `src-over`, which is the normal mode, and for operators
/// with no equivalent.
pub fn blend_mode(comp_op: &str) -> Option<BlendMode> {
    let mode: BlendMode = match comp_op.trim().replace('_', "-").to_ascii_lowercase().as_str() {
        "src-over" => return None,
        "clear" => Compose::Clear.into(),
        "src" => Compose::Copy.into(),
        "dst" => Compose::Dest.into(),
        "dst-over" => Compose::DestOver.into(),
        "src-in" => Compose::SrcIn.into(),
        "dst-in" => Compose::DestIn.into(),
        "src-out" => Compose::SrcOut.into(),
        "dst-out" => Compose::DestOut.into(),
        "src-atop" => Compose::SrcAtop.into(),
        "dst-atop" => Compose::DestAtop.into(),
        "xor" => Compose::Xor.into(),
        "plus" => Compose::Plus.into(),
        "multiply" => Mix::Multiply.into(),
        "screen" => Mix::Screen.into(),
        "overlay" => Mix::Overlay.into(),
        "darken" => Mix::Darken.into(),
        "lighten" => Mix::Lighten.into(),
        "color-dodge" => Mix::ColorDodge.into(),
        "color-burn" => Mix::ColorBurn.into(),
        "hard-light" => Mix::HardLight.into(),
        "soft-light" => Mix::SoftLight.into(),
        "difference" => Mix::Difference.into(),
        "exclusion" => Mix::Exclusion.into(),
        "hue" => Mix::Hue.into(),
        "saturation" => Mix::Saturation.into(),
        "color" => Mix::Color.into(),
        "value" => Mix::Luminosity.into(),
        _ => {
            tracing::debug!(comp_op, "unsupported composition operation");
            return None;
        }
    };
    Some(mode)
}

/// The blend mode from `specific` (such as `line-comp-op`), else from `comp-op`.
pub fn comp_op(rule: &Rule, feature: Option<&Feature>, specific: Property) -> Option<BlendMode> {
    rule.string(specific, feature)
        .or_else(|| rule.string(Property::CompOp, feature))
        .and_then(|s| blend_mode(&s))
}

/// Make a dash pattern even-length.
///
/// Odd patterns longer than two lose their last entry; shorter ones are
/// repeated once.
pub fn repair_dashes(mut dashes: Vec<f64>) -> Vec<f64> {
    if dashes.len() % 2 == 0 {
        return dashes;
    }
    tracing::debug!(?dashes, "dash array has an odd number of entries");
    if dashes.len() > 2 {
        dashes.pop();
    } else {
        dashes.extend_from_within(..);
    }
    dashes
}

/// Convert a device pixel width to world units with `canvas_to_world`.
pub fn stroke_width(px: f64, canvas_to_world: &Affine) -> f64 {
    if px == 0.0 {
        px
    } else {
        canvas_to_world.map_radius(px)
    }
}

fn base(rule: &Rule, feature: Option<&Feature>) -> FatPaint {
    FatPaint {
        anti_alias: anti_alias(rule, feature),
        ..Default::default()
    }
}

/// Full-surface fill for the map background, from `background-color` and `opacity`.
pub fn background(rule: &Rule) -> Option<FatPaint> {
    let color = rule.color(Property::BackgroundColor, None)?;
    let opacity = rule.number(Property::Opacity, None).unwrap_or(1.0);
    Some(FatPaint {
        fill_paint: Some(with_opacity(color, opacity).into()),
        blend: comp_op(rule, None, Property::CompOp),
        ..base(rule, None)
    })
}

/// Stroke for line geometry, in world units. Lines are always stroked,
/// black and one pixel wide by default.
pub fn line_paint(rule: &Rule, feature: Option<&Feature>, canvas_to_world: &Affine) -> FatPaint {
    let color = rule.color(Property::LineColor, feature).unwrap_or(Color::BLACK);
    let opacity = rule.number(Property::LineOpacity, feature).unwrap_or(1.0);
    let width = rule.number(Property::LineWidth, feature).unwrap_or(1.0);

    let mut stroke = Stroke::new(stroke_width(width, canvas_to_world))
        .with_join(line_join(rule, feature))
        .with_caps(line_cap(rule, feature));

    if let Some(dashes) = rule.numbers(Property::LineDasharray, feature) {
        let dashes = repair_dashes(dashes);
        if !dashes.is_empty() {
            let offset = rule.number(Property::LineDashOffset, feature).unwrap_or(0.0);
            stroke = stroke.with_dashes(
                stroke_width(offset, canvas_to_world),
                dashes.into_iter().map(|d| stroke_width(d, canvas_to_world)),
            );
        }
    }

    FatPaint {
        stroke,
        stroke_paint: Some(with_opacity(color, opacity).into()),
        blend: comp_op(rule, feature, Property::LineCompOp),
        ..base(rule, feature)
    }
}

/// Fill for polygons, only when `polygon-fill` is set.
pub fn polygon_fill(rule: &Rule, feature: Option<&Feature>) -> Option<FatPaint> {
    let color = rule.color(Property::PolygonFill, feature)?;
    let opacity = rule.number(Property::PolygonOpacity, feature).unwrap_or(1.0);
    Some(FatPaint {
        fill_paint: Some(with_opacity(color, opacity).into()),
        blend: comp_op(rule, feature, Property::PolygonCompOp),
        ..base(rule, feature)
    })
}

/// Outline for polygons, only when `line-color` is set.
pub fn polygon_line(
    rule: &Rule,
    feature: Option<&Feature>,
    canvas_to_world: &Affine,
) -> Option<FatPaint> {
    let color = rule.color(Property::LineColor, feature)?;
    let opacity = rule.number(Property::LineOpacity, feature).unwrap_or(1.0);
    let width = rule.number(Property::LineWidth, feature).unwrap_or(1.0);
    Some(FatPaint {
        stroke: Stroke::new(stroke_width(width, canvas_to_world)),
        stroke_paint: Some(with_opacity(color, opacity).into()),
        blend: comp_op(rule, feature, Property::LineCompOp),
        ..base(rule, feature)
    })
}

/// Marker fill, only when `marker-fill` is set.
pub fn marker_fill(rule: &Rule, feature: Option<&Feature>) -> Option<FatPaint> {
    let color = rule.color(Property::MarkerFill, feature)?;
    let opacity = rule.number(Property::MarkerFillOpacity, feature).unwrap_or(1.0);
    Some(FatPaint {
        fill_paint: Some(with_opacity(color, opacity).into()),
        blend: comp_op(rule, feature, Property::MarkerCompOp),
        ..base(rule, feature)
    })
}

/// Marker outline in device pixels, only when `marker-line-color` is set.
pub fn marker_line(rule: &Rule, feature: Option<&Feature>) -> Option<FatPaint> {
    let color = rule.color(Property::MarkerLineColor, feature)?;
    let opacity = rule.number(Property::MarkerLineOpacity, feature).unwrap_or(1.0);
    let width = rule.number(Property::MarkerLineWidth, feature).unwrap_or(1.0);
    Some(FatPaint {
        stroke: Stroke::new(width),
        stroke_paint: Some(with_opacity(color, opacity).into()),
        blend: comp_op(rule, feature, Property::MarkerCompOp),
        ..base(rule, feature)
    })
}

/// Marker size in device pixels; the height defaults to the width.
pub fn marker_size(rule: &Rule, feature: Option<&Feature>) -> (f64, f64) {
    let width = rule.number(Property::MarkerWidth, feature).unwrap_or(10.0);
    let height = rule.number(Property::MarkerHeight, feature).unwrap_or(width);
    (width, height)
}

/// Text paint for labels.
pub fn label_paint(rule: &Rule, feature: Option<&Feature>) -> TextPaint {
    let halo = rule.color(Property::TextHaloFill, feature).map(|color| Halo {
        color,
        radius: rule.number(Property::TextHaloRadius, feature).unwrap_or(0.0),
    });
    TextPaint {
        fill: rule.color(Property::TextFill, feature).unwrap_or(Color::BLACK),
        size: rule.number(Property::TextSize, feature).unwrap_or(10.0),
        align: text_align(rule, feature),
        halo,
        anti_alias: anti_alias(rule, feature),
    }
}

/// Placement parameters for labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    /// Horizontal offset in pixels.
    pub dx: f64,
    /// Vertical offset in pixels, positive downwards.
    pub dy: f64,
    /// Clearance kept around point labels, in pixels.
    pub padding: f64,
    /// Largest bend between consecutive glyphs, in radians. `None` uses the
    /// labeller's default.
    pub max_angle_delta: Option<f64>,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            padding: 0.0,
            max_angle_delta: None,
        }
    }
}

/// Label placement parameters.
pub fn label_style(rule: &Rule, feature: Option<&Feature>) -> LabelStyle {
    let max_angle_delta = if rule.has(Property::TextMaxCharAngleDelta) {
        rule.number(Property::TextMaxCharAngleDelta, feature)
            .map(f64::to_radians)
    } else {
        None
    };
    LabelStyle {
        dx: rule.number(Property::TextDx, feature).unwrap_or(0.0),
        dy: rule.number(Property::TextDy, feature).unwrap_or(0.0),
        padding: rule.number(Property::TextMinPadding, feature).unwrap_or(0.0),
        max_angle_delta,
    }
}

/// Bitmap paint for raster layers.
pub fn raster_paint(rule: &Rule) -> ImagePaint {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "opacity is clamped to [0, 1] first"
    )]
    let opacity = rule
        .number(Property::RasterOpacity, None)
        .unwrap_or(1.0)
        .clamp(0.0, 1.0) as f32;
    ImagePaint {
        opacity,
        blend: comp_op(rule, None, Property::RasterCompOp),
        anti_alias: anti_alias(rule, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Value;
    use peniko::Brush;

    fn solid(b: &Option<Brush>) -> Color {
        match b {
            Some(Brush::Solid(c)) => *c,
            other => panic!("expected a solid brush, got {other:?}"),
        }
    }

    #[test]
    fn dash_repair() {
        assert_eq!(repair_dashes(vec![1.0, 2.0, 3.0]), vec![1.0, 2.0]);
        assert_eq!(repair_dashes(vec![4.0]), vec![4.0, 4.0]);
        assert_eq!(repair_dashes(vec![5.0, 1.0, 2.0, 3.0, 4.0]).len(), 4);
        assert_eq!(repair_dashes(vec![1.0, 2.0]), vec![1.0, 2.0]);
        assert!(repair_dashes(vec![]).is_empty());
    }

    #[test]
    fn enum_values_fall_back() {
        let rule = Rule::default()
            .with(Property::LineCap, Value::keyword("ROUND"))
            .with(Property::LineJoin, Value::keyword("pointy"))
            .with(Property::TextAlign, Value::keyword("Center"));
        assert_eq!(line_cap(&rule, None), Cap::Round);
        assert_eq!(line_join(&rule, None), Join::Miter);
        assert_eq!(text_align(&rule, None), TextAlign::Center);
        assert_eq!(line_cap(&Rule::default(), None), Cap::Butt);
    }

    #[test]
    fn comp_ops() {
        assert_eq!(blend_mode("multiply"), Some(Mix::Multiply.into()));
        assert_eq!(blend_mode("DST_OUT"), Some(Compose::DestOut.into()));
        assert_eq!(blend_mode("src-over"), None);
        assert_eq!(blend_mode("grain-merge"), None);

        let rule = Rule::default()
            .with(Property::CompOp, Value::keyword("screen"))
            .with(Property::LineCompOp, Value::keyword("darken"));
        assert_eq!(
            comp_op(&rule, None, Property::LineCompOp),
            Some(Mix::Darken.into())
        );
        assert_eq!(
            comp_op(&rule, None, Property::PolygonCompOp),
            Some(Mix::Screen.into())
        );
    }

    #[test]
    fn opacity_multiplies_alpha() {
        let rule = Rule::default()
            .with(Property::PolygonFill, Color::from_rgba8(255, 0, 0, 255))
            .with(Property::PolygonOpacity, 0.5);
        let paint = polygon_fill(&rule, None).unwrap();
        let c = solid(&paint.fill_paint);
        assert!((c.components[3] - 0.5).abs() < 1e-6);
        assert!(paint.stroke_paint.is_none());
    }

    #[test]
    fn widths_scale_to_world() {
        let c2w = Affine::scale(0.5);
        let rule = Rule::default()
            .with(Property::LineWidth, 4.0)
            .with(Property::LineDasharray, vec![2.0, 4.0, 6.0]);
        let paint = line_paint(&rule, None, &c2w);
        assert!((paint.stroke.width - 2.0).abs() < 1e-12);
        assert_eq!(paint.stroke.dash_pattern.as_slice(), &[1.0, 2.0]);
        assert_eq!(solid(&paint.stroke_paint).components, Color::BLACK.components);
    }

    #[test]
    fn polygons_need_declared_colors() {
        let rule = Rule::default();
        assert!(polygon_fill(&rule, None).is_none());
        assert!(polygon_line(&rule, None, &Affine::IDENTITY).is_none());
        assert!(marker_fill(&rule, None).is_none());
        assert!(marker_line(&rule, None).is_none());
        assert_eq!(marker_size(&rule, None), (10.0, 10.0));
        let rule = rule.with(Property::MarkerWidth, 6.0);
        assert_eq!(marker_size(&rule, None), (6.0, 6.0));
    }

    #[test]
    fn label_defaults() {
        let rule = Rule::default().with(Property::TextHaloFill, Color::WHITE);
        let paint = label_paint(&rule, None);
        assert_eq!(paint.size, 10.0);
        assert_eq!(paint.align, TextAlign::Left);
        assert_eq!(paint.halo.map(|h| h.radius), Some(0.0));
        assert_eq!(label_style(&rule, None), LabelStyle::default());

        let bent = Rule::default().with(Property::TextMaxCharAngleDelta, 45.0);
        let max = label_style(&bent, None).max_angle_delta.unwrap();
        assert!((max - core::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }
}
