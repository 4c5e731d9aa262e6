// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The closed set of style properties understood by the renderer.

use peniko::Color;

use super::value::Value;

/// The type a property's value is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `true` or `false`.
    Bool,
    /// A single number.
    Number,
    /// A list of numbers.
    Numbers,
    /// A colour.
    Color,
    /// Free text.
    Text,
    /// One of a fixed set of names.
    Keyword,
}

macro_rules! properties {
    ($($(#[$doc:meta])* $variant:ident = $name:literal : $kind:ident $(= $default:expr)?;)*) => {
        /// A recognised style property.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Property {
            $($(#[$doc])* $variant,)*
        }

        impl Property {
            /// Every property, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// The property's CartoCSS name.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Look up a property by its CartoCSS name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// The type values of this property are coerced to.
            pub fn kind(self) -> ValueKind {
                match self {
                    $(Self::$variant => ValueKind::$kind,)*
                }
            }

            /// Value used when no rule sets the property, if there is one.
            pub fn default_value(self) -> Option<Value> {
                match self {
                    $(Self::$variant => properties!(@default $($default)?),)*
                }
            }
        }
    };
    (@default) => { None };
    (@default $default:expr) => { Some($default) };
}

properties! {
    /// Whether shapes and text are anti-aliased.
    AntiAlias = "anti-alias": Bool = Value::Bool(true);
    /// Map background colour.
    BackgroundColor = "background-color": Color;
    /// Opacity of the map background.
    Opacity = "opacity": Number = Value::Number(1.0);
    /// Composition mode used when a symbolizer has none of its own.
    CompOp = "comp-op": Keyword;
    /// Draw order of a rule group within its layer.
    ZIndex = "z-index": Number = Value::Number(0.0);

    /// Stroke colour of lines and polygon outlines.
    LineColor = "line-color": Color;
    /// Stroke width in pixels.
    LineWidth = "line-width": Number = Value::Number(1.0);
    /// Stroke opacity.
    LineOpacity = "line-opacity": Number = Value::Number(1.0);
    /// `miter`, `round` or `bevel`.
    LineJoin = "line-join": Keyword = Value::keyword("miter");
    /// `butt`, `round` or `square`.
    LineCap = "line-cap": Keyword = Value::keyword("butt");
    /// Dash lengths in pixels.
    LineDasharray = "line-dasharray": Numbers;
    /// Dash offset in pixels.
    LineDashOffset = "line-dash-offset": Number = Value::Number(0.0);
    /// Composition mode of line strokes.
    LineCompOp = "line-comp-op": Keyword;

    /// Polygon fill colour.
    PolygonFill = "polygon-fill": Color;
    /// Polygon fill opacity.
    PolygonOpacity = "polygon-opacity": Number = Value::Number(1.0);
    /// Composition mode of polygon fills.
    PolygonCompOp = "polygon-comp-op": Keyword;

    /// Marker fill colour.
    MarkerFill = "marker-fill": Color;
    /// Marker fill opacity.
    MarkerFillOpacity = "marker-fill-opacity": Number = Value::Number(1.0);
    /// Marker outline colour.
    MarkerLineColor = "marker-line-color": Color;
    /// Marker outline width in pixels.
    MarkerLineWidth = "marker-line-width": Number = Value::Number(1.0);
    /// Marker outline opacity.
    MarkerLineOpacity = "marker-line-opacity": Number = Value::Number(1.0);
    /// Marker width in pixels.
    MarkerWidth = "marker-width": Number = Value::Number(10.0);
    /// Marker height in pixels, defaulting to the width.
    MarkerHeight = "marker-height": Number;
    /// Composition mode of markers.
    MarkerCompOp = "marker-comp-op": Keyword;

    /// Label text, usually an attribute expression such as `[name]`.
    TextName = "text-name": Text;
    /// Glyph colour.
    TextFill = "text-fill": Color = Value::Color(Color::BLACK);
    /// Font size in pixels.
    TextSize = "text-size": Number = Value::Number(10.0);
    /// `left`, `center` or `right`.
    TextAlign = "text-align": Keyword = Value::keyword("left");
    /// Halo colour.
    TextHaloFill = "text-halo-fill": Color;
    /// Halo radius in pixels.
    TextHaloRadius = "text-halo-radius": Number = Value::Number(0.0);
    /// Horizontal label offset in pixels.
    TextDx = "text-dx": Number = Value::Number(0.0);
    /// Vertical label offset in pixels.
    TextDy = "text-dy": Number = Value::Number(0.0);
    /// Extra space kept clear around point labels, in pixels.
    TextMinPadding = "text-min-padding": Number = Value::Number(0.0);
    /// Largest bend between consecutive glyphs of a line label, in degrees.
    TextMaxCharAngleDelta = "text-max-char-angle-delta": Number = Value::Number(22.5);

    /// Raster layer opacity.
    RasterOpacity = "raster-opacity": Number = Value::Number(1.0);
    /// Composition mode of raster tiles.
    RasterCompOp = "raster-comp-op": Keyword;
}

impl core::fmt::Display for Property {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for &p in Property::ALL {
            assert_eq!(Property::from_name(p.name()), Some(p));
        }
        assert_eq!(Property::from_name("line-widht"), None);
    }

    #[test]
    fn documented_defaults() {
        assert_eq!(Property::LineWidth.default_value(), Some(Value::Number(1.0)));
        assert_eq!(Property::MarkerWidth.default_value(), Some(Value::Number(10.0)));
        assert_eq!(
            Property::LineJoin.default_value(),
            Some(Value::Keyword("miter".into()))
        );
        assert_eq!(Property::AntiAlias.default_value(), Some(Value::Bool(true)));
        assert_eq!(Property::MarkerHeight.default_value(), None);
        assert_eq!(Property::LineColor.kind(), ValueKind::Color);
    }
}
