// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end rendering into a [`DisplayList`].

use std::sync::Arc;

use carta::displaylist::DisplayItem;
use carta::peniko::kurbo::{Point, Rect, Shape, Size};
use carta::peniko::Color;
use carta::source::{FeatureCursor, MemoryFeatureSource, MemoryTileSource, Query};
use carta::style::{Property, Rule, Selector, Value};
use carta::tile::TilePyramid;
use carta::{
    Crs, DisplayList, Error, Feature, FeatureSource, Layer, Map, Renderer, SourceError, Style,
    Viewport,
};
use geo::{line_string, point, Geometry, GeometryCollection};

/// 1:1 world to pixel over a 100 by 100 view.
fn renderer() -> Renderer {
    let mut r = Renderer::new();
    r.init(Viewport::new(Rect::new(0.0, 0.0, 100.0, 100.0), 100, 100).unwrap())
        .unwrap();
    r
}

fn canvas() -> DisplayList {
    DisplayList::new(Size::new(100.0, 100.0))
}

fn points(features: impl IntoIterator<Item = Feature>) -> Arc<dyn FeatureSource> {
    Arc::new(features.into_iter().collect::<MemoryFeatureSource>())
}

struct Offline;

impl FeatureSource for Offline {
    fn crs(&self) -> Option<Crs> {
        None
    }

    fn cursor(&self, _: &Query) -> Result<FeatureCursor<'_>, SourceError> {
        Err(SourceError::Message("offline".into()))
    }
}

#[test]
fn marker_is_centered_on_feature() {
    let style = Style::new(vec![Rule::new(Selector::id("pois"))
        .with(Property::LineWidth, 2.0)
        .with(Property::MarkerFill, Color::from_rgb8(200, 0, 0))]);
    let map = Map::new(style).with_layer(Layer::vector(
        "pois",
        points([Feature::new("a").with_geometry(point!(x: 30.0, y: 40.0))]),
    ));

    let mut r = renderer();
    let mut canvas = canvas();
    let report = r.render(&map, &mut canvas).unwrap();
    assert_eq!(report.layers_drawn, 1);
    assert_eq!(report.features_drawn, 1);

    let paths: Vec<_> = canvas.paths().collect();
    assert_eq!(paths.len(), 1);
    let (transform, path, paint) = paths[0];
    assert!(paint.fill_paint.is_some());
    let b = (*transform * path.clone()).bounding_box();
    assert!((b.center().x - 30.0).abs() < 0.05, "{b:?}");
    assert!((b.center().y - 60.0).abs() < 0.05, "{b:?}");
    assert!((b.width() / 2.0 - 5.0).abs() < 0.05, "{b:?}");
    assert!((b.height() / 2.0 - 5.0).abs() < 0.05, "{b:?}");
}

#[test]
fn failing_layer_is_skipped() {
    let style = Style::new(vec![
        Rule::new(Selector::any()).with(Property::MarkerFill, Color::from_rgb8(0, 0, 200))
    ]);
    let map = Map::new(style)
        .with_layer(Layer::vector("broken", Arc::new(Offline)))
        .with_layer(Layer::vector(
            "pois",
            points([Feature::new("a").with_geometry(point!(x: 10.0, y: 10.0))]),
        ));

    let mut r = renderer();
    let mut canvas = canvas();
    let report = r.render(&map, &mut canvas).unwrap();
    assert_eq!(report.layers_drawn, 1);
    assert_eq!(report.layers_failed(), 1);
    assert!(matches!(
        &report.failures[0],
        Error::Source { layer, .. } if layer == "broken"
    ));
    assert_eq!(canvas.paths().count(), 1);
}

#[test]
fn geometry_collections_are_reported_and_skipped() {
    let style = Style::new(vec![
        Rule::new(Selector::id("pois")).with(Property::MarkerFill, Color::from_rgb8(0, 0, 200))
    ]);
    let mixed = GeometryCollection(vec![Geometry::from(point!(x: 20.0, y: 20.0))]);
    let map = Map::new(style).with_layer(Layer::vector(
        "pois",
        points([
            Feature::new("mixed").with_geometry(Geometry::GeometryCollection(mixed)),
            Feature::new("a").with_geometry(point!(x: 10.0, y: 10.0)),
        ]),
    ));

    let mut r = renderer();
    let mut canvas = canvas();
    let report = r.render(&map, &mut canvas).unwrap();
    assert_eq!(report.layers_drawn, 1);
    assert_eq!(report.layers_failed(), 0);
    assert_eq!(report.features_drawn, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0],
        Error::UnsupportedGeometry("GeometryCollection")
    ));

    let paths: Vec<_> = canvas.paths().collect();
    assert_eq!(paths.len(), 1);
    let (transform, path, _) = paths[0];
    let b = (*transform * path.clone()).bounding_box();
    assert!((b.center().x - 10.0).abs() < 0.05, "{b:?}");
    assert!((b.center().y - 90.0).abs() < 0.05, "{b:?}");
}

#[test]
fn hidden_layers_are_not_queried() {
    let map = Map::new(Style::default())
        .with_layer(Layer::vector("broken", Arc::new(Offline)).with_visible(false));
    let report = renderer().render(&map, &mut canvas()).unwrap();
    assert_eq!(report.layers_drawn, 0);
    assert_eq!(report.layers_failed(), 0);
}

#[test]
fn colliding_labels_first_wins() {
    let style = Style::new(vec![
        Rule::new(Selector::id("towns")).with(Property::TextName, Value::attr("name"))
    ]);
    let map = Map::new(style).with_layer(Layer::vector(
        "towns",
        points([
            Feature::new("1")
                .with_attribute("name", "first")
                .with_geometry(point!(x: 50.0, y: 50.0)),
            Feature::new("2")
                .with_attribute("name", "second")
                .with_geometry(point!(x: 52.0, y: 51.0)),
            Feature::new("3")
                .with_attribute("name", "far")
                .with_geometry(point!(x: 10.0, y: 90.0)),
        ]),
    ));

    let mut r = renderer();
    let mut canvas = canvas();
    let report = r.render(&map, &mut canvas).unwrap();
    assert_eq!(report.labels_accepted, 2);
    assert_eq!(report.labels_rejected, 1);
    assert_eq!(r.labels().len(), 2);

    let texts: Vec<_> = canvas.texts().map(|(_, t, _)| t.to_owned()).collect();
    assert_eq!(texts, ["first", "far"]);
    let (_, _, origin) = canvas.texts().next().unwrap();
    assert_eq!(origin, Point::new(50.0, 50.0));
}

#[test]
fn line_labels_are_drawn_per_glyph() {
    let style = Style::new(vec![Rule::new(Selector::id("roads"))
        .with(Property::LineColor, Color::from_rgb8(90, 90, 90))
        .with(Property::TextName, "main")]);
    let map = Map::new(style).with_layer(Layer::vector(
        "roads",
        points([Feature::new("r")
            .with_geometry(line_string![(x: 90.0, y: 20.0), (x: 10.0, y: 20.0)])]),
    ));

    let mut r = renderer();
    let mut canvas = canvas();
    let report = r.render(&map, &mut canvas).unwrap();
    assert_eq!(report.labels_accepted, 1);
    assert_eq!(canvas.paths().count(), 1);

    let glyphs: Vec<_> = canvas.texts().map(|(a, t, o)| (t.to_owned(), *a * o)).collect();
    assert_eq!(glyphs.len(), 4);
    assert_eq!(glyphs[0].0, "m");
    // The line is reversed to read left to right.
    assert!((glyphs[0].1.x - 10.0).abs() < 1e-9);
    assert!((glyphs[0].1.y - 80.0).abs() < 1e-9);
}

#[test]
fn background_then_z_groups() {
    let style = Style::new(vec![
        Rule::new(Selector::name("Map")).with(Property::BackgroundColor, Color::WHITE),
        Rule::new(Selector::id("roads"))
            .with(Property::ZIndex, 1.0)
            .with(Property::LineColor, Color::from_rgb8(200, 0, 0)),
        Rule::new(Selector::id("roads"))
            .with(Property::LineColor, Color::from_rgb8(0, 0, 0))
            .with(Property::LineWidth, 3.0),
    ]);
    let map = Map::new(style).with_layer(Layer::vector(
        "roads",
        points([Feature::new("r")
            .with_geometry(line_string![(x: 10.0, y: 20.0), (x: 90.0, y: 20.0)])]),
    ));

    let mut canvas = canvas();
    renderer().render(&map, &mut canvas).unwrap();
    let paths: Vec<_> = canvas.paths().collect();
    assert_eq!(paths.len(), 3);

    let (_, bg, paint) = paths[0];
    assert!(paint.fill_paint.is_some());
    assert_eq!(bg.bounding_box(), Rect::new(0.0, 0.0, 100.0, 100.0));

    // Casing drawn first, from the lower z-index group.
    assert!((paths[1].2.stroke.width - 3.0).abs() < 1e-9);
    assert!((paths[2].2.stroke.width - 1.0).abs() < 1e-9);
}

#[test]
fn canvas_transform_survives_render() {
    let style = Style::new(vec![
        Rule::new(Selector::any()).with(Property::MarkerFill, Color::BLACK)
    ]);
    let map = Map::new(style).with_layer(Layer::vector(
        "pois",
        points([Feature::new("a").with_geometry(point!(x: 30.0, y: 40.0))]),
    ));
    let mut canvas = canvas();
    let surface = carta::peniko::kurbo::Affine::translate((7.0, 3.0));
    carta::Canvas::set_transform(&mut canvas, surface);
    renderer().render(&map, &mut canvas).unwrap();
    assert_eq!(carta::Canvas::transform(&canvas), surface);

    // Markers are drawn under the surface transform only.
    let (transform, _, _) = canvas.paths().next().unwrap();
    assert_eq!(*transform, surface);
}

fn shift(p: Point, from: &Crs, to: &Crs) -> Result<Point, SourceError> {
    match (from.code(), to.code()) {
        ("view", "native") => Ok(Point::new(p.x + 1000.0, p.y)),
        ("native", "view") => Ok(Point::new(p.x - 1000.0, p.y)),
        _ => Err(SourceError::Message(format!("cannot go from {from} to {to}"))),
    }
}

#[test]
fn queries_are_reprojected() {
    let mut source = MemoryFeatureSource::new()
        .with_crs(Crs::new("native"))
        .with_reprojector(Arc::new(shift));
    source.push(Feature::new("a").with_geometry(point!(x: 1030.0, y: 40.0)));
    let style = Style::new(vec![
        Rule::new(Selector::any()).with(Property::MarkerFill, Color::BLACK)
    ]);
    let map = Map::new(style).with_layer(Layer::vector("pois", Arc::new(source)));

    let view = Viewport::new(Rect::new(0.0, 0.0, 100.0, 100.0), 100, 100)
        .unwrap()
        .with_crs(Crs::new("view"));
    let mut r = Renderer::new().with_reprojector(Arc::new(shift));
    r.init(view).unwrap();

    let mut canvas = canvas();
    let report = r.render(&map, &mut canvas).unwrap();
    assert_eq!(report.features_drawn, 1);
    let (_, path, _) = canvas.paths().next().unwrap();
    let c = path.bounding_box().center();
    assert!((c.x - 30.0).abs() < 0.05 && (c.y - 60.0).abs() < 0.05, "{c:?}");
}

#[cfg(feature = "png")]
fn red_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

#[cfg(feature = "png")]
#[test]
fn tiles_are_composited_and_missing_tiles_are_blank() {
    let pyramid = TilePyramid::new(Rect::new(0.0, 0.0, 100.0, 100.0), 4, 4).with_grid(0, 2, 1);
    let mut tiles = MemoryTileSource::new(pyramid);
    tiles.insert(0, 0, 0, red_png());
    let style = Style::new(vec![
        Rule::new(Selector::id("base")).with(Property::RasterOpacity, 0.5)
    ]);
    let map = Map::new(style).with_layer(Layer::tiles("base", Arc::new(tiles)));

    let mut canvas = canvas();
    let report = renderer().render(&map, &mut canvas).unwrap();
    assert_eq!(report.layers_drawn, 1);

    let images: Vec<_> = canvas
        .items
        .iter()
        .filter_map(|i| match i {
            DisplayItem::Image {
                image,
                src,
                dst,
                paint,
                ..
            } => Some((image, *src, *dst, paint.opacity)),
            _ => None,
        })
        .collect();
    assert_eq!(images.len(), 2);

    let (red, src, dst, opacity) = &images[0];
    assert_eq!(*src, Rect::new(0.0, 0.0, 4.0, 4.0));
    assert_eq!(*dst, Rect::new(0.0, 0.0, 50.0, 100.0));
    assert!((opacity - 0.5).abs() < 1e-6);
    assert_eq!(&red.data.data()[..4], &[255, 0, 0, 255]);

    let (blank, _, dst, _) = &images[1];
    assert_eq!(*dst, Rect::new(50.0, 0.0, 100.0, 100.0));
    assert_eq!((blank.width, blank.height), (4, 4));
    assert!(blank.data.data().iter().all(|&b| b == 0));
}

#[cfg(feature = "png")]
#[test]
fn tiles_are_clipped_to_the_view() {
    let pyramid = TilePyramid::new(Rect::new(0.0, 0.0, 100.0, 100.0), 4, 4).with_grid(0, 1, 1);
    let mut tiles = MemoryTileSource::new(pyramid);
    tiles.insert(0, 0, 0, red_png());
    let map = Map::new(Style::default()).with_layer(Layer::tiles("base", Arc::new(tiles)));

    let mut r = Renderer::new();
    r.init(Viewport::new(Rect::new(0.0, 0.0, 50.0, 50.0), 50, 50).unwrap())
        .unwrap();
    let mut canvas = DisplayList::new(Size::new(50.0, 50.0));
    r.render(&map, &mut canvas).unwrap();

    let Some(DisplayItem::Image { src, dst, .. }) = canvas.items.first() else {
        panic!("expected a tile");
    };
    // The bottom left quarter of the tile, whose rows run top down.
    assert_eq!(*src, Rect::new(0.0, 2.0, 2.0, 4.0));
    assert_eq!(*dst, Rect::new(0.0, 0.0, 50.0, 50.0));
}
