// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The renderer: draws a [`Map`] onto a [`Canvas`].
//!
//! A frame draws the background, then every visible layer in order, then the
//! labels accepted while drawing the layers. A layer whose source fails is
//! logged and skipped; the rest of the frame is still drawn.

use std::sync::Arc;

use geo::{
    BooleanOps, BoundingRect, Coord, Geometry, HasDimensions, LineString, MultiLineString,
    MultiPoint, MultiPolygon, Polygon,
};
use peniko::kurbo::{Ellipse, Point, Rect, Shape, Size};

use crate::canvas::Canvas;
use crate::error::{Error, Result, SourceError};
use crate::label::LabelIndex;
use crate::labeller::{LabelRequest, Labeller, LabellerOptions, Placement};
use crate::map::{Layer, LayerData, Map};
use crate::path::PathBuilder;
use crate::source::{reproject_envelope, Feature, FeatureSource, Query, Reproject, TileSource};
use crate::style::{Property, Rule, RuleList};
use crate::symbolizer;
use crate::text::rect_from_center;
use crate::tile;
use crate::transform::{AffineExt, TransformPipeline};
use crate::view::Viewport;

/// Flattening tolerance for markers and other device space shapes.
const SHAPE_TOLERANCE: f64 = 0.1;

/// What a call to [`Renderer::render`] did.
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Layers drawn without a source failure.
    pub layers_drawn: usize,
    /// Features that produced output, counted once per z-index group.
    pub features_drawn: usize,
    /// Labels accepted into the label index.
    pub labels_accepted: usize,
    /// Labels that could not be placed or collided.
    pub labels_rejected: usize,
    /// One [`Error::Source`] per skipped layer and one
    /// [`Error::UnsupportedGeometry`] per feature that could not be drawn.
    pub failures: Vec<Error>,
}

impl RenderReport {
    /// Number of layers skipped because their source failed.
    pub fn layers_failed(&self) -> usize {
        self.failures
            .iter()
            .filter(|e| matches!(e, Error::Source { .. }))
            .count()
    }
}

#[derive(Debug)]
struct Bound {
    view: Viewport,
    tx: TransformPipeline,
}

/// Draws maps for one viewport at a time.
///
/// A renderer must be bound to a viewport with [`init`](Self::init) before it
/// can render. Each renderer owns its label index, so concurrent renders need
/// one renderer per surface.
#[derive(Default)]
pub struct Renderer {
    bound: Option<Bound>,
    labeller: Labeller,
    labels: LabelIndex,
    reprojector: Option<Arc<dyn Reproject>>,
}

impl core::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Renderer")
            .field("bound", &self.bound)
            .field("labeller", &self.labeller)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// An uninitialized renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `options` for label layout.
    #[must_use]
    pub fn with_options(mut self, options: LabellerOptions) -> Self {
        self.labeller = Labeller::new(options);
        self
    }

    /// Reproject query bounds with `reprojector` when a layer's CRS differs
    /// from the view's.
    #[must_use]
    pub fn with_reprojector(mut self, reprojector: Arc<dyn Reproject>) -> Self {
        self.reprojector = Some(reprojector);
        self
    }

    /// Bind the renderer to `view`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SingularTransform`] if the view scale is degenerate.
    pub fn init(&mut self, view: Viewport) -> Result<()> {
        let tx = TransformPipeline::new(&view)?;
        self.bound = Some(Bound { view, tx });
        Ok(())
    }

    /// Replace the viewport after a pan, zoom or resize.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before [`init`](Self::init), and
    /// [`Error::SingularTransform`] if the view scale is degenerate, in which
    /// case the previous viewport is kept.
    pub fn update_viewport(&mut self, view: Viewport) -> Result<()> {
        let bound = self.bound.as_mut().ok_or(Error::NotInitialized)?;
        bound.tx.update(&view)?;
        bound.view = view;
        Ok(())
    }

    /// The bound viewport.
    pub fn viewport(&self) -> Option<&Viewport> {
        self.bound.as_ref().map(|b| &b.view)
    }

    /// The transforms for the bound viewport.
    pub fn transform(&self) -> Option<&TransformPipeline> {
        self.bound.as_ref().map(|b| &b.tx)
    }

    /// Labels accepted by the last render.
    pub fn labels(&self) -> &LabelIndex {
        &self.labels
    }

    /// Draw `map` onto `canvas`.
    ///
    /// The canvas transform is the same on return as on entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before [`init`](Self::init). Source
    /// failures do not fail the render; they are reported in
    /// [`RenderReport::failures`].
    #[tracing::instrument(skip_all)]
    pub fn render(&mut self, map: &Map, canvas: &mut dyn Canvas) -> Result<RenderReport> {
        let Bound { view, tx } = self.bound.as_mut().ok_or(Error::NotInitialized)?;
        self.labels.clear();

        tx.apply(canvas);
        let (view, tx): (&Viewport, &TransformPipeline) = (view, tx);

        let mut pass = Pass {
            view,
            tx,
            paths: PathBuilder::for_view(view),
            labeller: &self.labeller,
            labels: &mut self.labels,
            reprojector: self.reprojector.as_deref(),
            report: RenderReport::default(),
        };

        let rules = map.style().rules();
        pass.background(rules, canvas);

        for layer in map.layers().iter().filter(|l| l.visible()) {
            let rules = rules.select_by_id(layer.name(), true).flatten();
            let result = match layer.data() {
                LayerData::Vector(source) => {
                    pass.vector_layer(layer, source.as_ref(), &rules, canvas)
                }
                LayerData::Tiles(source) => pass.raster_layer(source.as_ref(), &rules, canvas),
            };
            match result {
                Ok(()) => pass.report.layers_drawn += 1,
                Err(source) => {
                    let err = Error::Source {
                        layer: layer.name().to_owned(),
                        source,
                    };
                    tracing::error!(
                        error = &err as &(dyn std::error::Error + 'static),
                        "skipping layer"
                    );
                    pass.report.failures.push(err);
                }
            }
        }

        let report = pass.report;
        for label in self.labels.all() {
            self.labeller.render(label, canvas, tx);
        }

        tx.reset(canvas);
        Ok(report)
    }
}

/// State of one render call.
struct Pass<'a> {
    view: &'a Viewport,
    tx: &'a TransformPipeline,
    paths: PathBuilder,
    labeller: &'a Labeller,
    labels: &'a mut LabelIndex,
    reprojector: Option<&'a dyn Reproject>,
    report: RenderReport,
}

impl Pass<'_> {
    fn background(&mut self, rules: &RuleList, canvas: &mut dyn Canvas) {
        let rule = rules.select_by_name("Map", false).collapse();
        let Some(paint) = symbolizer::background(&rule) else {
            return;
        };
        let area = Rect::from_origin_size(Point::ORIGIN, self.view.size());
        let mut canvas = self.tx.pixel_space(canvas);
        canvas.draw_path(&area.to_path(SHAPE_TOLERANCE), &paint);
    }

    fn vector_layer(
        &mut self,
        layer: &Layer,
        source: &dyn FeatureSource,
        rules: &RuleList,
        canvas: &mut dyn Canvas,
    ) -> Result<(), SourceError> {
        let bounds = self.view.bounds();
        let mut query = Query::new(bounds);
        match (source.crs(), self.view.crs()) {
            (Some(native), Some(view_crs)) if !native.same_as(view_crs) => {
                query = query.reproject(view_crs.clone());
                match self.reprojector {
                    Some(r) => query.bounds = reproject_envelope(r, bounds, view_crs, &native)?,
                    None => tracing::debug!(
                        layer = layer.name(),
                        %native,
                        "no reprojector, querying with view bounds"
                    ),
                }
            }
            (None, _) => {
                tracing::debug!(layer = layer.name(), "layer has no CRS, assuming the view's");
            }
            _ => {}
        }
        if let Some(filter) = layer.filter() {
            query = query.filter(filter.clone());
        }

        for group in rules.zgroup() {
            for feature in source.cursor(&query)? {
                let feature = feature?;
                let matched = group.match_feature(&feature);
                if matched.is_empty() {
                    continue;
                }
                if self.draw(&feature, &matched.collapse(), canvas) {
                    self.report.features_drawn += 1;
                }
            }
        }
        Ok(())
    }

    fn draw(&mut self, feature: &Feature, rule: &Rule, canvas: &mut dyn Canvas) -> bool {
        let Some(geometry) = feature.geometry() else {
            return false;
        };
        if matches!(geometry, Geometry::GeometryCollection(_)) {
            let err = Error::UnsupportedGeometry("GeometryCollection");
            tracing::error!(feature = feature.id(), "{err}");
            self.report.failures.push(err);
            return false;
        }
        let Some(geometry) = clip(geometry, self.view.bounds()) else {
            return false;
        };
        match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => {
                self.draw_point(feature, &geometry, rule, canvas);
            }
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                self.draw_line(feature, &geometry, rule, canvas);
            }
            _ => self.draw_polygon(feature, &geometry, rule, canvas),
        }
        true
    }

    fn draw_point(
        &mut self,
        feature: &Feature,
        geometry: &Geometry<f64>,
        rule: &Rule,
        canvas: &mut dyn Canvas,
    ) {
        let points: Vec<Coord<f64>> = match geometry {
            Geometry::Point(p) => vec![p.0],
            Geometry::MultiPoint(mp) => mp.iter().map(|p| p.0).collect(),
            _ => Vec::new(),
        };
        let (width, height) = symbolizer::marker_size(rule, Some(feature));
        let fill = symbolizer::marker_fill(rule, Some(feature));
        let line = symbolizer::marker_line(rule, Some(feature));

        if fill.is_some() || line.is_some() {
            let w2c = self.tx.world_to_canvas();
            let mut canvas = self.tx.pixel_space(canvas);
            for paint in [fill, line].iter().flatten() {
                for c in &points {
                    let oval = rect_from_center(w2c.map_coord(*c), Size::new(width, height));
                    let oval = Ellipse::from_rect(oval).to_path(SHAPE_TOLERANCE);
                    canvas.draw_path(&oval, paint);
                }
            }
        }

        self.label(feature, geometry, rule, Placement::Point, canvas);
    }

    fn draw_line(
        &mut self,
        feature: &Feature,
        geometry: &Geometry<f64>,
        rule: &Rule,
        canvas: &mut dyn Canvas,
    ) {
        match self.paths.build(geometry) {
            Ok(path) => {
                let paint =
                    symbolizer::line_paint(rule, Some(feature), &self.tx.canvas_to_world());
                canvas.draw_path(&path, &paint);
            }
            Err(err) => tracing::error!(feature = feature.id(), "{err}"),
        }
        self.label(feature, geometry, rule, Placement::Line, canvas);
    }

    fn draw_polygon(
        &mut self,
        feature: &Feature,
        geometry: &Geometry<f64>,
        rule: &Rule,
        canvas: &mut dyn Canvas,
    ) {
        match self.paths.build(geometry) {
            Ok(path) => {
                let c2w = self.tx.canvas_to_world();
                if let Some(fill) = symbolizer::polygon_fill(rule, Some(feature)) {
                    canvas.draw_path(&path, &fill);
                }
                if let Some(line) = symbolizer::polygon_line(rule, Some(feature), &c2w) {
                    canvas.draw_path(&path, &line);
                }
            }
            Err(err) => tracing::error!(feature = feature.id(), "{err}"),
        }
        self.label(feature, geometry, rule, Placement::Point, canvas);
    }

    fn label(
        &mut self,
        feature: &Feature,
        geometry: &Geometry<f64>,
        rule: &Rule,
        placement: Placement,
        canvas: &mut dyn Canvas,
    ) {
        let Some(text) = rule.string(Property::TextName, Some(feature)) else {
            return;
        };
        if text.is_empty() {
            return;
        }
        let paint = symbolizer::label_paint(rule, Some(feature));
        let style = symbolizer::label_style(rule, Some(feature));
        let request = LabelRequest {
            text: &text,
            paint: &paint,
            style: &style,
            geometry,
            placement,
        };
        if self.labeller.layout(&request, canvas, self.tx, self.labels) {
            self.report.labels_accepted += 1;
        } else {
            self.report.labels_rejected += 1;
        }
    }

    fn raster_layer(
        &mut self,
        source: &dyn TileSource,
        rules: &RuleList,
        canvas: &mut dyn Canvas,
    ) -> Result<(), SourceError> {
        let paint = symbolizer::raster_paint(&rules.collapse());
        let pyramid = source.pyramid()?;
        let bounds = self.view.bounds();
        let Some(mut cover) = pyramid.cover(bounds, self.view.width(), self.view.height()) else {
            tracing::debug!("no tiles under the view");
            return Ok(());
        };
        cover.fill(source)?;

        let w2c = self.tx.world_to_canvas();
        let (tw, th) = (pyramid.tile_width(), pyramid.tile_height());
        let mut canvas = self.tx.pixel_space(canvas);
        for j in 0..cover.height() {
            for i in 0..cover.width() {
                let Some(tile) = cover.tile(i, j) else {
                    continue;
                };
                let Some(tile_bounds) = pyramid.tile_bounds(tile.z, tile.x, tile.y) else {
                    continue;
                };
                let area = tile_bounds.intersect(bounds);
                if area.width() <= 0.0 || area.height() <= 0.0 {
                    continue;
                }
                let image = match tile::decode(tile, tw, th) {
                    Ok(image) => image,
                    Err(err) => {
                        tracing::warn!(z = tile.z, x = tile.x, y = tile.y, "{err}");
                        continue;
                    }
                };
                let src = clip_tile(
                    tile_bounds,
                    area,
                    Size::new(f64::from(image.width), f64::from(image.height)),
                );
                canvas.draw_image(&image, src, w2c.map_rect(area), &paint);
            }
        }
        Ok(())
    }
}

/// Pixel rectangle of a `size` tile covering `bounds` that shows `area`.
fn clip_tile(bounds: Rect, area: Rect, size: Size) -> Rect {
    let sx = |x: f64| (x - bounds.x0) * size.width / bounds.width();
    let sy = |y: f64| (bounds.y1 - y) * size.height / bounds.height();
    Rect::new(sx(area.x0), sy(area.y1), sx(area.x1), sy(area.y0))
}

/// Intersect `geometry` with `view`, returning `None` when nothing is left.
fn clip(geometry: &Geometry<f64>, view: Rect) -> Option<Geometry<f64>> {
    let bbox = geometry.bounding_rect()?;
    let (min, max) = (bbox.min(), bbox.max());
    if max.x < view.x0 || min.x > view.x1 || max.y < view.y0 || min.y > view.y1 {
        return None;
    }
    if min.x >= view.x0 && max.x <= view.x1 && min.y >= view.y0 && max.y <= view.y1 {
        return Some(geometry.clone());
    }

    let window = geo::Rect::new(
        Coord {
            x: view.x0,
            y: view.y0,
        },
        Coord {
            x: view.x1,
            y: view.y1,
        },
    );
    let inside = |c: &Coord<f64>| {
        c.x >= view.x0 && c.x <= view.x1 && c.y >= view.y0 && c.y <= view.y1
    };
    let lines = |mls: &MultiLineString<f64>| Geometry::from(window.to_polygon().clip(mls, false));
    let areas = |p: &Polygon<f64>| Geometry::from(p.intersection(&window.to_polygon()));

    let clipped = match geometry {
        Geometry::Point(p) => return inside(&p.0).then(|| geometry.clone()),
        Geometry::MultiPoint(mp) => Geometry::from(MultiPoint::new(
            mp.iter().filter(|p| inside(&p.0)).copied().collect(),
        )),
        Geometry::Line(l) => lines(&MultiLineString::new(vec![LineString::from(*l)])),
        Geometry::LineString(ls) => lines(&MultiLineString::new(vec![ls.clone()])),
        Geometry::MultiLineString(mls) => lines(mls),
        Geometry::Polygon(p) => areas(p),
        Geometry::Rect(r) => areas(&r.to_polygon()),
        Geometry::Triangle(t) => areas(&t.to_polygon()),
        Geometry::MultiPolygon(mp) => {
            Geometry::from(mp.intersection(&MultiPolygon::new(vec![window.to_polygon()])))
        }
        Geometry::GeometryCollection(_) => return Some(geometry.clone()),
    };
    (!clipped.is_empty()).then_some(clipped)
}
