// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contracts for the feature and tile stores a map draws from, plus in-memory
//! implementations of both.

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use std::sync::Arc;

use geo::{BoundingRect, Coord, Geometry, MapCoords};
use peniko::kurbo::{Point, Rect};

use crate::error::SourceError;
use crate::style::Filter;
use crate::tile::{Tile, TilePyramid};
use crate::view::Crs;

/// A feature attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttrValue {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// Text.
    Text(String),
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A geometry with attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feature {
    id: String,
    attributes: BTreeMap<String, AttrValue>,
    geometry: Option<Geometry<f64>>,
}

impl Feature {
    /// A feature with no attributes or geometry.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set attribute `name`.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: impl Into<Geometry<f64>>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    /// The feature id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The value of attribute `name`.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// All attributes.
    pub fn attributes(&self) -> &BTreeMap<String, AttrValue> {
        &self.attributes
    }

    /// The geometry, if the feature has one.
    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.geometry.as_ref()
    }

    /// Replace the geometry.
    pub fn set_geometry(&mut self, geometry: Option<Geometry<f64>>) {
        self.geometry = geometry;
    }
}

/// What to read from a [`FeatureSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Only features whose bounds intersect this box, in the source's CRS.
    pub bounds: Rect,
    /// Only features matching this filter.
    pub filter: Filter,
    /// Return geometry transformed into this CRS.
    pub reproject: Option<Crs>,
}

impl Query {
    /// All features intersecting `bounds`.
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            filter: Filter::True,
            reproject: None,
        }
    }

    /// Also require `filter`.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    /// Transform returned geometry into `crs`.
    #[must_use]
    pub fn reproject(mut self, crs: Crs) -> Self {
        self.reproject = Some(crs);
        self
    }
}

/// A finite, forward-only sequence of query results.
pub type FeatureCursor<'a> = Box<dyn Iterator<Item = Result<Feature, SourceError>> + 'a>;

/// A finite, forward-only sequence of tiles.
pub type TileCursor<'a> = Box<dyn Iterator<Item = Result<Tile, SourceError>> + 'a>;

/// A store of vector features.
pub trait FeatureSource {
    /// Native CRS of the stored geometry, if known.
    fn crs(&self) -> Option<Crs>;

    /// Run `query`.
    ///
    /// # Errors
    ///
    /// Reports failures to start the query. Failures while reading are
    /// reported through the cursor's items.
    fn cursor(&self, query: &Query) -> Result<FeatureCursor<'_>, SourceError>;
}

/// A store of raster tiles.
pub trait TileSource {
    /// Description of the tile grid.
    ///
    /// # Errors
    ///
    /// Reports failures to read the pyramid metadata.
    fn pyramid(&self) -> Result<TilePyramid, SourceError>;

    /// All stored tiles within the given zoom, column and row ranges.
    ///
    /// # Errors
    ///
    /// Reports failures to start reading.
    fn read(
        &self,
        z: RangeInclusive<u32>,
        x: RangeInclusive<u32>,
        y: RangeInclusive<u32>,
    ) -> Result<TileCursor<'_>, SourceError>;
}

/// Transforms coordinates between reference systems.
///
/// Carta does no projection math itself; any function with the right shape can
/// be used.
pub trait Reproject {
    /// Transform `p` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Reports points the transform cannot handle.
    fn reproject(&self, p: Point, from: &Crs, to: &Crs) -> Result<Point, SourceError>;
}

impl<F> Reproject for F
where
    F: Fn(Point, &Crs, &Crs) -> Result<Point, SourceError>,
{
    fn reproject(&self, p: Point, from: &Crs, to: &Crs) -> Result<Point, SourceError> {
        self(p, from, to)
    }
}

/// Reproject a box by transforming its corners and edge midpoints and taking the
/// bounds of the result.
///
/// # Errors
///
/// Propagates failures of `tx`.
pub fn reproject_envelope(
    tx: &dyn Reproject,
    bounds: Rect,
    from: &Crs,
    to: &Crs,
) -> Result<Rect, SourceError> {
    let c = bounds.center();
    let probes = [
        Point::new(bounds.x0, bounds.y0),
        Point::new(c.x, bounds.y0),
        Point::new(bounds.x1, bounds.y0),
        Point::new(bounds.x1, c.y),
        Point::new(bounds.x1, bounds.y1),
        Point::new(c.x, bounds.y1),
        Point::new(bounds.x0, bounds.y1),
        Point::new(bounds.x0, c.y),
    ];
    let mut out: Option<Rect> = None;
    for p in probes {
        let q = tx.reproject(p, from, to)?;
        out = Some(match out {
            Some(r) => r.union_pt(q),
            None => Rect::from_points(q, q),
        });
    }
    Ok(out.unwrap_or(bounds))
}

/// Features held in memory.
///
/// Queries prefilter by bounding box, apply the query filter, and reproject
/// geometry when asked to and a [`Reproject`] has been supplied.
#[derive(Clone, Default)]
pub struct MemoryFeatureSource {
    crs: Option<Crs>,
    features: Vec<Feature>,
    reprojector: Option<Arc<dyn Reproject>>,
}

impl core::fmt::Debug for MemoryFeatureSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryFeatureSource")
            .field("crs", &self.crs)
            .field("features", &self.features.len())
            .field("reprojector", &self.reprojector.is_some())
            .finish()
    }
}

impl MemoryFeatureSource {
    /// An empty source in an unknown CRS.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the CRS of the stored geometry.
    #[must_use]
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Use `tx` for queries that ask for reprojection.
    #[must_use]
    pub fn with_reprojector(mut self, tx: Arc<dyn Reproject>) -> Self {
        self.reprojector = Some(tx);
        self
    }

    /// Add a feature.
    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Number of stored features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether no features are stored.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn reprojected(&self, mut feature: Feature, to: &Crs) -> Result<Feature, SourceError> {
        let (Some(from), Some(geometry)) = (&self.crs, feature.geometry()) else {
            return Ok(feature);
        };
        if from.same_as(to) {
            return Ok(feature);
        }
        let Some(tx) = self.reprojector.as_deref() else {
            return Err(SourceError::Message(format!(
                "no reprojection available from {from} to {to}"
            )));
        };
        let geometry = geometry.try_map_coords(|c: Coord<f64>| {
            let p = tx.reproject(Point::new(c.x, c.y), from, to)?;
            Ok::<_, SourceError>(Coord { x: p.x, y: p.y })
        })?;
        feature.set_geometry(Some(geometry));
        Ok(feature)
    }
}

impl Extend<Feature> for MemoryFeatureSource {
    fn extend<I: IntoIterator<Item = Feature>>(&mut self, iter: I) {
        self.features.extend(iter);
    }
}

impl FromIterator<Feature> for MemoryFeatureSource {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
            ..Default::default()
        }
    }
}

fn intersects(geometry: Option<&Geometry<f64>>, bounds: Rect) -> bool {
    let Some(r) = geometry.and_then(|g| g.bounding_rect()) else {
        return false;
    };
    r.min().x <= bounds.x1
        && r.max().x >= bounds.x0
        && r.min().y <= bounds.y1
        && r.max().y >= bounds.y0
}

impl FeatureSource for MemoryFeatureSource {
    fn crs(&self) -> Option<Crs> {
        self.crs.clone()
    }

    fn cursor(&self, query: &Query) -> Result<FeatureCursor<'_>, SourceError> {
        let bounds = query.bounds;
        let filter = query.filter.clone();
        let target = query.reproject.clone();
        Ok(Box::new(
            self.features
                .iter()
                .filter(move |f| intersects(f.geometry(), bounds) && filter.matches(f))
                .cloned()
                .map(move |f| match &target {
                    Some(to) => self.reprojected(f, to),
                    None => Ok(f),
                }),
        ))
    }
}

/// Encoded tiles held in memory.
#[derive(Debug, Clone)]
pub struct MemoryTileSource {
    pyramid: TilePyramid,
    tiles: HashMap<(u32, u32, u32), Vec<u8>>,
}

impl MemoryTileSource {
    /// An empty store for `pyramid`.
    pub fn new(pyramid: TilePyramid) -> Self {
        Self {
            pyramid,
            tiles: HashMap::new(),
        }
    }

    /// Store the encoded image for tile `(z, x, y)`.
    pub fn insert(&mut self, z: u32, x: u32, y: u32, data: Vec<u8>) {
        self.tiles.insert((z, x, y), data);
    }
}

impl TileSource for MemoryTileSource {
    fn pyramid(&self) -> Result<TilePyramid, SourceError> {
        Ok(self.pyramid.clone())
    }

    fn read(
        &self,
        z: RangeInclusive<u32>,
        x: RangeInclusive<u32>,
        y: RangeInclusive<u32>,
    ) -> Result<TileCursor<'_>, SourceError> {
        let mut hits: Vec<_> = self
            .tiles
            .iter()
            .filter(|((tz, tx, ty), _)| z.contains(tz) && x.contains(tx) && y.contains(ty))
            .map(|(&(z, x, y), data)| Tile {
                z,
                x,
                y,
                data: Some(data.clone()),
            })
            .collect();
        hits.sort_by_key(|t| (t.z, t.y, t.x));
        Ok(Box::new(hits.into_iter().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    fn cities() -> MemoryFeatureSource {
        [
            Feature::new("a")
                .with_attribute("pop", 10.0)
                .with_geometry(point!(x: 1.0, y: 1.0)),
            Feature::new("b")
                .with_attribute("pop", 500.0)
                .with_geometry(point!(x: 5.0, y: 5.0)),
            Feature::new("c").with_attribute("pop", 50.0),
        ]
        .into_iter()
        .collect()
    }

    fn ids(src: &MemoryFeatureSource, q: &Query) -> Vec<String> {
        src.cursor(q)
            .unwrap()
            .map(|f| f.unwrap().id().to_owned())
            .collect()
    }

    #[test]
    fn bounds_and_filter_prefilter() {
        let src = cities();
        assert_eq!(ids(&src, &Query::new(Rect::new(0.0, 0.0, 10.0, 10.0))), ["a", "b"]);
        assert_eq!(ids(&src, &Query::new(Rect::new(0.0, 0.0, 2.0, 2.0))), ["a"]);
        let big = Query::new(Rect::new(0.0, 0.0, 10.0, 10.0)).filter(Filter::compare(
            "pop",
            crate::style::CompareOp::Gt,
            100.0,
        ));
        assert_eq!(ids(&src, &big), ["b"]);
    }

    #[test]
    fn reprojects_on_request() {
        let shift = |p: Point, _: &Crs, _: &Crs| Ok::<_, SourceError>(Point::new(p.x + 100.0, p.y));
        let src = cities()
            .with_crs(Crs::new("EPSG:4326"))
            .with_reprojector(Arc::new(shift));
        let q = Query::new(Rect::new(0.0, 0.0, 2.0, 2.0)).reproject(Crs::new("EPSG:3857"));
        let f = src.cursor(&q).unwrap().next().unwrap().unwrap();
        assert_eq!(f.geometry(), Some(&Geometry::Point(point!(x: 101.0, y: 1.0))));

        let same = Query::new(Rect::new(0.0, 0.0, 2.0, 2.0)).reproject(Crs::new("epsg:4326"));
        let f = src.cursor(&same).unwrap().next().unwrap().unwrap();
        assert_eq!(f.geometry(), Some(&Geometry::Point(point!(x: 1.0, y: 1.0))));
    }

    #[test]
    fn reprojection_without_transform_fails() {
        let src = cities().with_crs(Crs::new("EPSG:4326"));
        let q = Query::new(Rect::new(0.0, 0.0, 2.0, 2.0)).reproject(Crs::new("EPSG:3857"));
        assert!(src.cursor(&q).unwrap().next().unwrap().is_err());
    }

    #[test]
    fn envelope_reprojection_covers_midpoints() {
        // Bulges the middle of every edge outwards.
        let bulge = |p: Point, _: &Crs, _: &Crs| {
            let k = if p.x == 5.0 || p.y == 5.0 { 2.0 } else { 1.0 };
            Ok::<_, SourceError>(Point::new((p.x - 5.0) * k + 5.0, (p.y - 5.0) * k + 5.0))
        };
        let r = reproject_envelope(
            &bulge,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            &Crs::new("A"),
            &Crs::new("B"),
        )
        .unwrap();
        assert_eq!(r, Rect::new(-5.0, -5.0, 15.0, 15.0));
    }

    #[test]
    fn tiles_within_ranges() {
        let mut src = MemoryTileSource::new(TilePyramid::quadtree(
            Rect::new(0.0, 0.0, 1.0, 1.0),
            256,
            2,
        ));
        src.insert(1, 0, 0, vec![1]);
        src.insert(1, 1, 1, vec![2]);
        src.insert(2, 0, 0, vec![3]);
        let tiles: Vec<_> = src
            .read(1..=1, 0..=1, 1..=1)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].data.as_deref(), Some(&[2_u8][..]));
    }
}
