// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Turning feature geometry into drawable paths.

use std::borrow::Cow;

use geo::{Coord, Geometry, LineString, Polygon};
use peniko::kurbo::{BezPath, Point};

use crate::error::{Error, Result};
use crate::view::Viewport;

/// One drawing operation produced by a [`CoordinatePath`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathStep {
    /// Start a new subpath.
    MoveTo(Point),
    /// Extend the current subpath.
    LineTo(Point),
    /// Close the current subpath back to its start.
    Close,
    /// No further steps.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Point,
    Line,
    Ring,
}

#[derive(Debug)]
struct Component<'a> {
    coords: Cow<'a, [Coord<f64>]>,
    kind: Kind,
}

/// A lazily generalized stream of [`PathStep`]s over a geometry.
///
/// A vertex is dropped when it lies within the tolerance of the last vertex
/// emitted on both axes. The final vertex of an open line is always kept, and
/// ring winding is passed through unchanged.
#[derive(Debug)]
pub struct CoordinatePath<'a> {
    components: Vec<Component<'a>>,
    tolerance: (f64, f64),
    component: usize,
    vertex: usize,
    last: Option<Coord<f64>>,
    done: bool,
}

fn line<'a>(ls: &'a LineString<f64>) -> Component<'a> {
    Component {
        coords: Cow::Borrowed(&ls.0),
        kind: Kind::Line,
    }
}

fn rings<'a>(poly: &'a Polygon<f64>, out: &mut Vec<Component<'a>>) {
    for ring in core::iter::once(poly.exterior()).chain(poly.interiors()) {
        out.push(Component {
            coords: Cow::Borrowed(&ring.0),
            kind: Kind::Ring,
        });
    }
}

fn owned_rings(poly: Polygon<f64>, out: &mut Vec<Component<'_>>) {
    let (exterior, interiors) = poly.into_inner();
    for ring in core::iter::once(exterior).chain(interiors) {
        out.push(Component {
            coords: Cow::Owned(ring.0),
            kind: Kind::Ring,
        });
    }
}

impl<'a> CoordinatePath<'a> {
    /// Walk `geometry`, generalizing with `tol_x` and `tol_y` world units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedGeometry`] for geometry collections.
    pub fn new(geometry: &'a Geometry<f64>, tol_x: f64, tol_y: f64) -> Result<Self> {
        let mut components = Vec::new();
        match geometry {
            Geometry::Point(p) => components.push(Component {
                coords: Cow::Owned(vec![p.0]),
                kind: Kind::Point,
            }),
            Geometry::MultiPoint(mp) => components.extend(mp.iter().map(|p| Component {
                coords: Cow::Owned(vec![p.0]),
                kind: Kind::Point,
            })),
            Geometry::Line(l) => components.push(Component {
                coords: Cow::Owned(vec![l.start, l.end]),
                kind: Kind::Line,
            }),
            Geometry::LineString(ls) => components.push(line(ls)),
            Geometry::MultiLineString(mls) => components.extend(mls.iter().map(line)),
            Geometry::Polygon(poly) => rings(poly, &mut components),
            Geometry::MultiPolygon(mp) => {
                for poly in mp {
                    rings(poly, &mut components);
                }
            }
            Geometry::Rect(r) => owned_rings(r.to_polygon(), &mut components),
            Geometry::Triangle(t) => owned_rings(t.to_polygon(), &mut components),
            Geometry::GeometryCollection(_) => {
                return Err(Error::UnsupportedGeometry("GeometryCollection"));
            }
        }
        Ok(Self {
            components,
            tolerance: (tol_x.abs(), tol_y.abs()),
            component: 0,
            vertex: 0,
            last: None,
            done: false,
        })
    }

    /// Every vertex that survives generalization, ignoring subpath structure.
    pub fn points(self) -> impl Iterator<Item = Point> + 'a {
        self.filter_map(|step| match step {
            PathStep::MoveTo(p) | PathStep::LineTo(p) => Some(p),
            PathStep::Close | PathStep::Stop => None,
        })
    }

    fn negligible(&self, c: Coord<f64>) -> bool {
        self.last.is_some_and(|l| {
            (c.x - l.x).abs() < self.tolerance.0 && (c.y - l.y).abs() < self.tolerance.1
        })
    }
}

impl Iterator for CoordinatePath<'_> {
    type Item = PathStep;

    fn next(&mut self) -> Option<PathStep> {
        loop {
            if self.done {
                return None;
            }
            let Some(comp) = self.components.get(self.component) else {
                self.done = true;
                return Some(PathStep::Stop);
            };
            let coords = &comp.coords;
            let kind = comp.kind;
            // Rings repeat their first vertex at the end; `Close` stands in for it.
            let end = if kind == Kind::Ring && coords.len() > 1 && coords.first() == coords.last()
            {
                coords.len() - 1
            } else {
                coords.len()
            };

            if self.vertex >= end {
                let closing = kind == Kind::Ring && end > 0 && self.vertex == end;
                self.component += 1;
                self.vertex = 0;
                self.last = None;
                if closing {
                    return Some(PathStep::Close);
                }
                continue;
            }

            let i = self.vertex;
            let c = coords[i];
            self.vertex += 1;

            if i == 0 {
                self.last = Some(c);
                return Some(PathStep::MoveTo(Point::new(c.x, c.y)));
            }
            let keep_last = kind == Kind::Line && i == end - 1;
            if !keep_last && self.negligible(c) {
                continue;
            }
            self.last = Some(c);
            return Some(PathStep::LineTo(Point::new(c.x, c.y)));
        }
    }
}

/// Builds world space [`BezPath`]s from geometry, dropping vertices closer than
/// a pixel-equivalent tolerance.
#[derive(Debug, Clone, Copy)]
pub struct PathBuilder {
    tol_x: f64,
    tol_y: f64,
}

impl PathBuilder {
    /// Generalize with explicit tolerances in world units.
    pub fn new(tol_x: f64, tol_y: f64) -> Self {
        Self { tol_x, tol_y }
    }

    /// Generalize to one device pixel of `view`.
    pub fn for_view(view: &Viewport) -> Self {
        Self::new(view.iscale_x(), view.iscale_y())
    }

    /// The generalized step stream for `geometry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedGeometry`] for geometry collections.
    pub fn steps<'g>(&self, geometry: &'g Geometry<f64>) -> Result<CoordinatePath<'g>> {
        CoordinatePath::new(geometry, self.tol_x, self.tol_y)
    }

    /// Build a path for `geometry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedGeometry`] for geometry collections.
    pub fn build(&self, geometry: &Geometry<f64>) -> Result<BezPath> {
        let mut path = BezPath::new();
        for step in self.steps(geometry)? {
            match step {
                PathStep::MoveTo(p) => path.move_to(p),
                PathStep::LineTo(p) => path.line_to(p),
                PathStep::Close => path.close_path(),
                PathStep::Stop => break,
            }
        }
        Ok(path)
    }
}
