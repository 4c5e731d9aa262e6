// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placed labels and the collision index they are accepted into.

use peniko::kurbo::{Line, Point, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::paint::TextPaint;

/// A label placed around an anchor point.
#[derive(Debug, Clone)]
pub struct PointLabel {
    /// Text to draw.
    pub text: String,
    /// Paint for the text.
    pub paint: TextPaint,
    /// Baseline origin in world coordinates, offsets applied.
    pub anchor: Point,
    /// World space box reserved for the label, padding included.
    pub bounds: Rect,
}

/// A label whose glyphs follow a line.
#[derive(Debug, Clone)]
pub struct LineLabel {
    /// Text to draw.
    pub text: String,
    /// Paint for the text.
    pub paint: TextPaint,
    /// World space baseline of each glyph, in text order.
    pub path: Vec<Line>,
    /// World space ring enclosing the glyphs.
    pub shape: Vec<Point>,
}

/// A placed label of either kind.
#[derive(Debug, Clone)]
pub enum Label {
    /// Anchored at a point.
    Point(PointLabel),
    /// Following a line.
    Line(LineLabel),
}

impl Label {
    /// The label's text.
    pub fn text(&self) -> &str {
        match self {
            Self::Point(l) => &l.text,
            Self::Line(l) => &l.text,
        }
    }

    /// The label's paint.
    pub fn paint(&self) -> &TextPaint {
        match self {
            Self::Point(l) => &l.paint,
            Self::Line(l) => &l.paint,
        }
    }

    /// The area the label occupies, as a closed ring in world coordinates.
    pub fn shape(&self) -> Vec<Point> {
        match self {
            Self::Point(l) => {
                let b = l.bounds;
                vec![
                    Point::new(b.x0, b.y0),
                    Point::new(b.x1, b.y0),
                    Point::new(b.x1, b.y1),
                    Point::new(b.x0, b.y1),
                ]
            }
            Self::Line(l) => l.shape.clone(),
        }
    }

    /// World space bounding box of [`shape`](Self::shape).
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Point(l) => l.bounds,
            Self::Line(l) => l
                .shape
                .iter()
                .map(|p| Rect::from_points(*p, *p))
                .reduce(|a, b| a.union(b))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    bounds: Rect,
}

impl RTreeObject for Entry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        envelope(self.bounds)
    }
}

fn envelope(r: Rect) -> AABB<[f64; 2]> {
    AABB::from_corners([r.x0, r.y0], [r.x1, r.y1])
}

/// The labels accepted during one render, first come first served.
///
/// A label is only accepted if its bounds do not touch the bounds of any label
/// accepted before it.
#[derive(Debug, Default)]
pub struct LabelIndex {
    tree: RTree<Entry>,
    labels: Vec<Label>,
}

impl LabelIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a label with `bounds` would collide with an accepted label.
    pub fn collides(&self, bounds: Rect) -> bool {
        self.tree
            .locate_in_envelope_intersecting(&envelope(bounds))
            .next()
            .is_some()
    }

    /// Accept `label` unless it collides. Returns whether it was accepted.
    pub fn insert(&mut self, label: Label) -> bool {
        let bounds = label.bounds();
        if self.collides(bounds) {
            return false;
        }
        self.tree.insert(Entry { bounds });
        self.labels.push(label);
        true
    }

    /// Accepted labels in acceptance order.
    pub fn all(&self) -> &[Label] {
        &self.labels
    }

    /// Number of accepted labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no label has been accepted.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Forget every label.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.labels.clear();
    }
}
