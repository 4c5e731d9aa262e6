// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arc-length sampling along a polyline.

use peniko::kurbo::Point;

/// Default tolerance used when comparing a requested advance with the length
/// remaining on the current segment.
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

/// Samples a polyline at successive positions along its length.
///
/// The sampler keeps a cursor made of the current segment and the fraction of
/// that segment already travelled. [`advance`](Self::advance) moves the cursor
/// forward, and [`sample`](Self::sample) reports the point under it.
///
/// Once the cursor steps past the final vertex it stays there and `sample`
/// returns `None`.
#[derive(Debug, Clone)]
pub struct LineSampler<'a> {
    line: &'a [Point],
    /// Index of the segment start.
    p: usize,
    /// Fraction of segment `p` travelled, in `[0, 1]`.
    f: f64,
    tolerance: f64,
}

impl<'a> LineSampler<'a> {
    /// Make a sampler positioned at the first vertex of `line`.
    pub fn new(line: &'a [Point]) -> Self {
        Self {
            line,
            p: 0,
            f: 0.0,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Use `tolerance` when comparing distances.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn last(&self) -> usize {
        self.line.len().saturating_sub(1)
    }

    fn segment_len(&self) -> f64 {
        self.line[self.p].distance(self.line[self.p + 1])
    }

    /// Move the cursor `dist` further along the line.
    pub fn advance(&mut self, mut dist: f64) -> &mut Self {
        while dist > 0.0 && self.p < self.last() {
            let len = self.segment_len();
            let to_next = len - len * self.f;
            if dist - to_next > self.tolerance {
                dist -= to_next;
                self.p += 1;
                self.f = 0.0;
            } else {
                self.f = if len > 0.0 {
                    ((len * self.f + dist) / len).min(1.0)
                } else {
                    1.0
                };
                break;
            }
        }
        self
    }

    /// The point at the cursor, or `None` once the cursor is past the end.
    pub fn sample(&self) -> Option<Point> {
        if self.p >= self.last() {
            return None;
        }
        Some(self.line[self.p].lerp(self.line[self.p + 1], self.f))
    }
}
