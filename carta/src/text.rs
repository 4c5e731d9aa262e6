// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text alignment and measurement results.

use peniko::kurbo::{Point, Rect, Size};

/// Which part of a string is attached to its drawing origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    /// Origin at the left end of the baseline.
    #[default]
    Left,
    /// Origin at the middle of the baseline.
    Center,
    /// Origin at the right end of the baseline.
    Right,
}

impl TextAlign {
    /// Horizontal displacement of the origin from the left edge of text `width` wide.
    pub fn select(self, width: f64) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5 * width,
            Self::Right => width,
        }
    }

    /// Box of `size` whose bottom edge is anchored at `anchor` in a y-up space.
    ///
    /// Left, center and right alignments give a bottom-left, bottom-center and
    /// bottom-right anchored rectangle respectively.
    pub fn anchored_box(self, anchor: Point, size: Size) -> Rect {
        let x0 = anchor.x - self.select(size.width);
        Rect::new(x0, anchor.y, x0 + size.width, anchor.y + size.height)
    }
}

/// Measurements of a string in device pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextMetrics {
    /// Ink bounds relative to the left end of the baseline, y pointing down.
    pub bounds: Rect,
    /// Advance of each `char` in the string.
    pub advances: Vec<f64>,
}

/// Grow a rectangle by `pad` on every side.
pub fn expand(r: Rect, pad: f64) -> Rect {
    r.inflate(pad, pad)
}

/// Rectangle of `size` centered on `p`.
pub fn rect_from_center(p: Point, size: Size) -> Rect {
    Rect::from_center_size(p, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_boxes_follow_alignment() {
        let anchor = Point::new(10.0, 5.0);
        let size = Size::new(4.0, 2.0);
        assert_eq!(
            TextAlign::Left.anchored_box(anchor, size),
            Rect::new(10.0, 5.0, 14.0, 7.0)
        );
        assert_eq!(
            TextAlign::Center.anchored_box(anchor, size),
            Rect::new(8.0, 5.0, 12.0, 7.0)
        );
        assert_eq!(
            TextAlign::Right.anchored_box(anchor, size),
            Rect::new(6.0, 5.0, 10.0, 7.0)
        );
    }

    #[test]
    fn padding_grows_every_side() {
        let r = expand(Rect::new(0.0, -8.0, 20.0, 2.0), 3.0);
        assert_eq!(r, Rect::new(-3.0, -11.0, 23.0, 5.0));
        assert_eq!(
            rect_from_center(Point::new(5.0, 5.0), Size::new(10.0, 4.0)),
            Rect::new(0.0, 3.0, 10.0, 7.0)
        );
    }
}
