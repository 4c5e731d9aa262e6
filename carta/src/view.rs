// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The region of the world being rendered, and the pixel surface it lands on.

use core::fmt;
use std::sync::Arc;

use peniko::kurbo::{Point, Rect, Size, Vec2};

use crate::error::{Error, Result};

/// A coordinate reference system, identified by its authority code (e.g. `EPSG:3857`).
///
/// Carta never interprets the code itself, it is only compared and handed to a
/// [`Reproject`](crate::source::Reproject) implementation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Crs(Arc<str>);

impl Crs {
    /// Make a CRS from its code.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(Arc::from(code.as_ref()))
    }

    /// The code this CRS was created from.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Compare two codes ignoring ASCII case, so `epsg:4326` equals `EPSG:4326`.
    pub fn same_as(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Debug for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Crs").field(&&*self.0).finish()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// World bounds mapped onto a pixel surface.
///
/// The world y axis points up and the device y axis points down, so the
/// vertical scale is applied negated by the
/// [`TransformPipeline`](crate::transform::TransformPipeline).
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    bounds: Rect,
    width: u32,
    height: u32,
    crs: Option<Crs>,
}

impl Viewport {
    /// Create a viewport showing `bounds` on a `width` by `height` pixel surface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidViewport`] if either pixel dimension is zero or the
    /// bounds have no area.
    pub fn new(bounds: Rect, width: u32, height: u32) -> Result<Self> {
        let vp = Self {
            bounds: bounds.abs(),
            width,
            height,
            crs: None,
        };
        vp.validate()?;
        Ok(vp)
    }

    /// Set the coordinate reference system of the view.
    #[must_use]
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidViewport("pixel size must be non-zero"));
        }
        if !(self.bounds.width() > 0.0 && self.bounds.height() > 0.0) {
            return Err(Error::InvalidViewport("world bounds must have a positive area"));
        }
        Ok(())
    }

    /// World bounds of the view.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Replace the world bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidViewport`] and leaves the view unchanged if the
    /// bounds have no area.
    pub fn set_bounds(&mut self, bounds: Rect) -> Result<()> {
        let old = core::mem::replace(&mut self.bounds, bounds.abs());
        self.validate().inspect_err(|_| self.bounds = old)
    }

    /// Width of the surface in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the surface in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel size of the surface.
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Resize the pixel surface, keeping the world bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidViewport`] and leaves the view unchanged if either
    /// dimension is zero.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidViewport("pixel size must be non-zero"));
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Coordinate reference system of the view, if known.
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Change the coordinate reference system.
    ///
    /// This does not affect the transform pipeline.
    pub fn set_crs(&mut self, crs: Option<Crs>) {
        self.crs = crs;
    }

    /// Pixels per world unit along x.
    pub fn scale_x(&self) -> f64 {
        f64::from(self.width) / self.bounds.width()
    }

    /// Pixels per world unit along y.
    pub fn scale_y(&self) -> f64 {
        f64::from(self.height) / self.bounds.height()
    }

    /// World units per pixel along x.
    pub fn iscale_x(&self) -> f64 {
        self.bounds.width() / f64::from(self.width)
    }

    /// World units per pixel along y.
    pub fn iscale_y(&self) -> f64 {
        self.bounds.height() / f64::from(self.height)
    }

    /// Horizontal translation applied after scaling.
    pub fn translate_x(&self) -> f64 {
        -self.bounds.min_x() * self.scale_x()
    }

    /// Vertical translation applied after the flipped scale, putting the top of
    /// the world bounds at device y = 0.
    pub fn translate_y(&self) -> f64 {
        self.bounds.max_y() * self.scale_y()
    }

    /// Pan by a delta in device pixels. Positive `dy` moves the view towards the
    /// bottom of the screen.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let d = Vec2::new(-dx * self.iscale_x(), dy * self.iscale_y());
        self.bounds = self.bounds + d;
    }

    /// Zoom by `factor` (greater than one zooms in) keeping the world point under
    /// the device position `anchor` fixed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidViewport`] and leaves the view unchanged if the
    /// factor is not positive and finite.
    pub fn zoom_about(&mut self, anchor: Point, factor: f64) -> Result<()> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(Error::InvalidViewport("zoom factor must be positive"));
        }
        let world = Point::new(
            self.bounds.min_x() + anchor.x * self.iscale_x(),
            self.bounds.max_y() - anchor.y * self.iscale_y(),
        );
        let w = self.bounds.width() / factor;
        let h = self.bounds.height() / factor;
        let fx = anchor.x / f64::from(self.width);
        let fy = anchor.y / f64::from(self.height);
        let min_x = world.x - fx * w;
        let max_y = world.y + fy * h;
        self.set_bounds(Rect::new(min_x, max_y - h, min_x + w, max_y))
    }
}
