// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster tile pyramids and the tiles covering a view.

use peniko::{kurbo::Rect, Blob, Image, ImageFormat};

use crate::error::SourceError;
use crate::source::TileSource;

/// Which corner of the pyramid bounds row `0` starts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TileOrigin {
    /// Row `0` is the southernmost row (TMS).
    #[default]
    BottomLeft,
    /// Row `0` is the northernmost row (XYZ).
    TopLeft,
}

/// Number of tiles along each axis at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    /// Zoom level.
    pub z: u32,
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
}

/// A tile as read from a [`TileSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Zoom level.
    pub z: u32,
    /// Column.
    pub x: u32,
    /// Row, counted from the pyramid's [`TileOrigin`].
    pub y: u32,
    /// Encoded image bytes, `None` if the source has no data for the tile.
    pub data: Option<Vec<u8>>,
}

impl Tile {
    /// A tile with no data.
    pub fn empty(z: u32, x: u32, y: u32) -> Self {
        Self {
            z,
            x,
            y,
            data: None,
        }
    }
}

/// The tile grid of a raster source at every zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePyramid {
    bounds: Rect,
    tile_width: u32,
    tile_height: u32,
    origin: TileOrigin,
    grids: Vec<TileGrid>,
}

impl TilePyramid {
    /// A pyramid over `bounds` with tiles of the given pixel size and no grids.
    pub fn new(bounds: Rect, tile_width: u32, tile_height: u32) -> Self {
        Self {
            bounds,
            tile_width,
            tile_height,
            origin: TileOrigin::default(),
            grids: Vec::new(),
        }
    }

    /// A quadtree pyramid: zoom `z` has `2^z` by `2^z` tiles, for `z` up to `max_zoom`.
    ///
    /// Levels whose grid would not fit a `u32` (`z >= 32`) are left out.
    pub fn quadtree(bounds: Rect, tile_size: u32, max_zoom: u32) -> Self {
        (0..=max_zoom)
            .map_while(|z| Some((z, 1_u32.checked_shl(z)?)))
            .fold(Self::new(bounds, tile_size, tile_size), |p, (z, n)| {
                p.with_grid(z, n, n)
            })
    }

    /// Count rows from `origin`.
    #[must_use]
    pub fn with_origin(mut self, origin: TileOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Add the grid for zoom level `z`.
    #[must_use]
    pub fn with_grid(mut self, z: u32, width: u32, height: u32) -> Self {
        self.grids.retain(|g| g.z != z);
        self.grids.push(TileGrid { z, width, height });
        self.grids.sort_by_key(|g| g.z);
        self
    }

    /// World bounds of the pyramid.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Tile width in pixels.
    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Tile height in pixels.
    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Row origin.
    pub fn origin(&self) -> TileOrigin {
        self.origin
    }

    /// Grids in ascending zoom order.
    pub fn grids(&self) -> &[TileGrid] {
        &self.grids
    }

    /// The grid at zoom `z`.
    pub fn grid(&self, z: u32) -> Option<&TileGrid> {
        self.grids.iter().find(|g| g.z == z)
    }

    /// World units per pixel horizontally at `grid`.
    pub fn x_res(&self, grid: &TileGrid) -> f64 {
        self.bounds.width() / (f64::from(grid.width) * f64::from(self.tile_width))
    }

    /// World units per pixel vertically at `grid`.
    pub fn y_res(&self, grid: &TileGrid) -> f64 {
        self.bounds.height() / (f64::from(grid.height) * f64::from(self.tile_height))
    }

    fn tile_span(&self, grid: &TileGrid) -> (f64, f64) {
        (
            self.bounds.width() / f64::from(grid.width),
            self.bounds.height() / f64::from(grid.height),
        )
    }

    /// World bounds of tile `(x, y)` at zoom `z`.
    pub fn tile_bounds(&self, z: u32, x: u32, y: u32) -> Option<Rect> {
        let grid = self.grid(z)?;
        if x >= grid.width || y >= grid.height {
            return None;
        }
        let (tw, th) = self.tile_span(grid);
        let x0 = self.bounds.x0 + f64::from(x) * tw;
        let y0 = match self.origin {
            TileOrigin::BottomLeft => self.bounds.y0 + f64::from(y) * th,
            TileOrigin::TopLeft => self.bounds.y1 - f64::from(y + 1) * th,
        };
        Some(Rect::new(x0, y0, x0 + tw, y0 + th))
    }

    /// The grid whose horizontal resolution is closest to `res` world units per pixel.
    pub fn match_resolution(&self, res: f64) -> Option<&TileGrid> {
        self.grids
            .iter()
            .min_by(|a, b| (self.x_res(a) - res).abs().total_cmp(&(self.x_res(b) - res).abs()))
    }

    /// The tiles covering `view` when it is drawn `width` pixels wide.
    ///
    /// Returns `None` when the view misses the pyramid or there are no grids.
    pub fn cover(&self, view: Rect, width: u32, height: u32) -> Option<TileCover> {
        if width == 0 || height == 0 {
            return None;
        }
        let area = view.intersect(self.bounds);
        if area.width() <= 0.0 || area.height() <= 0.0 {
            return None;
        }
        let grid = *self.match_resolution(view.width() / f64::from(width))?;
        if grid.width == 0 || grid.height == 0 {
            return None;
        }
        let (tw, th) = self.tile_span(&grid);

        let span = |lo: f64, hi: f64, size: f64, n: u32| {
            let first = (lo / size).floor().max(0.0);
            let last = ((hi / size).ceil() - 1.0).max(first);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "clamped to the grid before conversion"
            )]
            let clamp = |v: f64| (v.min(f64::from(n - 1))) as u32;
            (clamp(first), clamp(last))
        };

        let cols = span(area.x0 - self.bounds.x0, area.x1 - self.bounds.x0, tw, grid.width);
        let rows = match self.origin {
            TileOrigin::BottomLeft => {
                span(area.y0 - self.bounds.y0, area.y1 - self.bounds.y0, th, grid.height)
            }
            TileOrigin::TopLeft => {
                span(self.bounds.y1 - area.y1, self.bounds.y1 - area.y0, th, grid.height)
            }
        };

        Some(TileCover::new(grid, self.origin, cols, rows))
    }
}

/// The rectangle of tiles of one grid that covers a view.
///
/// Cells are addressed with `(0, 0)` at the bottom left of the covered area,
/// whatever the pyramid's row origin.
#[derive(Debug, Clone)]
pub struct TileCover {
    grid: TileGrid,
    origin: TileOrigin,
    cols: (u32, u32),
    rows: (u32, u32),
    tiles: Vec<Tile>,
}

impl TileCover {
    fn new(grid: TileGrid, origin: TileOrigin, cols: (u32, u32), rows: (u32, u32)) -> Self {
        let mut cover = Self {
            grid,
            origin,
            cols,
            rows,
            tiles: Vec::new(),
        };
        let (w, h) = (cover.width(), cover.height());
        cover.tiles = (0..h)
            .flat_map(|j| (0..w).map(move |i| (i, j)))
            .map(|(i, j)| {
                let (x, y) = cover.pyramid_index(i, j);
                Tile::empty(grid.z, x, y)
            })
            .collect();
        cover
    }

    /// The grid the cover was cut from.
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.cols.1 - self.cols.0 + 1
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.rows.1 - self.rows.0 + 1
    }

    /// Inclusive pyramid column range.
    pub fn columns(&self) -> (u32, u32) {
        self.cols
    }

    /// Inclusive pyramid row range.
    pub fn rows(&self) -> (u32, u32) {
        self.rows
    }

    fn pyramid_index(&self, i: u32, j: u32) -> (u32, u32) {
        let y = match self.origin {
            TileOrigin::BottomLeft => self.rows.0 + j,
            TileOrigin::TopLeft => self.rows.1 - j,
        };
        (self.cols.0 + i, y)
    }

    fn slot(&self, x: u32, y: u32) -> Option<usize> {
        if !(self.cols.0..=self.cols.1).contains(&x) || !(self.rows.0..=self.rows.1).contains(&y) {
            return None;
        }
        let i = x - self.cols.0;
        let j = match self.origin {
            TileOrigin::BottomLeft => y - self.rows.0,
            TileOrigin::TopLeft => self.rows.1 - y,
        };
        Some((j * self.width() + i) as usize)
    }

    /// Read every tile of the cover from `source`. Tiles the source does not
    /// return stay empty.
    ///
    /// # Errors
    ///
    /// Propagates the first error reported by the source.
    pub fn fill(&mut self, source: &dyn TileSource) -> Result<(), SourceError> {
        let z = self.grid.z;
        for tile in source.read(z..=z, self.cols.0..=self.cols.1, self.rows.0..=self.rows.1)? {
            let tile = tile?;
            if tile.z != z {
                continue;
            }
            if let Some(slot) = self.slot(tile.x, tile.y) {
                self.tiles[slot] = tile;
            }
        }
        Ok(())
    }

    /// The tile in cell `(i, j)`, `j` counting up from the bottom row.
    pub fn tile(&self, i: u32, j: u32) -> Option<&Tile> {
        if i >= self.width() || j >= self.height() {
            return None;
        }
        self.tiles.get((j * self.width() + i) as usize)
    }
}

/// Decode tile bytes into an RGBA bitmap, or a transparent bitmap of the
/// given size when the tile has no data.
///
/// # Errors
///
/// Returns [`SourceError::Decode`] when the bytes are not a supported image.
pub fn decode(tile: &Tile, width: u32, height: u32) -> Result<Image, SourceError> {
    let Some(bytes) = &tile.data else {
        return Ok(blank(width, height));
    };
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (w, h) = rgba.dimensions();
    Ok(Image::new(Blob::from(rgba.into_raw()), ImageFormat::Rgba8, w, h))
}

/// A fully transparent bitmap.
pub fn blank(width: u32, height: u32) -> Image {
    let len = width as usize * height as usize * 4;
    Image::new(Blob::from(vec![0_u8; len]), ImageFormat::Rgba8, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> TilePyramid {
        TilePyramid::quadtree(Rect::new(0.0, 0.0, 1024.0, 1024.0), 256, 3)
    }

    #[test]
    fn resolutions_halve_per_level() {
        let p = world();
        assert_eq!(p.x_res(p.grid(0).unwrap()), 4.0);
        assert_eq!(p.x_res(p.grid(2).unwrap()), 1.0);
        assert_eq!(p.match_resolution(1.1).unwrap().z, 2);
    }

    #[test]
    fn quadtree_stops_before_grid_overflows() {
        let p = TilePyramid::quadtree(Rect::new(0.0, 0.0, 1.0, 1.0), 256, 40);
        assert_eq!(p.grids().len(), 32);
        let deepest = p.grid(31).unwrap();
        assert_eq!((deepest.width, deepest.height), (1 << 31, 1 << 31));
        assert!(p.grid(32).is_none());
    }

    #[test]
    fn tile_bounds_follow_origin() {
        let tms = world();
        assert_eq!(tms.tile_bounds(1, 0, 0), Some(Rect::new(0.0, 0.0, 512.0, 512.0)));
        let xyz = world().with_origin(TileOrigin::TopLeft);
        assert_eq!(
            xyz.tile_bounds(1, 0, 0),
            Some(Rect::new(0.0, 512.0, 512.0, 1024.0))
        );
        assert_eq!(tms.tile_bounds(1, 2, 0), None);
    }

    #[test]
    fn cover_picks_tiles_under_view() {
        // 1 world unit per pixel selects z = 2, 256 world units per tile.
        let cover = world()
            .cover(Rect::new(300.0, 100.0, 600.0, 300.0), 300, 200)
            .unwrap();
        assert_eq!(cover.grid().z, 2);
        assert_eq!(cover.columns(), (1, 2));
        assert_eq!(cover.rows(), (0, 1));
        assert_eq!((cover.width(), cover.height()), (2, 2));
        let t = cover.tile(1, 1).unwrap();
        assert_eq!((t.x, t.y), (2, 1));
    }

    #[test]
    fn top_left_cover_counts_cells_from_bottom() {
        let cover = world()
            .with_origin(TileOrigin::TopLeft)
            .cover(Rect::new(0.0, 0.0, 256.0, 512.0), 256, 512)
            .unwrap();
        assert_eq!(cover.rows(), (2, 3));
        assert_eq!(cover.tile(0, 0).unwrap().y, 3);
        assert_eq!(cover.tile(0, 1).unwrap().y, 2);
    }

    #[test]
    fn cover_misses_outside_view() {
        assert!(world()
            .cover(Rect::new(2000.0, 2000.0, 3000.0, 3000.0), 100, 100)
            .is_none());
    }

    #[test]
    fn missing_tiles_decode_blank() {
        let img = decode(&Tile::empty(0, 0, 0), 4, 2).unwrap();
        assert_eq!((img.width, img.height), (4, 2));
        assert!(img.data.data().iter().all(|b| *b == 0));
    }
}
