// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Carta renders styled geospatial layers and places their labels.
//!
//! A [`Map`] is an ordered list of layers, each backed by a
//! [`FeatureSource`] or a [`TileSource`], and a [`Style`] of CartoCSS-like
//! rules. A [`Renderer`] bound to a [`Viewport`] draws the map onto any
//! [`Canvas`]:
//!
//! - the background from the `Map` rules, in device space;
//! - vector layers, one pass per `z-index` group, with lines and polygons
//!   drawn in world space and markers in device space;
//! - raster layers, by compositing the tiles of the pyramid level that best
//!   matches the view resolution;
//! - finally every label accepted by the [`LabelIndex`] during the frame.
//!
//! Point labels are boxes anchored at a geometry's centroid. Line labels
//! follow their line glyph by glyph and are rejected when they do not fit or
//! bend too sharply.
//!
//! [`DisplayList`] is a [`Canvas`] that records draw calls, which is useful for
//! tests and for replaying a frame onto another surface. The `carta_vello`
//! crate draws into a Vello scene.
//!
//! ## Features
//!
//! - `png` (enabled by default): decode PNG tiles.
//! - `jpeg` (enabled by default): decode JPEG tiles.

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use peniko;

pub mod canvas;
pub mod displaylist;
pub mod error;
pub mod label;
pub mod labeller;
pub mod map;
pub mod paint;
pub mod path;
pub mod render;
pub mod sampler;
pub mod source;
pub mod style;
pub mod symbolizer;
pub mod text;
pub mod tile;
pub mod transform;
pub mod view;

pub use canvas::Canvas;
pub use displaylist::DisplayList;
pub use error::{Error, Result, SourceError};
pub use label::{Label, LabelIndex};
pub use labeller::{Labeller, LabellerOptions};
pub use map::{Layer, Map, Style};
pub use render::{RenderReport, Renderer};
pub use source::{Feature, FeatureSource, TileSource};
pub use transform::TransformPipeline;
pub use view::{Crs, Viewport};
