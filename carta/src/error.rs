// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use thiserror::Error;

/// Errors produced by the rendering pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The viewport has a zero or negative pixel size, or empty world bounds.
    #[error("invalid viewport: {0}")]
    InvalidViewport(&'static str),
    /// The world to canvas transform has no inverse.
    #[error("world to canvas transform is singular (determinant {0})")]
    SingularTransform(f64),
    /// A geometry kind the path builder or renderer cannot draw.
    #[error("unsupported geometry kind: {0}")]
    UnsupportedGeometry(&'static str),
    /// [`Renderer::render`](crate::render::Renderer::render) was called before `init`.
    #[error("renderer has not been initialized with a viewport")]
    NotInitialized,
    /// Spline tension outside of `[0, 1]`.
    #[error("spline tension must be between 0 and 1 inclusive, got {0}")]
    InvalidTension(f64),
    /// Not enough coordinates to build a curve.
    #[error("at least 2 coordinates are required, got {0}")]
    TooFewCoordinates(usize),
    /// A feature or tile source failed.
    #[error("querying layer `{layer}` failed")]
    Source {
        /// Name of the layer being queried.
        layer: String,
        /// Underlying failure.
        #[source]
        source: SourceError,
    },
}

/// Failures reported by [`FeatureSource`](crate::source::FeatureSource) and
/// [`TileSource`](crate::source::TileSource) implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// I/O failure in the backing store.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Tile bytes could not be decoded.
    #[error("failed to decode tile image")]
    Decode(#[from] image::ImageError),
    /// Free-form failure description.
    #[error("{0}")]
    Message(String),
    /// Any other error from a source implementation.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience alias for results in this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
