// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Maps: an ordered list of layers and the style they are drawn with.

use std::sync::Arc;

use crate::source::{FeatureSource, TileSource};
use crate::style::{Filter, RuleList};

/// The rules a map is drawn with.
#[derive(Debug, Clone, Default)]
pub struct Style {
    rules: RuleList,
}

impl Style {
    /// A style with the given rules.
    pub fn new(rules: impl Into<RuleList>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    /// All rules in declaration order.
    pub fn rules(&self) -> &RuleList {
        &self.rules
    }
}

/// Where a layer's data comes from.
#[derive(Clone)]
pub enum LayerData {
    /// Vector features.
    Vector(Arc<dyn FeatureSource>),
    /// Raster tiles.
    Tiles(Arc<dyn TileSource>),
}

impl core::fmt::Debug for LayerData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Vector(_) => f.write_str("Vector(..)"),
            Self::Tiles(_) => f.write_str("Tiles(..)"),
        }
    }
}

/// A named source of features or tiles.
///
/// Rules select a layer by its name with `#name`.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    visible: bool,
    filter: Option<Filter>,
    data: LayerData,
}

impl Layer {
    /// A visible vector layer.
    pub fn vector(name: impl Into<String>, source: Arc<dyn FeatureSource>) -> Self {
        Self::new(name, LayerData::Vector(source))
    }

    /// A visible raster layer.
    pub fn tiles(name: impl Into<String>, source: Arc<dyn TileSource>) -> Self {
        Self::new(name, LayerData::Tiles(source))
    }

    fn new(name: impl Into<String>, data: LayerData) -> Self {
        Self {
            name: name.into(),
            visible: true,
            filter: None,
            data,
        }
    }

    /// Show or hide the layer.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Only draw features matching `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the renderer draws this layer.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Show or hide the layer.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Feature filter passed on every query.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// The layer's data source.
    pub fn data(&self) -> &LayerData {
        &self.data
    }
}

/// Layers drawn bottom to top, and their style.
#[derive(Debug, Clone, Default)]
pub struct Map {
    layers: Vec<Layer>,
    style: Style,
}

impl Map {
    /// An empty map drawn with `style`.
    pub fn new(style: Style) -> Self {
        Self {
            layers: Vec::new(),
            style,
        }
    }

    /// Add a layer on top.
    #[must_use]
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Add a layer on top.
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Layers in drawing order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The first layer called `name`, for toggling visibility.
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    /// The style.
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// The first layer called `name`.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }
}
