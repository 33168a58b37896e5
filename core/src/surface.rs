use std::io::Write;

use anyhow::{Context, Result};
use geo::Rect;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::{
    geometry::FeatureCollection,
    registry::{Layer, LayerId, LayerRegistry},
    settings::Settings,
    simplify::{should_simplify, simplify_collection},
    util::bounds::bounds,
};

/// How a map surface draws a layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStyle {
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub stroke_weight: f64,
}

impl LayerStyle {
    pub fn for_layer(layer: &Layer) -> Self {
        Self {
            fill_color: layer.color.clone(),
            fill_opacity: layer.opacity * 0.6,
            stroke_color: layer.color.clone(),
            stroke_weight: 1.0,
        }
    }

    /// The style of a feature under the pointer
    pub fn hover(layer: &Layer) -> Self {
        Self {
            fill_opacity: (layer.opacity * 0.9).min(1.0),
            stroke_weight: 2.5,
            ..Self::for_layer(layer)
        }
    }
}

/// Something that displays styled layers, e.g. a basemap widget
pub trait MapSurface {
    /// Adds a layer with the given payload
    fn add_layer(
        &mut self,
        id: &LayerId,
        collection: FeatureCollection,
        style: LayerStyle,
        visible: bool,
    );

    /// Changes the style or visibility of a layer that has been added
    /// before
    fn update_layer(&mut self, id: &LayerId, style: LayerStyle, visible: bool);

    /// Replaces the payload of a layer that has been added before. The
    /// layer keeps its position on the surface.
    fn replace_data(&mut self, id: &LayerId, collection: FeatureCollection);

    fn remove_layer(&mut self, id: &LayerId);

    /// Moves the viewport so that it covers the given rectangle
    fn fit_bounds(&mut self, bounds: Rect);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SimplifyParams {
    tolerance: f64,
    threshold: usize,
}

impl From<&Settings> for SimplifyParams {
    fn from(s: &Settings) -> Self {
        Self {
            tolerance: s.simplify_tolerance,
            threshold: s.max_features_without_simplify,
        }
    }
}

/// Mirrors the contents of a [`LayerRegistry`] onto a [`MapSurface`]
#[derive(Debug, Default)]
pub struct RenderSync {
    /// Layers on the surface and the parameters their payload was derived
    /// with
    shown: FxHashMap<LayerId, SimplifyParams>,
}

impl RenderSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the payload to display for a layer. Large layers are
    /// simplified. The layer itself is never modified.
    pub fn payload(layer: &Layer, settings: &Settings) -> FeatureCollection {
        if should_simplify(&layer.collection, settings) {
            debug!(
                "Simplifying layer `{}' with {} features",
                layer.name, layer.collection.feature_count
            );
            simplify_collection(&layer.collection, settings.simplify_tolerance)
        } else {
            layer.collection.clone()
        }
    }

    /// Brings the surface up to date with the registry. Consumes the
    /// registry's most recently added layer and fits the surface to its
    /// bounds.
    pub fn sync(
        &mut self,
        registry: &mut LayerRegistry,
        settings: &Settings,
        surface: &mut dyn MapSurface,
    ) {
        let params = SimplifyParams::from(settings);

        let stale = self
            .shown
            .keys()
            .filter(|id| registry.get(id).is_none())
            .cloned()
            .collect::<Vec<_>>();
        for id in stale {
            surface.remove_layer(&id);
            self.shown.remove(&id);
        }

        for layer in registry.list() {
            let style = LayerStyle::for_layer(layer);
            match self.shown.get(&layer.id).copied() {
                Some(p) if p == params => {}
                // derive the payload again from the original collection
                Some(_) => surface.replace_data(&layer.id, Self::payload(layer, settings)),
                None => {
                    let payload = Self::payload(layer, settings);
                    surface.add_layer(&layer.id, payload, style, layer.visible);
                    self.shown.insert(layer.id.clone(), params);
                    continue;
                }
            }
            surface.update_layer(&layer.id, style, layer.visible);
            self.shown.insert(layer.id.clone(), params);
        }

        if let Some(id) = registry.take_most_recently_added() {
            if let Some(b) = registry.get(&id).and_then(|l| bounds(&l.collection)) {
                surface.fit_bounds(b);
            }
        }
    }
}

/// A layer shown on a [`GeoJsonSurface`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceLayer {
    pub id: LayerId,
    pub visible: bool,
    pub style: LayerStyle,
    pub data: FeatureCollection,
}

#[derive(Serialize)]
struct SurfaceDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<[f64; 4]>,
    layers: &'a [SurfaceLayer],
}

/// A [`MapSurface`] that keeps the styled layers in memory and writes them
/// as a single JSON document
#[derive(Debug, Default)]
pub struct GeoJsonSurface {
    layers: Vec<SurfaceLayer>,
    viewport: Option<Rect>,
}

impl GeoJsonSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[SurfaceLayer] {
        &self.layers
    }

    pub fn viewport(&self) -> Option<Rect> {
        self.viewport
    }

    pub fn write_to(&self, writer: impl Write) -> Result<()> {
        let doc = SurfaceDocument {
            bounds: self
                .viewport
                .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]),
            layers: &self.layers,
        };
        serde_json::to_writer_pretty(writer, &doc).context("Unable to write layers")
    }
}

impl MapSurface for GeoJsonSurface {
    fn add_layer(
        &mut self,
        id: &LayerId,
        collection: FeatureCollection,
        style: LayerStyle,
        visible: bool,
    ) {
        self.layers.push(SurfaceLayer {
            id: id.clone(),
            visible,
            style,
            data: collection,
        });
    }

    fn update_layer(&mut self, id: &LayerId, style: LayerStyle, visible: bool) {
        if let Some(l) = self.layers.iter_mut().find(|l| &l.id == id) {
            l.style = style;
            l.visible = visible;
        }
    }

    fn replace_data(&mut self, id: &LayerId, collection: FeatureCollection) {
        if let Some(l) = self.layers.iter_mut().find(|l| &l.id == id) {
            l.data = collection;
        }
    }

    fn remove_layer(&mut self, id: &LayerId) {
        self.layers.retain(|l| &l.id != id);
    }

    fn fit_bounds(&mut self, bounds: Rect) {
        self.viewport = Some(bounds);
    }
}
