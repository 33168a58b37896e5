use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Serialize;

use crate::geometry::FeatureCollection;

/// Colors assigned round-robin to new layers
pub const PALETTE: [&str; 10] = [
    "#00d4aa", "#ff6b35", "#7c3aed", "#f59e0b", "#06b6d4", "#ec4899", "#84cc16", "#f97316",
    "#8b5cf6", "#14b8a6",
];

pub const DEFAULT_OPACITY: f64 = 0.7;
pub const MIN_OPACITY: f64 = 0.05;
pub const MAX_OPACITY: f64 = 1.0;

/// Uniquely identifies a layer within a registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A loaded dataset and its presentation attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub collection: FeatureCollection,
    pub visible: bool,
    pub opacity: f64,
    pub color: String,
}

/// The ordered set of loaded layers
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
    counter: u64,
    color_index: usize,
    most_recently_added: Option<LayerId>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> LayerId {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.counter += 1;
        LayerId(format!("layer-{millis}-{}", self.counter))
    }

    fn next_color(&mut self) -> String {
        let c = PALETTE[self.color_index % PALETTE.len()];
        self.color_index += 1;
        c.to_string()
    }

    /// Adds a layer and returns its ID. The layer becomes the most recently
    /// added one.
    pub fn add(&mut self, collection: FeatureCollection, name: impl Into<String>) -> LayerId {
        let id = self.next_id();
        let color = self.next_color();
        self.layers.push(Layer {
            id: id.clone(),
            name: name.into(),
            collection,
            visible: true,
            opacity: DEFAULT_OPACITY,
            color,
        });
        self.most_recently_added = Some(id.clone());
        id
    }

    /// Removes a layer. Returns the removed layer.
    pub fn remove(&mut self, id: &LayerId) -> Option<Layer> {
        let i = self.layers.iter().position(|l| &l.id == id)?;
        if self.most_recently_added.as_ref() == Some(id) {
            self.most_recently_added = None;
        }
        Some(self.layers.remove(i))
    }

    fn get_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| &l.id == id)
    }

    pub fn set_visible(&mut self, id: &LayerId, visible: bool) {
        if let Some(l) = self.get_mut(id) {
            l.visible = visible;
        }
    }

    pub fn toggle_visible(&mut self, id: &LayerId) {
        if let Some(l) = self.get_mut(id) {
            l.visible = !l.visible;
        }
    }

    /// Sets the opacity of a layer, clamped to the range `[0.05, 1]`
    pub fn set_opacity(&mut self, id: &LayerId, opacity: f64) {
        if let Some(l) = self.get_mut(id) {
            l.opacity = if opacity.is_nan() {
                DEFAULT_OPACITY
            } else {
                opacity.clamp(MIN_OPACITY, MAX_OPACITY)
            };
        }
    }

    pub fn set_color(&mut self, id: &LayerId, color: impl Into<String>) {
        if let Some(l) = self.get_mut(id) {
            l.color = color.into();
        }
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    /// Returns all layers in the order they were added
    pub fn list(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the ID of the layer added last and forgets it, so it is
    /// returned only once
    pub fn take_most_recently_added(&mut self) -> Option<LayerId> {
        self.most_recently_added.take()
    }
}
