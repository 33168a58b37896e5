use itertools::Itertools;

use crate::{
    geometry::{Feature, Properties, Value},
    registry::{Layer, LayerId},
};

/// Displayed for attributes without a value
pub const NO_VALUE: &str = "—";

/// A feature together with the layer it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInfo {
    pub layer_id: LayerId,
    pub layer_name: String,
    pub feature: Feature,
}

impl FeatureInfo {
    pub fn new(layer: &Layer, feature: &Feature) -> Self {
        Self {
            layer_id: layer.id.clone(),
            layer_name: layer.name.clone(),
            feature: feature.clone(),
        }
    }
}

/// Tracks the feature under the pointer and the selected feature
#[derive(Debug, Default)]
pub struct Inspector {
    hovered: Option<FeatureInfo>,
    selected: Option<FeatureInfo>,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when the pointer enters (`Some`) or leaves (`None`) a feature
    pub fn hover(&mut self, layer: &Layer, feature: Option<&Feature>) {
        self.hovered = feature.map(|f| FeatureInfo::new(layer, f));
    }

    /// Selects a feature. Clicking an empty spot (`None`) clears the
    /// selection.
    pub fn click(&mut self, layer: &Layer, feature: Option<&Feature>) {
        self.selected = feature.map(|f| FeatureInfo::new(layer, f));
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Forgets features of a layer that has been removed
    pub fn on_layer_removed(&mut self, id: &LayerId) {
        if self.selected.as_ref().is_some_and(|s| &s.layer_id == id) {
            self.selected = None;
        }
        if self.hovered.as_ref().is_some_and(|h| &h.layer_id == id) {
            self.hovered = None;
        }
    }

    pub fn selected(&self) -> Option<&FeatureInfo> {
        self.selected.as_ref()
    }

    pub fn hovered(&self) -> Option<&FeatureInfo> {
        self.hovered.as_ref()
    }

    /// The feature to display. A selected feature wins over a hovered one.
    pub fn current(&self) -> Option<&FeatureInfo> {
        self.selected.as_ref().or(self.hovered.as_ref())
    }
}

fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string();
    }

    let s = format!("{:.3}", n.abs());
    let (int, frac) = s.split_once('.').unwrap_or((s.as_str(), ""));
    let frac = frac.trim_end_matches('0');
    let int = int
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(String::from_utf8_lossy)
        .join(",");

    let sign = if n < 0.0 && (int != "0" || !frac.is_empty()) {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}{int}")
    } else {
        format!("{sign}{int}.{frac}")
    }
}

/// Formats an attribute value for display. Numbers get thousands separators
/// and at most three fraction digits.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => NO_VALUE.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.clone(),
    }
}

/// Returns the attributes worth displaying with their formatted values.
/// Null values and empty strings are skipped.
pub fn visible_attributes(properties: &Properties) -> Vec<(&str, String)> {
    properties
        .iter()
        .filter(|(_, v)| match v {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
        .map(|(k, v)| (k, format_value(v)))
        .collect()
}
