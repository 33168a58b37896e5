use serde_json::{Map, Value as JsonValue};
use tracing::{info, warn};

use crate::{
    error::IngestError,
    geometry::{Feature, FeatureCollection, Geometry, Properties, Value},
};

use super::{FileGroup, FileKind, InputFile};

/// Strips a `.geojson` or `.json` extension (case-insensitive)
fn layer_name(file: &InputFile) -> &str {
    let lower = file.name.to_ascii_lowercase();
    for ext in [".geojson", ".json"] {
        if lower.ends_with(ext) {
            return &file.name[..file.name.len() - ext.len()];
        }
    }
    &file.name
}

fn parse_feature(index: usize, value: &JsonValue) -> Result<Feature, IngestError> {
    let obj = value
        .as_object()
        .ok_or_else(|| IngestError::InvalidFormat(format!("feature {index} is not an object")))?;

    let geometry = match obj.get("geometry") {
        None | Some(JsonValue::Null) => None,
        Some(g) => match Geometry::try_from(g) {
            Ok(g) => Some(g),
            Err(e) => {
                warn!("Dropping unsupported geometry of feature {index}: {e}");
                None
            }
        },
    };

    let properties = match obj.get("properties") {
        Some(JsonValue::Object(p)) => convert_properties(p),
        _ => Properties::new(),
    };

    Ok(Feature {
        id: obj.get("id").cloned(),
        geometry,
        properties,
    })
}

fn convert_properties(p: &Map<String, JsonValue>) -> Properties {
    p.iter().map(|(k, v)| (k.as_str(), Value::from(v))).collect()
}

/// Parses a GeoJSON feature collection. Coordinates are taken as WGS84.
pub fn parse_geo_json(name: &str, bytes: &[u8]) -> Result<FeatureCollection, IngestError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| IngestError::InvalidFormat(format!("not valid UTF-8: {e}")))?;
    let doc: JsonValue =
        serde_json::from_str(text).map_err(|e| IngestError::InvalidFormat(e.to_string()))?;

    let features = doc
        .as_object()
        .and_then(|o| o.get("features"))
        .and_then(JsonValue::as_array)
        .ok_or_else(|| IngestError::InvalidFormat("missing features array".to_string()))?
        .iter()
        .enumerate()
        .map(|(i, f)| parse_feature(i, f))
        .collect::<Result<Vec<_>, _>>()?;

    info!("Parsed GeoJSON `{name}' with {} features", features.len());

    Ok(FeatureCollection::new(name, features))
}

/// Reads the first GeoJSON file of a group
pub fn read_geo_json(group: &FileGroup) -> Result<FeatureCollection, IngestError> {
    let file = group.find(FileKind::GeoJson).ok_or_else(|| {
        IngestError::MissingRequiredFile("No .geojson or .json file found".to_string())
    })?;
    parse_geo_json(layer_name(file), &file.bytes)
}
