use geo::{coord, Coord};
use serde::{
    ser::{SerializeMap, SerializeSeq, SerializeStruct, SerializeTuple},
    Serialize, Serializer,
};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// A ring or line: an ordered sequence of coordinates
pub type Line = Vec<Coord>;

/// The rings of a polygon. The first ring is the exterior.
pub type Rings = Vec<Line>;

/// A geometry in WGS84 longitude (`x`) and latitude (`y`). Each variant has
/// a fixed coordinate nesting depth. See [`Geometry::depth`].
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    MultiPoint(Line),
    LineString(Line),
    Polygon(Rings),
    MultiLineString(Rings),
    MultiPolygon(Vec<Rings>),
}

/// An error that happened while converting a JSON value to a [`Geometry`]
#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("geometry must be a JSON object")]
    NotAnObject,

    #[error("geometry has no `type' member")]
    MissingType,

    #[error("unsupported geometry type `{0}'")]
    UnsupportedType(String),

    #[error("geometry has no `coordinates' member")]
    MissingCoordinates,

    #[error("expected an array of coordinates at nesting depth {0}")]
    ExpectedArray(usize),

    #[error("a position must contain at least two numbers")]
    InvalidPosition,
}

impl Geometry {
    /// Returns the GeoJSON type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Returns how many array levels lie between the geometry and its leaf
    /// coordinates
    pub fn depth(&self) -> usize {
        match self {
            Geometry::Point(_) => 0,
            Geometry::MultiPoint(_) | Geometry::LineString(_) => 1,
            Geometry::Polygon(_) | Geometry::MultiLineString(_) => 2,
            Geometry::MultiPolygon(_) => 3,
        }
    }

    /// Calls `f` for every leaf coordinate in order
    pub fn for_each_coord<F: FnMut(&Coord)>(&self, mut f: F) {
        match self {
            Geometry::Point(c) => f(c),
            Geometry::MultiPoint(l) | Geometry::LineString(l) => l.iter().for_each(f),
            Geometry::Polygon(r) | Geometry::MultiLineString(r) => r.iter().flatten().for_each(f),
            Geometry::MultiPolygon(p) => p.iter().flatten().flatten().for_each(f),
        }
    }

    /// Creates a new geometry of the same shape with `f` applied to every
    /// leaf coordinate
    pub fn map_coords<F: FnMut(Coord) -> Coord>(&self, mut f: F) -> Geometry {
        fn line<F: FnMut(Coord) -> Coord>(l: &[Coord], f: &mut F) -> Line {
            l.iter().map(|c| f(*c)).collect()
        }

        fn rings<F: FnMut(Coord) -> Coord>(r: &[Line], f: &mut F) -> Rings {
            r.iter().map(|l| line(l, f)).collect()
        }

        match self {
            Geometry::Point(c) => Geometry::Point(f(*c)),
            Geometry::MultiPoint(l) => Geometry::MultiPoint(line(l, &mut f)),
            Geometry::LineString(l) => Geometry::LineString(line(l, &mut f)),
            Geometry::Polygon(r) => Geometry::Polygon(rings(r, &mut f)),
            Geometry::MultiLineString(r) => Geometry::MultiLineString(rings(r, &mut f)),
            Geometry::MultiPolygon(p) => {
                Geometry::MultiPolygon(p.iter().map(|r| rings(r, &mut f)).collect())
            }
        }
    }

    /// Returns the total number of leaf coordinates
    pub fn coord_count(&self) -> usize {
        let mut n = 0;
        self.for_each_coord(|_| n += 1);
        n
    }
}

/// Parses a GeoJSON position. Anything after the second number (e.g. an
/// altitude) is dropped.
fn parse_position(value: &JsonValue) -> Result<Coord, GeometryError> {
    let arr = value.as_array().ok_or(GeometryError::ExpectedArray(0))?;
    match (
        arr.first().and_then(JsonValue::as_f64),
        arr.get(1).and_then(JsonValue::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(coord! { x: x, y: y }),
        _ => Err(GeometryError::InvalidPosition),
    }
}

fn parse_array<T>(
    value: &JsonValue,
    depth: usize,
    f: impl Fn(&JsonValue) -> Result<T, GeometryError>,
) -> Result<Vec<T>, GeometryError> {
    value
        .as_array()
        .ok_or(GeometryError::ExpectedArray(depth))?
        .iter()
        .map(f)
        .collect()
}

fn parse_line(value: &JsonValue) -> Result<Line, GeometryError> {
    parse_array(value, 1, parse_position)
}

fn parse_rings(value: &JsonValue) -> Result<Rings, GeometryError> {
    parse_array(value, 2, parse_line)
}

impl TryFrom<&JsonValue> for Geometry {
    type Error = GeometryError;

    fn try_from(value: &JsonValue) -> Result<Self, Self::Error> {
        let obj = value.as_object().ok_or(GeometryError::NotAnObject)?;
        let tpe = obj
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or(GeometryError::MissingType)?;
        let coords = obj
            .get("coordinates")
            .ok_or(GeometryError::MissingCoordinates)?;

        Ok(match tpe {
            "Point" => Geometry::Point(parse_position(coords)?),
            "MultiPoint" => Geometry::MultiPoint(parse_line(coords)?),
            "LineString" => Geometry::LineString(parse_line(coords)?),
            "Polygon" => Geometry::Polygon(parse_rings(coords)?),
            "MultiLineString" => Geometry::MultiLineString(parse_rings(coords)?),
            "MultiPolygon" => Geometry::MultiPolygon(parse_array(coords, 3, parse_rings)?),
            other => return Err(GeometryError::UnsupportedType(other.to_string())),
        })
    }
}

struct Position<'a>(&'a Coord);

impl Serialize for Position<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut t = serializer.serialize_tuple(2)?;
        t.serialize_element(&self.0.x)?;
        t.serialize_element(&self.0.y)?;
        t.end()
    }
}

struct Positions<'a>(&'a [Coord]);

impl Serialize for Positions<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_seq(Some(self.0.len()))?;
        for c in self.0 {
            s.serialize_element(&Position(c))?;
        }
        s.end()
    }
}

struct RingPositions<'a>(&'a [Line]);

impl Serialize for RingPositions<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_seq(Some(self.0.len()))?;
        for l in self.0 {
            s.serialize_element(&Positions(l))?;
        }
        s.end()
    }
}

impl Serialize for Geometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Geometry", 2)?;
        s.serialize_field("type", self.type_name())?;
        match self {
            Geometry::Point(c) => s.serialize_field("coordinates", &Position(c))?,
            Geometry::MultiPoint(l) | Geometry::LineString(l) => {
                s.serialize_field("coordinates", &Positions(l))?
            }
            Geometry::Polygon(r) | Geometry::MultiLineString(r) => {
                s.serialize_field("coordinates", &RingPositions(r))?
            }
            Geometry::MultiPolygon(p) => {
                let polys = p.iter().map(|r| RingPositions(r)).collect::<Vec<_>>();
                s.serialize_field("coordinates", &polys)?
            }
        }
        s.end()
    }
}

/// An attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&JsonValue> for Value {
    /// Converts a JSON value. Objects and arrays are kept as their compact
    /// JSON text.
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => Value::String(value.to_string()),
        }
    }
}

/// An ordered mapping from attribute names to values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<(String, Value)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value. An existing entry with the same key is replaced
    /// in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(e) => e.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut p = Properties::new();
        for (k, v) in iter {
            p.insert(k, v);
        }
        p
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut m = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            m.serialize_entry(k, v)?;
        }
        m.end()
    }
}

/// A geometry with attributes. The geometry may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    pub geometry: Option<Geometry>,
    pub properties: Properties,
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, properties: Properties) -> Self {
        Self {
            id: None,
            geometry,
            properties,
        }
    }
}

/// The canonical payload of a layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection", rename_all = "camelCase")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub name: String,
    pub feature_count: usize,

    /// The attribute keys of the first feature
    #[serde(rename = "properties")]
    pub fields: Vec<String>,
}

impl FeatureCollection {
    /// Creates a collection and derives the cached feature count and the
    /// field list from `features`
    pub fn new(name: impl Into<String>, features: Vec<Feature>) -> Self {
        let fields = features
            .first()
            .map(|f| f.properties.keys().map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            feature_count: features.len(),
            features,
            name: name.into(),
            fields,
        }
    }
}
