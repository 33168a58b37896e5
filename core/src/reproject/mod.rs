use std::{
    collections::hash_map::Entry::{Occupied, Vacant},
    fmt,
    rc::Rc,
    sync::OnceLock,
};

use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::geometry::Geometry;

pub use self::transform::{CoordinateTransform, Proj4Transform};

#[cfg(feature = "libproj")]
pub mod libproj;
pub mod transform;

/// A projected coordinate reference system that can be converted to WGS84
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// WGS 84 / UTM zone 46N
    Utm46N,

    /// WGS 84 / UTM zone 47N
    Utm47N,
}

impl Crs {
    pub fn from_utm_zone(zone: u32) -> Option<Self> {
        match zone {
            46 => Some(Crs::Utm46N),
            47 => Some(Crs::Utm47N),
            _ => None,
        }
    }

    pub fn from_epsg_code(code: u32) -> Option<Self> {
        match code {
            32646 => Some(Crs::Utm46N),
            32647 => Some(Crs::Utm47N),
            _ => None,
        }
    }

    pub fn epsg_code(self) -> u16 {
        match self {
            Crs::Utm46N => 32646,
            Crs::Utm47N => 32647,
        }
    }

    /// Returns the PROJ definition string of this CRS
    pub fn proj_definition(self) -> &'static str {
        match self {
            Crs::Utm46N => "+proj=utm +zone=46 +datum=WGS84 +units=m +no_defs",
            Crs::Utm47N => "+proj=utm +zone=47 +datum=WGS84 +units=m +no_defs",
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg_code())
    }
}

/// The result of examining projection metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// No metadata or only whitespace
    Empty,

    /// Coordinates are already WGS84 longitude/latitude
    Wgs84,

    /// A known projected CRS
    Projected(Crs),

    /// Metadata that does not match any known pattern. Coordinates will be
    /// passed through unchanged.
    Unrecognized,
}

impl Detection {
    /// Returns the CRS to convert from, or [`None`] if no transformation
    /// should be applied
    pub fn crs(self) -> Option<Crs> {
        match self {
            Detection::Projected(crs) => Some(crs),
            _ => None,
        }
    }
}

/// Matches EPSG codes in WKT authority clauses (`AUTHORITY["EPSG","32646"]`)
/// and in `EPSG:32646` notation
const EPSG_CODE_REGEX: &str = r#"(?i)EPSG"?\s*[,:]\s*"?(\d{4,5})"#;

/// Matches UTM zone numbers such as `WGS_1984_UTM_Zone_46N` or `UTM zone 47N`
const UTM_ZONE_REGEX: &str = r"(?i)UTM[_\s]*(?:zone[_\s]*)?(\d{1,2})";

const WGS84_MARKERS: [&str; 3] = ["GCS_WGS_1984", "WGS84", "WGS 1984"];

fn epsg_code_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    // # Panic Safety
    // The unit test `regexes_are_valid` makes sure the pattern compiles
    REGEX.get_or_init(|| Regex::new(EPSG_CODE_REGEX).expect("the supplied regex should be valid"))
}

fn utm_zone_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    // # Panic Safety
    // The unit test `regexes_are_valid` makes sure the pattern compiles
    REGEX.get_or_init(|| Regex::new(UTM_ZONE_REGEX).expect("the supplied regex should be valid"))
}

/// Examines the contents of a `.prj` file and determines the coordinate
/// reference system the shapes are stored in.
///
/// A recognized projection takes precedence over WGS84 markers because
/// projected WKT usually names its geographic base CRS as well (e.g.
/// `PROJCS["WGS_1984_UTM_Zone_46N",GEOGCS["GCS_WGS_1984",...]]`).
pub fn detect_projection(text: &str) -> Detection {
    if text.trim().is_empty() {
        return Detection::Empty;
    }

    for c in epsg_code_regex().captures_iter(text) {
        let code = c.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        if let Some(crs) = code.and_then(Crs::from_epsg_code) {
            return Detection::Projected(crs);
        }
    }

    if let Some(c) = utm_zone_regex().captures(text) {
        let zone = c.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        if let Some(crs) = zone.and_then(Crs::from_utm_zone) {
            return Detection::Projected(crs);
        }
    } else if text.contains("UTM") {
        // UTM without a readable zone number
        if text.contains("46") {
            return Detection::Projected(Crs::Utm46N);
        }
        if text.contains("47") {
            return Detection::Projected(Crs::Utm47N);
        }
    }

    if WGS84_MARKERS.iter().any(|m| text.contains(m)) {
        return Detection::Wgs84;
    }

    Detection::Unrecognized
}

/// Returns the CRS to convert from or [`None`] if the coordinates should be
/// used as they are
pub fn detect_source_crs(text: &str) -> Option<Crs> {
    detect_projection(text).crs()
}

/// Converts geometries to WGS84. Keeps one transformation object per source
/// CRS.
#[derive(Default)]
pub struct Reprojector {
    cache: FxHashMap<Crs, Option<Rc<dyn CoordinateTransform>>>,
}

impl Reprojector {
    /// Uses the given transformation for all coordinates in `crs`
    pub fn register(&mut self, crs: Crs, transform: Rc<dyn CoordinateTransform>) {
        self.cache.insert(crs, Some(transform));
    }

    /// Returns the transformation object for the given CRS or [`None`] if it
    /// could not be created
    pub fn transformer(&mut self, crs: Crs) -> Option<Rc<dyn CoordinateTransform>> {
        match self.cache.entry(crs) {
            Occupied(e) => e.get().clone(),
            Vacant(e) => {
                let t = match new_transform(crs) {
                    Ok(t) => Some(t),
                    Err(err) => {
                        warn!("Unable to create transformation from {crs} to WGS84: {err:#}");
                        None
                    }
                };
                e.insert(t).clone()
            }
        }
    }

    /// Converts every coordinate of `geometry` from `crs` to WGS84. Returns
    /// the geometry unchanged if `crs` is [`None`]. Coordinates that cannot
    /// be converted keep their original value.
    pub fn reproject(&mut self, geometry: Geometry, crs: Option<Crs>) -> Geometry {
        let Some(crs) = crs else {
            return geometry;
        };
        let Some(t) = self.transformer(crs) else {
            return geometry;
        };
        geometry.map_coords(|c| t.transform(c).unwrap_or(c))
    }
}

#[cfg(not(feature = "libproj"))]
fn new_transform(crs: Crs) -> anyhow::Result<Rc<dyn CoordinateTransform>> {
    Ok(Rc::new(Proj4Transform::new(crs)?))
}

#[cfg(feature = "libproj")]
fn new_transform(crs: Crs) -> anyhow::Result<Rc<dyn CoordinateTransform>> {
    Ok(Rc::new(libproj::LibProjTransform::new(crs)?))
}
