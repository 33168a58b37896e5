use anyhow::{anyhow, bail, Result};
use geo::{coord, Coord};
use proj4rs::Proj;

use super::Crs;

const WGS84_DEFINITION: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Converts single coordinates from a source CRS to WGS84 longitude and
/// latitude in degrees
pub trait CoordinateTransform {
    fn transform(&self, c: Coord) -> Result<Coord>;
}

/// A [`CoordinateTransform`] backed by the pure Rust `proj4rs` crate
pub struct Proj4Transform {
    from: Proj,
    to: Proj,
}

impl Proj4Transform {
    pub fn new(crs: Crs) -> Result<Self> {
        let from = Proj::from_proj_string(crs.proj_definition())
            .map_err(|e| anyhow!("Invalid definition for {crs}: {e:?}"))?;
        let to = Proj::from_proj_string(WGS84_DEFINITION)
            .map_err(|e| anyhow!("Invalid WGS84 definition: {e:?}"))?;
        Ok(Self { from, to })
    }
}

impl CoordinateTransform for Proj4Transform {
    fn transform(&self, c: Coord) -> Result<Coord> {
        let mut point = (c.x, c.y, 0.0);
        proj4rs::transform::transform(&self.from, &self.to, &mut point)
            .map_err(|e| anyhow!("Unable to transform ({}, {}): {e:?}", c.x, c.y))?;

        // geographic coordinates are returned in radians
        let (x, y) = (point.0.to_degrees(), point.1.to_degrees());
        if !x.is_finite() || !y.is_finite() {
            bail!("Transformation of ({}, {}) is not finite", c.x, c.y);
        }
        Ok(coord! { x: x, y: y })
    }
}
