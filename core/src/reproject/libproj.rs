use anyhow::{bail, Result};
use geo::{coord, Coord};
use proj::Proj;

use super::{CoordinateTransform, Crs};

/// A [`CoordinateTransform`] backed by the PROJ C library
pub struct LibProjTransform {
    proj: Proj,
}

impl LibProjTransform {
    pub fn new(crs: Crs) -> Result<Self> {
        let proj = Proj::new_known_crs(&crs.to_string(), "WGS84", None)?;
        Ok(Self { proj })
    }
}

impl CoordinateTransform for LibProjTransform {
    fn transform(&self, c: Coord) -> Result<Coord> {
        let (x, y) = self.proj.convert((c.x, c.y))?;
        if !x.is_finite() || !y.is_finite() {
            bail!("Transformation of ({}, {}) is not finite", c.x, c.y);
        }
        Ok(coord! { x: x, y: y })
    }
}
