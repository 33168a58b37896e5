use geo::{Coord, EuclideanDistance, Point};

use crate::{
    geometry::{Feature, FeatureCollection, Geometry, Line, Rings},
    settings::Settings,
};

/// Rings with at most this many points are never simplified
const MIN_RING_POINTS: usize = 4;

/// Decides whether a collection is large enough to be simplified before it
/// is rendered
pub fn should_simplify(collection: &FeatureCollection, settings: &Settings) -> bool {
    collection.feature_count > settings.max_features_without_simplify
        && settings.simplify_tolerance != 0.0
        && settings.simplify_tolerance.is_finite()
}

fn distance(a: Coord, b: Coord) -> f64 {
    Point::from(a).euclidean_distance(&Point::from(b))
}

/// Drops interior points that are within `tolerance` of the last retained
/// point. The first and the last point are always kept.
pub fn simplify_ring(ring: &[Coord], tolerance: f64) -> Line {
    if ring.len() <= MIN_RING_POINTS || tolerance == 0.0 {
        return ring.to_vec();
    }

    let last = ring.len() - 1;
    let mut result = Vec::with_capacity(ring.len());
    result.push(ring[0]);
    let mut prev = ring[0];
    for &c in &ring[1..last] {
        if distance(c, prev) > tolerance {
            result.push(c);
            prev = c;
        }
    }
    result.push(ring[last]);
    result
}

fn simplify_rings(rings: &Rings, tolerance: f64) -> Rings {
    rings.iter().map(|r| simplify_ring(r, tolerance)).collect()
}

/// Simplifies the rings of polygons and multi-polygons. Other geometries
/// are returned as they are.
pub fn simplify_geometry(geometry: &Geometry, tolerance: f64) -> Geometry {
    match geometry {
        Geometry::Polygon(rings) => Geometry::Polygon(simplify_rings(rings, tolerance)),
        Geometry::MultiPolygon(polygons) => Geometry::MultiPolygon(
            polygons
                .iter()
                .map(|p| simplify_rings(p, tolerance))
                .collect(),
        ),
        g => g.clone(),
    }
}

/// Returns a simplified copy of the collection
pub fn simplify_collection(collection: &FeatureCollection, tolerance: f64) -> FeatureCollection {
    let features = collection
        .features
        .iter()
        .map(|f| Feature {
            geometry: f
                .geometry
                .as_ref()
                .map(|g| simplify_geometry(g, tolerance)),
            ..f.clone()
        })
        .collect();

    FeatureCollection {
        features,
        name: collection.name.clone(),
        feature_count: collection.feature_count,
        fields: collection.fields.clone(),
    }
}
