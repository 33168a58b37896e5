use geo::Rect;

use crate::geometry::{FeatureCollection, Geometry};

use super::extend_rect::{extend_bounds, ExtendRect};

/// Calculates the bounding box of a geometry
pub fn geometry_bounds(geometry: &Geometry) -> Option<Rect> {
    let mut bounds = None;
    geometry.for_each_coord(|c| extend_bounds(&mut bounds, *c));
    bounds
}

/// Calculates the bounding box of all features of a collection. Features
/// without geometry are skipped. Returns `None` if the collection has no
/// coordinates at all.
pub fn bounds(collection: &FeatureCollection) -> Option<Rect> {
    collection
        .features
        .iter()
        .filter_map(|f| f.geometry.as_ref().and_then(geometry_bounds))
        .reduce(|mut a, b| {
            a.extend_rect(&b);
            a
        })
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, OptionAssertion};
    use geo::{coord, Rect};
    use pretty_assertions::assert_eq;

    use crate::geometry::{Feature, FeatureCollection, Geometry, Properties};

    use super::{bounds, geometry_bounds};

    #[test]
    fn polygon_bounds() {
        let g = Geometry::Polygon(vec![vec![
            coord! { x: 90.0, y: 23.0 },
            coord! { x: 91.0, y: 22.5 },
            coord! { x: 90.5, y: 24.0 },
            coord! { x: 90.0, y: 23.0 },
        ]]);
        assert_eq!(
            geometry_bounds(&g),
            Some(Rect::new(coord! { x: 90.0, y: 22.5 }, coord! { x: 91.0, y: 24.0 }))
        );
    }

    #[test]
    fn collection_bounds() {
        let fc = FeatureCollection::new(
            "mixed",
            vec![
                Feature::new(Some(Geometry::Point(coord! { x: 1.0, y: 5.0 })), Properties::new()),
                Feature::new(None, Properties::new()),
                Feature::new(
                    Some(Geometry::LineString(vec![
                        coord! { x: -2.0, y: 0.0 },
                        coord! { x: 3.0, y: 1.0 },
                    ])),
                    Properties::new(),
                ),
            ],
        );
        assert_eq!(
            bounds(&fc),
            Some(Rect::new(coord! { x: -2.0, y: 0.0 }, coord! { x: 3.0, y: 5.0 }))
        );
    }

    #[test]
    fn no_coordinates() {
        let fc = FeatureCollection::new(
            "empty",
            vec![
                Feature::new(None, Properties::new()),
                Feature::new(Some(Geometry::MultiPoint(Vec::new())), Properties::new()),
            ],
        );
        assert_that!(bounds(&fc)).is_none();
    }
}
