use std::io::Cursor;

use ::shapefile::{
    dbase::{self, FieldValue},
    Point, PointM, PointZ, PolygonRing, Shape, ShapeReader,
};
use geo::{coord, Coord};
use tracing::{info, warn};

use crate::{
    error::IngestError,
    geometry::{Feature, FeatureCollection, Geometry, Line, Properties, Rings, Value},
    reproject::{detect_projection, Detection, Reprojector},
};

use super::{FileGroup, FileKind, InputFile};

/// Point types of the shape file format. Z and M values are dropped.
trait ToCoord {
    fn to_coord(&self) -> Coord;
}

impl ToCoord for Point {
    fn to_coord(&self) -> Coord {
        coord! { x: self.x, y: self.y }
    }
}

impl ToCoord for PointM {
    fn to_coord(&self) -> Coord {
        coord! { x: self.x, y: self.y }
    }
}

impl ToCoord for PointZ {
    fn to_coord(&self) -> Coord {
        coord! { x: self.x, y: self.y }
    }
}

fn to_line<P: ToCoord>(points: &[P]) -> Line {
    points.iter().map(ToCoord::to_coord).collect()
}

/// One part: `LineString`, more parts: `MultiLineString`
fn polyline<P: ToCoord>(parts: &[Vec<P>]) -> Geometry {
    match parts {
        [single] => Geometry::LineString(to_line(single)),
        _ => Geometry::MultiLineString(parts.iter().map(|p| to_line(p)).collect()),
    }
}

/// Groups rings into polygons. Every outer ring starts a new polygon and
/// inner rings belong to the most recent outer ring. An inner ring found
/// before any outer ring is treated as an outer ring.
fn polygon<P: ToCoord>(rings: &[PolygonRing<P>]) -> Option<Geometry> {
    let mut polygons: Vec<Rings> = Vec::new();
    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => polygons.push(vec![to_line(points)]),
            PolygonRing::Inner(points) => match polygons.last_mut() {
                Some(p) => p.push(to_line(points)),
                None => polygons.push(vec![to_line(points)]),
            },
        }
    }

    match polygons.len() {
        0 => None,
        1 => polygons.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(polygons)),
    }
}

/// Converts a decoded shape to a geometry. `Ok(None)` means the record has
/// no geometry.
fn convert_shape(shape: Shape) -> Result<Option<Geometry>, String> {
    Ok(match shape {
        Shape::NullShape => None,
        Shape::Point(p) => Some(Geometry::Point(p.to_coord())),
        Shape::PointM(p) => Some(Geometry::Point(p.to_coord())),
        Shape::PointZ(p) => Some(Geometry::Point(p.to_coord())),
        Shape::Multipoint(m) => Some(Geometry::MultiPoint(to_line(m.points()))),
        Shape::MultipointM(m) => Some(Geometry::MultiPoint(to_line(m.points()))),
        Shape::MultipointZ(m) => Some(Geometry::MultiPoint(to_line(m.points()))),
        Shape::Polyline(l) => Some(polyline(l.parts())),
        Shape::PolylineM(l) => Some(polyline(l.parts())),
        Shape::PolylineZ(l) => Some(polyline(l.parts())),
        Shape::Polygon(p) => polygon(p.rings()),
        Shape::PolygonM(p) => polygon(p.rings()),
        Shape::PolygonZ(p) => polygon(p.rings()),
        Shape::Multipatch(_) => return Err("multipatch shapes are not supported".to_string()),
    })
}

/// Decodes the records of a `.shp` file in file order. Fails if the header
/// or the first record cannot be decoded. If a later record is malformed,
/// the records before it are returned.
fn decode_shapes(file: &InputFile) -> Result<Vec<Option<Geometry>>, IngestError> {
    let mut reader = ShapeReader::new(Cursor::new(file.bytes.as_slice()))
        .map_err(|e| IngestError::malformed(&file.name, format!("invalid header: {e}")))?;

    let mut result = Vec::new();
    for (i, shape) in reader.iter_shapes().enumerate() {
        match shape.map_err(|e| e.to_string()).and_then(convert_shape) {
            Ok(g) => result.push(g),
            Err(reason) if result.is_empty() => {
                return Err(IngestError::malformed(
                    &file.name,
                    format!("record {i}: {reason}"),
                ));
            }
            Err(reason) => {
                warn!(
                    "Record {i} of `{}' is malformed ({reason}). Keeping the first {} records.",
                    file.name,
                    result.len()
                );
                break;
            }
        }
    }

    Ok(result)
}

fn convert_field(value: &FieldValue) -> Value {
    match value {
        FieldValue::Character(s) => s.clone().map(Value::String).unwrap_or(Value::Null),
        FieldValue::Numeric(n) => (*n).map(Value::Number).unwrap_or(Value::Null),
        FieldValue::Float(f) => (*f)
            .map(|f| Value::Number(f as f64))
            .unwrap_or(Value::Null),
        FieldValue::Double(d) => Value::Number(*d),
        FieldValue::Integer(i) => Value::Number(*i as f64),
        FieldValue::Currency(c) => Value::Number(*c),
        FieldValue::Logical(b) => (*b).map(Value::Bool).unwrap_or(Value::Null),
        FieldValue::Date(d) => d
            .as_ref()
            .map(|d| Value::String(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())))
            .unwrap_or(Value::Null),
        FieldValue::Memo(m) => Value::String(m.clone()),
        _ => Value::Null,
    }
}

/// Decodes the rows of a `.dbf` file. Keeps the column order of the table.
/// An unreadable table yields no rows, a malformed row ends the table.
fn decode_attributes(file: &InputFile) -> Vec<Properties> {
    let mut reader = match dbase::Reader::new(Cursor::new(file.bytes.as_slice())) {
        Ok(r) => r,
        Err(e) => {
            warn!("Ignoring attribute table `{}': {e:?}", file.name);
            return Vec::new();
        }
    };

    let names = reader
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for (i, record) in reader.iter_records().enumerate() {
        match record {
            Ok(record) => rows.push(
                names
                    .iter()
                    .filter_map(|n| record.get(n).map(|v| (n.as_str(), convert_field(v))))
                    .collect(),
            ),
            Err(e) => {
                warn!(
                    "Row {i} of attribute table `{}' is malformed ({e:?}). \
                    Remaining features get no attributes.",
                    file.name
                );
                break;
            }
        }
    }

    rows
}

/// Removes the `.shp` extension from a file name
fn layer_name(file: &InputFile) -> &str {
    file.base_name()
}

/// Decodes a shape file group. Geometries are converted to WGS84 if the
/// `.prj` file names a known projection. Records and attribute rows are
/// matched by position.
pub fn read_shapefile(
    group: &FileGroup,
    reprojector: &mut Reprojector,
) -> Result<FeatureCollection, IngestError> {
    let shp = group
        .find(FileKind::Shape)
        .ok_or_else(|| IngestError::MissingRequiredFile("No .shp file found".to_string()))?;

    let detection = group
        .find(FileKind::Projection)
        .map(|prj| detect_projection(&prj.text()))
        .unwrap_or(Detection::Empty);
    if detection == Detection::Unrecognized {
        warn!(
            "Unrecognized projection in `{}'. Coordinates are used as they are.",
            group.base
        );
    }
    let crs = detection.crs();
    info!("Parsing shapefile: {}, projection detected: {crs:?}", shp.name);

    let geometries = decode_shapes(shp)?;
    let mut rows = group
        .find(FileKind::Attributes)
        .map(decode_attributes)
        .unwrap_or_default()
        .into_iter();

    let features = geometries
        .into_iter()
        .map(|g| {
            Feature::new(
                g.map(|g| reprojector.reproject(g, crs)),
                rows.next().unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>();

    if features.is_empty() {
        warn!("No features found in shapefile `{}'", shp.name);
    } else {
        info!("Extracted {} features from shapefile", features.len());
    }

    Ok(FeatureCollection::new(layer_name(shp), features))
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, EqualityAssertion, OptionAssertion, ResultAssertion, VecAssertion};
    use geo::coord;
    use pretty_assertions::assert_eq;

    use crate::{
        error::IngestError,
        geometry::{Geometry, Value},
        input::{
            group_files,
            test_support::{dbf_bytes, shp_bytes, TestShape},
            FileGroup, InputFile,
        },
        reproject::Reprojector,
    };

    use super::read_shapefile;

    const UTM_46_PRJ: &str = concat!(
        r#"PROJCS["WGS_1984_UTM_Zone_46N",GEOGCS["GCS_WGS_1984","#,
        r#"DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],"#,
        r#"PROJECTION["Transverse_Mercator"],PARAMETER["Central_Meridian",93.0]]"#
    );

    fn group(files: Vec<InputFile>) -> FileGroup {
        group_files(files).remove(0)
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
        // clockwise, i.e. an outer ring
        vec![
            (x, y),
            (x, y + size),
            (x + size, y + size),
            (x + size, y),
            (x, y),
        ]
    }

    fn roads() -> Vec<TestShape> {
        vec![
            TestShape::Polyline(vec![vec![(250000.0, 2500000.0), (251000.0, 2501000.0)]]),
            TestShape::Polyline(vec![
                vec![(260000.0, 2510000.0), (261000.0, 2511000.0)],
                vec![(262000.0, 2512000.0), (263000.0, 2513000.0)],
            ]),
        ]
    }

    fn roads_dbf() -> Vec<u8> {
        dbf_bytes(
            &[("NAME", b'C', 5), ("LANES", b'N', 3)],
            &[vec!["North", "  2"], vec!["South", "  4"]],
        )
    }

    #[test]
    fn points_without_attributes() {
        let g = group(vec![InputFile::new(
            "wells.shp",
            shp_bytes(
                1,
                &[TestShape::Point(1.0, 2.0), TestShape::Point(3.0, 4.0)],
            ),
        )]);
        let fc = read_shapefile(&g, &mut Reprojector::default()).unwrap();
        assert_eq!(fc.name, "wells");
        assert_eq!(fc.feature_count, 2);
        assert_that!(fc.fields).is_empty();
        assert_eq!(
            fc.features[1].geometry,
            Some(Geometry::Point(coord! { x: 3.0, y: 4.0 }))
        );
        assert!(fc.features.iter().all(|f| f.properties.is_empty()));
    }

    /// Attribute rows are matched with records by position
    #[test]
    fn attributes_by_position() {
        let g = group(vec![
            InputFile::new("roads.shp", shp_bytes(3, &roads())),
            InputFile::new("roads.dbf", roads_dbf()),
        ]);
        let fc = read_shapefile(&g, &mut Reprojector::default()).unwrap();

        assert_eq!(fc.fields, vec!["NAME".to_string(), "LANES".to_string()]);
        assert_that!(fc.features[0].properties.get("NAME"))
            .is_equal_to(Some(&Value::from("North")));
        assert_that!(fc.features[1].properties.get("LANES"))
            .is_equal_to(Some(&Value::Number(4.0)));

        assert!(matches!(fc.features[0].geometry, Some(Geometry::LineString(_))));
        assert!(matches!(
            fc.features[1].geometry,
            Some(Geometry::MultiLineString(ref l)) if l.len() == 2
        ));
    }

    /// A UTM zone 46 shape file is converted to WGS84
    #[test]
    fn reprojected_roads() {
        let g = group(vec![
            InputFile::new("roads.shp", shp_bytes(3, &roads())),
            InputFile::new("roads.dbf", roads_dbf()),
            InputFile::new("roads.prj", UTM_46_PRJ),
        ]);
        let raw = read_shapefile(
            &group(vec![InputFile::new("roads.shp", shp_bytes(3, &roads()))]),
            &mut Reprojector::default(),
        )
        .unwrap();
        let fc = read_shapefile(&g, &mut Reprojector::default()).unwrap();

        assert_that!(fc.features).has_length(2);
        for (f, r) in fc.features.iter().zip(raw.features.iter()) {
            let mut converted = Vec::new();
            f.geometry.as_ref().unwrap().for_each_coord(|c| converted.push(*c));
            let mut original = Vec::new();
            r.geometry.as_ref().unwrap().for_each_coord(|c| original.push(*c));

            assert_eq!(converted.len(), original.len());
            for (c, o) in converted.iter().zip(original.iter()) {
                assert_ne!(c, o);
                assert!(c.x >= 88.0 && c.x <= 93.0, "longitude out of range: {}", c.x);
                assert!(c.y >= 20.0 && c.y <= 27.0, "latitude out of range: {}", c.y);
            }
        }

        // attributes are untouched
        assert_that!(fc.features[0].properties.get("NAME"))
            .is_equal_to(Some(&Value::from("North")));
    }

    #[test]
    fn polygon_with_hole_and_multipolygon() {
        let mut hole = square(2.0, 2.0, 1.0);
        hole.reverse();
        let shapes = vec![
            TestShape::Polygon(vec![square(0.0, 0.0, 10.0), hole]),
            TestShape::Polygon(vec![square(0.0, 0.0, 1.0), square(5.0, 5.0, 1.0)]),
            TestShape::Null,
        ];
        let g = group(vec![InputFile::new("areas.shp", shp_bytes(5, &shapes))]);
        let fc = read_shapefile(&g, &mut Reprojector::default()).unwrap();

        assert_that!(fc.features).has_length(3);
        match &fc.features[0].geometry {
            Some(Geometry::Polygon(rings)) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0][0], coord! { x: 0.0, y: 0.0 });
                assert_eq!(rings[1][0], coord! { x: 2.0, y: 2.0 });
            }
            g => panic!("Test failed: unexpected geometry {g:?}"),
        }
        match &fc.features[1].geometry {
            Some(Geometry::MultiPolygon(polys)) => assert_eq!(polys.len(), 2),
            g => panic!("Test failed: unexpected geometry {g:?}"),
        }

        // null shapes are kept without geometry
        assert_that!(fc.features[2].geometry).is_none();
    }

    #[test]
    fn multipoint() {
        let g = group(vec![InputFile::new(
            "trees.shp",
            shp_bytes(8, &[TestShape::Multipoint(vec![(1.0, 1.0), (2.0, 2.0)])]),
        )]);
        let fc = read_shapefile(&g, &mut Reprojector::default()).unwrap();
        assert_eq!(
            fc.features[0].geometry,
            Some(Geometry::MultiPoint(vec![
                coord! { x: 1.0, y: 1.0 },
                coord! { x: 2.0, y: 2.0 }
            ]))
        );
    }

    #[test]
    fn malformed_header() {
        let g = group(vec![InputFile::new("broken.shp", b"definitely not a shape file".to_vec())]);
        let result = read_shapefile(&g, &mut Reprojector::default());
        assert_that!(result).is_err();
        assert!(matches!(
            result,
            Err(IngestError::MalformedGeometry { ref file, .. }) if file == "broken.shp"
        ));
    }

    /// A truncated file keeps the records decoded before the damage
    #[test]
    fn salvage_records_before_truncation() {
        let shapes = vec![
            TestShape::Point(1.0, 1.0),
            TestShape::Point(2.0, 2.0),
            TestShape::Point(3.0, 3.0),
        ];
        let mut bytes = shp_bytes(1, &shapes);
        // cut the last record in half
        bytes.truncate(bytes.len() - 10);

        let g = group(vec![InputFile::new("wells.shp", bytes)]);
        let fc = read_shapefile(&g, &mut Reprojector::default()).unwrap();
        assert_eq!(fc.feature_count, 2);
    }

    /// If not even the first record can be decoded the whole file fails
    #[test]
    fn first_record_malformed() {
        let mut bytes = shp_bytes(1, &[TestShape::Point(1.0, 1.0)]);
        bytes.truncate(bytes.len() - 10);

        let g = group(vec![InputFile::new("wells.shp", bytes)]);
        let result = read_shapefile(&g, &mut Reprojector::default());
        assert!(matches!(result, Err(IngestError::MalformedGeometry { .. })));
    }

    /// More records than attribute rows: the remaining features have no
    /// attributes
    #[test]
    fn fewer_rows_than_records() {
        let g = group(vec![
            InputFile::new(
                "wells.shp",
                shp_bytes(1, &[TestShape::Point(1.0, 1.0), TestShape::Point(2.0, 2.0)]),
            ),
            InputFile::new("wells.dbf", dbf_bytes(&[("ID", b'N', 2)], &[vec![" 7"]])),
        ]);
        let fc = read_shapefile(&g, &mut Reprojector::default()).unwrap();
        assert_that!(fc.features[0].properties.get("ID")).is_equal_to(Some(&Value::Number(7.0)));
        assert!(fc.features[1].properties.is_empty());
    }

    /// An unreadable attribute table is ignored
    #[test]
    fn corrupt_attribute_table() {
        let g = group(vec![
            InputFile::new("wells.shp", shp_bytes(1, &[TestShape::Point(1.0, 1.0)])),
            InputFile::new("wells.dbf", vec![0x03, 0x7c]),
        ]);
        let fc = read_shapefile(&g, &mut Reprojector::default());
        assert_that!(fc).is_ok();
        assert!(fc.unwrap().features[0].properties.is_empty());
    }

    #[test]
    fn empty_shape_file() {
        let g = group(vec![InputFile::new("empty.shp", shp_bytes(5, &[]))]);
        let fc = read_shapefile(&g, &mut Reprojector::default()).unwrap();
        assert_eq!(fc.feature_count, 0);
        assert_that!(fc.fields).is_empty();
    }
}
