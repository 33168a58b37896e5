//! Builders for shape file and dBASE contents used in tests

/// A record of a test shape file
pub enum TestShape {
    Null,
    Point(f64, f64),
    Multipoint(Vec<(f64, f64)>),
    Polyline(Vec<Vec<(f64, f64)>>),
    Polygon(Vec<Vec<(f64, f64)>>),
}

fn bbox(points: &[(f64, f64)]) -> [f64; 4] {
    points.iter().fold(
        [f64::MAX, f64::MAX, f64::MIN, f64::MIN],
        |[minx, miny, maxx, maxy], &(x, y)| [minx.min(x), miny.min(y), maxx.max(x), maxy.max(y)],
    )
}

fn push_bbox(out: &mut Vec<u8>, points: &[(f64, f64)]) {
    let b = if points.is_empty() {
        [0.0; 4]
    } else {
        bbox(points)
    };
    for v in b {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn push_points(out: &mut Vec<u8>, points: &[(f64, f64)]) {
    for (x, y) in points {
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
    }
}

fn parts_content(shape_type: i32, parts: &[Vec<(f64, f64)>]) -> Vec<u8> {
    let all = parts.iter().flatten().copied().collect::<Vec<_>>();
    let mut c = Vec::new();
    c.extend_from_slice(&shape_type.to_le_bytes());
    push_bbox(&mut c, &all);
    c.extend_from_slice(&(parts.len() as i32).to_le_bytes());
    c.extend_from_slice(&(all.len() as i32).to_le_bytes());
    let mut start = 0i32;
    for p in parts {
        c.extend_from_slice(&start.to_le_bytes());
        start += p.len() as i32;
    }
    push_points(&mut c, &all);
    c
}

impl TestShape {
    fn content(&self) -> Vec<u8> {
        match self {
            TestShape::Null => 0i32.to_le_bytes().to_vec(),
            TestShape::Point(x, y) => {
                let mut c = 1i32.to_le_bytes().to_vec();
                push_points(&mut c, &[(*x, *y)]);
                c
            }
            TestShape::Multipoint(points) => {
                let mut c = 8i32.to_le_bytes().to_vec();
                push_bbox(&mut c, points);
                c.extend_from_slice(&(points.len() as i32).to_le_bytes());
                push_points(&mut c, points);
                c
            }
            TestShape::Polyline(parts) => parts_content(3, parts),
            TestShape::Polygon(parts) => parts_content(5, parts),
        }
    }

    fn points(&self) -> Vec<(f64, f64)> {
        match self {
            TestShape::Null => Vec::new(),
            TestShape::Point(x, y) => vec![(*x, *y)],
            TestShape::Multipoint(points) => points.clone(),
            TestShape::Polyline(parts) | TestShape::Polygon(parts) => {
                parts.iter().flatten().copied().collect()
            }
        }
    }
}

/// Encodes a complete `.shp` file with the given shape type and records
pub fn shp_bytes(shape_type: i32, shapes: &[TestShape]) -> Vec<u8> {
    let mut records = Vec::new();
    for (i, s) in shapes.iter().enumerate() {
        let content = s.content();
        records.extend_from_slice(&(i as i32 + 1).to_be_bytes());
        records.extend_from_slice(&(content.len() as i32 / 2).to_be_bytes());
        records.extend_from_slice(&content);
    }

    let all = shapes.iter().flat_map(TestShape::points).collect::<Vec<_>>();

    let mut out = Vec::with_capacity(100 + records.len());
    out.extend_from_slice(&9994i32.to_be_bytes());
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(&((100 + records.len()) as i32 / 2).to_be_bytes());
    out.extend_from_slice(&1000i32.to_le_bytes());
    out.extend_from_slice(&shape_type.to_le_bytes());
    push_bbox(&mut out, &all);
    // z and m ranges
    out.extend_from_slice(&[0u8; 32]);
    out.extend_from_slice(&records);
    out
}

/// Encodes a `.dbf` file. Fields are given as name, type and length.
/// Values are padded or cut to the field length.
pub fn dbf_bytes(fields: &[(&str, u8, u8)], rows: &[Vec<&str>]) -> Vec<u8> {
    let record_size = 1 + fields.iter().map(|f| f.2 as u16).sum::<u16>();
    let header_size = 32 + 32 * fields.len() as u16 + 1;

    let mut out = vec![0x03, 124, 1, 1];
    out.extend_from_slice(&(rows.len() as u32).to_le_bytes());
    out.extend_from_slice(&header_size.to_le_bytes());
    out.extend_from_slice(&record_size.to_le_bytes());
    out.extend_from_slice(&[0u8; 20]);

    for (name, ty, len) in fields {
        let mut n = [0u8; 11];
        for (d, s) in n.iter_mut().zip(name.bytes().take(10)) {
            *d = s;
        }
        out.extend_from_slice(&n);
        out.push(*ty);
        out.extend_from_slice(&[0u8; 4]);
        out.push(*len);
        out.push(0);
        out.extend_from_slice(&[0u8; 14]);
    }
    out.push(0x0d);

    for row in rows {
        out.push(b' ');
        for ((_, _, len), value) in fields.iter().zip(row.iter()) {
            let mut v = value.bytes().take(*len as usize).collect::<Vec<_>>();
            v.resize(*len as usize, b' ');
            out.extend_from_slice(&v);
        }
    }
    out.push(0x1a);
    out
}
