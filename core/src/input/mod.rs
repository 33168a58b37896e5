use std::borrow::Cow;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::{error::IngestError, geometry::FeatureCollection, reproject::Reprojector};

pub mod geo_json;
pub mod shp;

#[cfg(test)]
pub(crate) mod test_support;

/// A named byte buffer provided by the user
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Returns the file name up to (not including) the last dot. ESRI
    /// metadata files (`roads.shp.xml`) get the base name of their shape
    /// file.
    pub fn base_name(&self) -> &str {
        let base = match self.name.rfind('.') {
            Some(i) => &self.name[..i],
            None => &self.name,
        };
        if self.extension().as_deref() == Some("xml") {
            if let Some(stem) = strip_suffix_ignore_case(base, ".shp") {
                return stem;
            }
        }
        base
    }

    /// Returns the lower-case extension without the dot
    pub fn extension(&self) -> Option<String> {
        self.name
            .rfind('.')
            .map(|i| self.name[i + 1..].to_ascii_lowercase())
    }

    pub fn kind(&self) -> FileKind {
        self.extension()
            .map(|e| FileKind::from_extension(&e))
            .unwrap_or(FileKind::Unrecognized)
    }

    /// Returns the contents as text. Invalid UTF-8 sequences are replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let i = s.len().checked_sub(suffix.len())?;
    match s.get(i..) {
        Some(tail) if tail.eq_ignore_ascii_case(suffix) => s.get(..i),
        _ => None,
    }
}

/// The role a file plays in a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.shp`
    Shape,

    /// `.dbf`
    Attributes,

    /// `.shx`
    Index,

    /// `.prj`
    Projection,

    /// `.cpg`, `.sbn`, `.sbx`, `.xml`. Accepted but not decoded.
    Companion,

    /// `.geojson` or `.json`
    GeoJson,

    Unrecognized,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "shp" => FileKind::Shape,
            "dbf" => FileKind::Attributes,
            "shx" => FileKind::Index,
            "prj" => FileKind::Projection,
            "cpg" | "sbn" | "sbx" | "xml" => FileKind::Companion,
            "geojson" | "json" => FileKind::GeoJson,
            _ => FileKind::Unrecognized,
        }
    }
}

/// The decoder a group is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFormat {
    Shapefile,
    GeoJson,
}

/// Files sharing a base name (compared case-insensitively)
#[derive(Debug, Clone, PartialEq)]
pub struct FileGroup {
    /// The base name as spelled by the first file of the group
    pub base: String,
    pub files: Vec<InputFile>,
}

impl FileGroup {
    /// Returns the first file of the given kind
    pub fn find(&self, kind: FileKind) -> Option<&InputFile> {
        self.files.iter().find(|f| f.kind() == kind)
    }

    /// Decides which decoder handles this group. A `.shp` file always wins
    /// over GeoJSON files.
    pub fn format(&self) -> Option<GroupFormat> {
        if self.find(FileKind::Shape).is_some() {
            Some(GroupFormat::Shapefile)
        } else if self.find(FileKind::GeoJson).is_some() {
            Some(GroupFormat::GeoJson)
        } else {
            None
        }
    }
}

/// Groups files by case-insensitive base name. Groups are returned in the
/// order their first file appears. Files with unknown extensions and groups
/// consisting only of companion files are dropped.
pub fn group_files(files: Vec<InputFile>) -> Vec<FileGroup> {
    let mut groups: Vec<FileGroup> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for file in files {
        if file.kind() == FileKind::Unrecognized {
            warn!("Ignoring file with unsupported extension: `{}'", file.name);
            continue;
        }

        let key = file.base_name().to_lowercase();
        match index.get(&key) {
            Some(&i) => groups[i].files.push(file),
            None => {
                index.insert(key, groups.len());
                groups.push(FileGroup {
                    base: file.base_name().to_string(),
                    files: vec![file],
                });
            }
        }
    }

    groups.retain(|g| {
        let companions_only = g.files.iter().all(|f| f.kind() == FileKind::Companion);
        if companions_only {
            debug!("Ignoring group `{}' without shape or GeoJSON file", g.base);
        }
        !companions_only
    });
    groups
}

/// Decodes a single file group into a feature collection
pub fn ingest_group(
    group: &FileGroup,
    reprojector: &mut Reprojector,
) -> Result<FeatureCollection, IngestError> {
    info!("Processing group: {}", group.base);
    match group.format() {
        Some(GroupFormat::Shapefile) => {
            if group.find(FileKind::GeoJson).is_some() {
                warn!(
                    "Group `{}' contains both a shape file and GeoJSON. Ignoring GeoJSON.",
                    group.base
                );
            }
            shp::read_shapefile(group, reprojector)
        }
        Some(GroupFormat::GeoJson) => self::geo_json::read_geo_json(group),
        None => Err(IngestError::MissingRequiredFile(
            "No .shp file found".to_string(),
        )),
    }
}
