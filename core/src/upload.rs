use tracing::{info, warn};

use crate::{
    error::IngestError,
    geometry::FeatureCollection,
    input::{group_files, ingest_group, InputFile},
    registry::{LayerId, LayerRegistry},
    reproject::Reprojector,
};

/// The message reported when an upload contains no usable file
pub const FALLBACK_ERROR: &str = "Failed to parse shapefile";

/// The accumulated outcome of an upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSummary {
    /// IDs of the layers added to the registry, in group order
    pub added: Vec<LayerId>,

    /// One message per failed group, formatted as `{base}: {error}`
    pub errors: Vec<String>,

    /// Base names of the groups skipped because the upload was cancelled
    pub cancelled: Vec<String>,
}

impl UploadSummary {
    pub fn success_count(&self) -> usize {
        self.added.len()
    }

    pub fn is_success(&self) -> bool {
        !self.added.is_empty()
    }

    /// Records the result of a single group. Successful groups are added to
    /// the registry.
    pub fn record(
        &mut self,
        base: &str,
        result: Result<FeatureCollection, IngestError>,
        registry: &mut LayerRegistry,
    ) {
        match result {
            Ok(collection) => {
                let name = collection.name.clone();
                self.added.push(registry.add(collection, name));
            }
            Err(e) => {
                warn!("Unable to load `{base}': {e}");
                self.errors.push(format!("{base}: {e}"));
            }
        }
    }

    /// The status shown to the user: the number of loaded layers or the
    /// first error
    pub fn message(&self) -> String {
        if self.is_success() {
            format!("Successfully loaded {} layer(s)!", self.success_count())
        } else {
            self.errors
                .first()
                .cloned()
                .unwrap_or_else(|| FALLBACK_ERROR.to_string())
        }
    }
}

/// Groups the uploaded files, decodes every group in order and adds the
/// resulting layers to the registry. A failing group does not affect the
/// others.
pub fn process_upload(
    files: Vec<InputFile>,
    registry: &mut LayerRegistry,
    reprojector: &mut Reprojector,
) -> UploadSummary {
    let groups = group_files(files);
    info!("Processing {} file group(s)", groups.len());

    let mut summary = UploadSummary::default();
    for group in &groups {
        summary.record(&group.base, ingest_group(group, reprojector), registry);
    }
    summary
}
