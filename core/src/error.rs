use thiserror::Error;

/// An error that aborts the ingestion of a single file group
#[derive(Error, Debug, PartialEq)]
pub enum IngestError {
    /// The group does not contain a file the decoder needs
    #[error("{0}")]
    MissingRequiredFile(String),

    /// A shape file's header or records could not be decoded
    #[error("Malformed geometry in `{file}': {reason}")]
    MalformedGeometry { file: String, reason: String },

    /// A GeoJSON document could not be parsed or is not a feature collection
    #[error("Invalid GeoJSON: {0}")]
    InvalidFormat(String),
}

impl IngestError {
    pub(crate) fn malformed(file: &str, reason: impl ToString) -> Self {
        IngestError::MalformedGeometry {
            file: file.to_string(),
            reason: reason.to_string(),
        }
    }
}
