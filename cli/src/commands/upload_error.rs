use gisview_core::upload::UploadSummary;
use thiserror::Error;
use yansi::{Condition, Paint};

/// An error that happened during an upload
#[derive(Error, Debug)]
pub enum UploadError {
    /// Not a single layer could be loaded
    #[error("{0}")]
    NothingLoaded(String),
}

fn colored() -> Condition {
    Condition::from(|| Condition::stderr_is_tty() && Condition::clicolor() && Condition::no_color())
}

/// Highlights a message for the terminal
pub fn highlight_error(msg: &str) -> String {
    msg.red().bold().whenever(colored()).to_string()
}

/// Renders every failed group of an upload as an indented list
pub fn format_failures(summary: &UploadSummary) -> String {
    let mut result = String::new();
    for e in &summary.errors {
        result.push_str(&format!("  {} {}\n", "✗".red().whenever(colored()), e));
    }
    for c in &summary.cancelled {
        result.push_str(&format!(
            "  {} {c}: cancelled\n",
            "-".yellow().whenever(colored())
        ));
    }
    result
}

impl From<&UploadSummary> for UploadError {
    fn from(summary: &UploadSummary) -> Self {
        UploadError::NothingLoaded(highlight_error(&summary.message()))
    }
}

#[cfg(test)]
mod tests {
    use gisview_core::upload::UploadSummary;
    use pretty_assertions::assert_eq;

    use super::{format_failures, UploadError};

    #[test]
    fn first_error_is_reported() {
        yansi::disable();
        let summary = UploadSummary {
            errors: vec![
                "parcels: No .shp file found".to_string(),
                "roads: Invalid GeoJSON: missing features array".to_string(),
            ],
            ..Default::default()
        };
        assert_eq!(
            UploadError::from(&summary).to_string(),
            "parcels: No .shp file found"
        );
        assert_eq!(
            format_failures(&summary),
            "  ✗ parcels: No .shp file found\n  ✗ roads: Invalid GeoJSON: missing features array\n"
        );
    }
}
