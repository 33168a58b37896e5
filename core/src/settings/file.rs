use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use super::SettingsStore;

/// An implementation of the [`SettingsStore`] trait that keeps every value
/// in a JSON file named after its key inside a directory
pub struct FileSettingsStore {
    directory: PathBuf,
}

impl FileSettingsStore {
    /// Creates a store in the given directory. The directory is created on
    /// the first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.json"))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Unable to read `{}'", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.directory).with_context(|| {
            format!("Unable to create directory `{}'", self.directory.display())
        })?;
        let path = self.path(key);
        fs::write(&path, value).with_context(|| format!("Unable to write `{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, OptionAssertion};
    use pretty_assertions::assert_eq;
    use tempdir::TempDir;

    use crate::settings::{
        load_settings, save_settings, Settings, SettingsStore, STORAGE_KEY,
    };

    use super::FileSettingsStore;

    #[test]
    fn missing_file() {
        let dir = TempDir::new("gisview_settings").unwrap();
        let store = FileSettingsStore::new(dir.path());
        assert_that!(store.get(STORAGE_KEY).unwrap()).is_none();
        assert_eq!(load_settings(&store), Settings::default());
    }

    #[test]
    fn persist_across_instances() {
        let dir = TempDir::new("gisview_settings").unwrap();
        let nested = dir.path().join("config");

        let s = Settings {
            initial_lng: 91.0,
            max_features_without_simplify: 50,
            ..Default::default()
        };
        save_settings(&mut FileSettingsStore::new(&nested), &s).unwrap();

        let store = FileSettingsStore::new(&nested);
        assert!(store.path(STORAGE_KEY).ends_with("gis-viewer-settings.json"));
        assert_eq!(load_settings(&store), s);
    }

    #[test]
    fn corrupt_file() {
        let dir = TempDir::new("gisview_settings").unwrap();
        let store = FileSettingsStore::new(dir.path());
        std::fs::write(store.path(STORAGE_KEY), "[1, 2").unwrap();
        assert_eq!(load_settings(&store), Settings::default());
    }
}
