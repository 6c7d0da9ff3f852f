//! JSON-file preference store

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use eyre::{Context, Result, eyre};
use serde_json::Value;
use tracing::{debug, info};

use super::PreferenceStore;

/// Preferences persisted as one JSON object, rewritten on every change
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
}

impl FilePreferenceStore {
    /// Open the store, creating the parent directory if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "FilePreferenceStore::open: called");

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create preferences directory")?;
        }

        let values = if path.exists() {
            let content = fs::read_to_string(&path).context("Failed to read preferences file")?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).context("Failed to parse preferences file")?
            }
        } else {
            BTreeMap::new()
        };

        info!(path = %path.display(), keys = values.len(), "Opened preference store");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        let content = serde_json::to_string_pretty(values)?;
        // Write then rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).context("Failed to write preferences file")?;
        fs::rename(&tmp, &self.path).context("Failed to replace preferences file")?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.read().map_err(|_| eyre!("Preference lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        debug!(%key, "FilePreferenceStore::set: called");
        let mut values = self.values.write().map_err(|_| eyre!("Preference lock poisoned"))?;
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        debug!(%key, "FilePreferenceStore::remove: called");
        let mut values = self.values.write().map_err(|_| eyre!("Preference lock poisoned"))?;
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("preferences.json");

        {
            let store = FilePreferenceStore::open(&path).unwrap();
            store.set("locationTracking", json!(true)).unwrap();
            store
                .set("homeCoordinate", json!({"latitude": 1.5, "longitude": 2.5}))
                .unwrap();
        }

        let store = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(store.get("locationTracking").unwrap(), Some(json!(true)));
        assert_eq!(
            store.get("homeCoordinate").unwrap(),
            Some(json!({"latitude": 1.5, "longitude": 2.5}))
        );
    }

    #[test]
    fn test_remove_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.json");

        let store = FilePreferenceStore::open(&path).unwrap();
        store.set("homeCoordinate", json!({"latitude": 0.0, "longitude": 0.0})).unwrap();
        store.remove("homeCoordinate").unwrap();

        let reopened = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get("homeCoordinate").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.json");
        fs::write(&path, "{not json").unwrap();

        assert!(FilePreferenceStore::open(&path).is_err());
    }

    #[test]
    fn test_empty_file_is_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.json");
        fs::write(&path, "").unwrap();

        let store = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(store.get("locationTracking").unwrap(), None);
    }
}
