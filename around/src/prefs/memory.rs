//! In-memory preference store

use std::collections::BTreeMap;
use std::sync::RwLock;

use eyre::{Result, eyre};
use serde_json::Value;

use super::PreferenceStore;

/// Volatile store for tests and simulation
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.read().map_err(|_| eyre!("Preference lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.write().map_err(|_| eyre!("Preference lock poisoned"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| eyre!("Preference lock poisoned"))?;
        values.remove(key);
        Ok(())
    }
}
