//! Persistent key/value settings used by the model catalog.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::errors::SettingsError;

/// Key holding the currently selected model id.
pub const CURRENT_MODEL_KEY: &str = "currentAiModelId";
/// Key holding the JSON array of user-added models.
pub const CUSTOM_MODELS_KEY: &str = "customAiModels";

/// String key/value storage for user settings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// Process-local store, used in tests and when no settings path is configured.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted as a flat JSON object; the whole file is rewritten on
/// every `set`.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileSettingsStore {
    /// Opens the store, reading existing values when the file is present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| SettingsError::Io(format!("{}: {e}", path.display())))?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)
                    .map_err(|e| SettingsError::Format(format!("{}: {e}", path.display())))?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = values.len(), "opened settings file");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::Io(format!("{}: {e}", parent.display())))?;
        }
        let raw = serde_json::to_string_pretty(values)
            .map_err(|e| SettingsError::Format(e.to_string()))?;
        std::fs::write(&self.path, raw)
            .map_err(|e| SettingsError::Io(format!("{}: {e}", self.path.display())))
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = values.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist(&values) {
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }
}
