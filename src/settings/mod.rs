//! Key-value settings the core reads and writes.

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub(crate) const CURRENCY: &str = "currency";
pub(crate) const LAST_SYNC_DATE: &str = "lastSyncDate";
pub(crate) const SYNC_TOKEN: &str = "syncToken";

/// Settings every command understands, in display order.
pub(crate) fn known() -> &'static [&'static str] {
    &[CURRENCY, LAST_SYNC_DATE, SYNC_TOKEN]
}

pub(crate) trait Settings: Send + Sync {
    /// The stored value, or an empty string when unset.
    fn get(&self, name: &str) -> String;
    fn set(&self, name: &str, value: &str) -> Result<()>;
}

/// Settings kept as a JSON object in a single file.
pub(crate) struct FileSettings {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettings {
    /// Load settings from `path`; a missing file means no settings yet.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let values = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("Malformed settings file: {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read settings: {}", path.display()))
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        })
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }
        let text = serde_json::to_string_pretty(values)?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, text)
            .with_context(|| format!("Failed to write settings: {}", staging.display()))?;
        std::fs::rename(&staging, &self.path)
            .with_context(|| format!("Failed to replace settings: {}", self.path.display()))?;
        Ok(())
    }
}

impl Settings for FileSettings {
    fn get(&self, name: &str) -> String {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(name).cloned())
            .unwrap_or_default()
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("Settings lock poisoned"))?;
        if value.is_empty() {
            values.remove(name);
        } else {
            values.insert(name.to_string(), value.to_string());
        }
        self.persist(&values)
    }
}

/// Settings that live only as long as the process.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemorySettings {
    values: Mutex<BTreeMap<String, String>>,
}

#[cfg(test)]
impl Settings for MemorySettings {
    fn get(&self, name: &str) -> String {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(name).cloned())
            .unwrap_or_default()
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("Settings lock poisoned"))?;
        values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests;
