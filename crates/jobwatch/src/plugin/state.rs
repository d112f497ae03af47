//! Values from the previous cycle, used to turn cumulative counters into rates.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

use super::graph::MetricKeyPrefix;

/// Overrides the directory holding state files.
pub const WORKDIR_ENV: &str = "MACKEREL_PLUGIN_WORKDIR";

/// State file for `prefix` under `dir`.
pub fn state_path_in(dir: &Path, prefix: &MetricKeyPrefix) -> PathBuf {
    dir.join(format!("mackerel-plugin-{}", prefix))
}

/// State file under the plugin work directory, or the system temp directory.
pub fn default_state_path(prefix: &MetricKeyPrefix) -> PathBuf {
    let dir = std::env::var_os(WORKDIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    state_path_in(&dir, prefix)
}

/// Raw metric values and when they were taken.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastValues {
    /// Unix seconds.
    pub timestamp: i64,
    pub values: BTreeMap<String, u64>,
}

impl LastValues {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Load state, treating a missing or unreadable file as no history.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable state file");
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt state file");
                Self::default()
            }
        }
    }

    /// Write state atomically (uniquely named temp file in the same directory + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create state directory: {}", parent.display())
                })?;
                parent
            }
            None => Path::new("."),
        };
        let json = serde_json::to_vec(self).context("Failed to serialize state")?;
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp state file in {}", dir.display()))?;
        tmp.write_all(&json)
            .with_context(|| format!("Failed to write state file: {}", tmp.path().display()))?;
        tmp.persist(path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }
}
