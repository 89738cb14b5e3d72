// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [storage]
/// root_path = "data"
///
/// [sync]
/// stale_retries = 3
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub storage: StorageSection,

    #[serde(default)]
    pub sync: SyncSection,
}

/// `[storage]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// Directory holding `projects.json` and `projects/<id>.json`.
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,
}

fn default_root_path() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
        }
    }
}

/// `[sync]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    /// How many times a mutation is attempted when it keeps losing races
    /// with other writers before `StaleProject` is surfaced.
    #[serde(default = "default_stale_retries")]
    pub stale_retries: usize,
}

fn default_stale_retries() -> usize {
    3
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            stale_retries: default_stale_retries(),
        }
    }
}
