// src/config/validate.rs

use crate::config::model::ConfigFile;
use crate::errors::{Result, TaskgraphError};

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - `[storage].root_path` is not empty
/// - `[sync].stale_retries >= 1`
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    if cfg.storage.root_path.as_os_str().is_empty() {
        return Err(TaskgraphError::ConfigError(
            "[storage].root_path must not be empty".to_string(),
        ));
    }

    if cfg.sync.stale_retries == 0 {
        return Err(TaskgraphError::ConfigError(
            "[sync].stale_retries must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}
