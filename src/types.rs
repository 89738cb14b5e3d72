// src/types.rs

//! Identifier types shared across the engine.

use std::fmt;

/// Canonical task identifier (a UUID string, stable for the life of the task).
pub type TaskId = String;

/// Canonical project identifier (a UUID string, also used as the file stem of
/// the project document).
pub type ProjectId = String;

/// Allocate a fresh, collision-resistant identifier for a task or project.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Content-derived value identifying one version of a persisted document.
///
/// Two fingerprints are equal iff the underlying bytes were equal, so a
/// changed fingerprint means someone rewrote the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is plenty for log lines.
        let short = self.0.get(..12).unwrap_or(&self.0);
        f.write_str(short)
    }
}
