// src/dag/metadata.rs

//! Per-task metadata.
//!
//! Persisted as a flat string-to-string map. Two keys are reserved and always
//! present: `Name` and `Status`. Everything else is opaque payload that the
//! engine stores and returns untouched.

use std::collections::BTreeMap;
use std::fmt;

use crate::dag::status::TaskStatus;
use crate::errors::{Result, TaskgraphError};

pub const NAME_KEY: &str = "Name";
pub const STATUS_KEY: &str = "Status";

/// Ordinary key used for the free-text detail given at insertion time.
pub const DETAIL_KEY: &str = "Detail";

/// Keys that cannot be written through the generic metadata path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedKey {
    Name,
    Status,
}

impl ReservedKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservedKey::Name => NAME_KEY,
            ReservedKey::Status => STATUS_KEY,
        }
    }

    /// Exact, case-sensitive match against the reserved names.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            NAME_KEY => Some(ReservedKey::Name),
            STATUS_KEY => Some(ReservedKey::Status),
            _ => None,
        }
    }
}

impl fmt::Display for ReservedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated metadata of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMetadata {
    name: String,
    status: TaskStatus,
    extra: BTreeMap<String, String>,
}

impl TaskMetadata {
    /// Fresh metadata for a newly inserted task (status `Pending`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TaskStatus::Pending,
            extra: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Look up any key, reserved ones included.
    pub fn get(&self, key: &str) -> Option<&str> {
        match ReservedKey::from_key(key) {
            Some(ReservedKey::Name) => Some(&self.name),
            Some(ReservedKey::Status) => Some(self.status.as_str()),
            None => self.extra.get(key).map(String::as_str),
        }
    }

    /// Non-reserved entries only.
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// Set a non-reserved key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        reject_reserved(key)?;
        self.extra.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Remove a non-reserved key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Result<Option<String>> {
        reject_reserved(key)?;
        Ok(self.extra.remove(key))
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Status changes go through `dag::status::transition` first.
    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    /// Flatten back into the persisted string map.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = self.extra.clone();
        map.insert(NAME_KEY.to_string(), self.name.clone());
        map.insert(STATUS_KEY.to_string(), self.status.as_str().to_string());
        map
    }

    /// Rebuild from a persisted map, requiring both reserved keys and a
    /// recognised status. The error string describes what is missing.
    pub fn from_map(mut map: BTreeMap<String, String>) -> std::result::Result<Self, String> {
        let name = map
            .remove(NAME_KEY)
            .ok_or_else(|| format!("missing reserved key '{NAME_KEY}'"))?;
        let raw_status = map
            .remove(STATUS_KEY)
            .ok_or_else(|| format!("missing reserved key '{STATUS_KEY}'"))?;
        let status = raw_status.parse::<TaskStatus>()?;

        Ok(Self {
            name,
            status,
            extra: map,
        })
    }
}

fn reject_reserved(key: &str) -> Result<()> {
    match ReservedKey::from_key(key) {
        Some(reserved) => Err(TaskgraphError::ReservedKey(reserved.to_string())),
        None => Ok(()),
    }
}
