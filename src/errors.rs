// src/errors.rs

//! Crate-wide error type.
//!
//! Every engine operation returns either a value or one of these kinds; none
//! of them terminate the process. The transport layer decides how to surface
//! them.

use std::path::PathBuf;

use thiserror::Error;

use crate::dag::status::TaskStatus;
use crate::dag::validate::Invariant;
use crate::types::{ProjectId, TaskId};

#[derive(Error, Debug)]
pub enum TaskgraphError {
    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    #[error("Task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("Cycle detected: {dependent} is already a (transitive) dependency of {dependency}")]
    CycleDetected { dependent: TaskId, dependency: TaskId },

    #[error("Illegal status transition for task {task}: {from} -> {to}")]
    IllegalTransition {
        task: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Metadata key '{0}' is reserved")]
    ReservedKey(String),

    #[error("Task {task} has unfinished dependencies: {unfinished:?}")]
    DependencyNotSatisfied { task: TaskId, unfinished: Vec<TaskId> },

    #[error("Project {project} is corrupt ({invariant}): {detail}")]
    CorruptProject {
        project: ProjectId,
        invariant: Invariant,
        detail: String,
    },

    #[error("Project {0} changed on disk since it was read; retry against the fresh state")]
    StaleProject(ProjectId),

    #[error("Project catalog {0:?} changed on disk since it was read; retry against the fresh state")]
    StaleCatalog(PathBuf),

    #[error("Unknown project: {0}")]
    UnknownProject(ProjectId),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskgraphError {
    /// Whether the caller may simply retry the operation against fresh state.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            TaskgraphError::StaleProject(_) | TaskgraphError::StaleCatalog(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TaskgraphError>;
