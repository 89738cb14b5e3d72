// src/dag/mod.rs

//! Project graph engine.
//!
//! - [`graph`] holds one project's task DAG and per-task metadata.
//! - [`status`] is the task lifecycle state machine.
//! - [`metadata`] is the validated key/value container attached to a task.
//! - [`dispatcher`] computes the available set and handles interrupt/resume.
//! - [`validate`] turns persisted parts into a graph, checking invariants.

pub mod dispatcher;
pub mod graph;
pub mod metadata;
pub mod status;
pub mod validate;

pub use dispatcher::{DispatchStep, ResumedTask, available_tasks};
pub use graph::{Attach, Edge, GraphStore};
pub use metadata::{ReservedKey, TaskMetadata};
pub use status::TaskStatus;
pub use validate::Invariant;
