// src/dag/dispatcher.rs

//! Decides what can be worked on right now.
//!
//! The dispatcher is stateless: every call reads or mutates the
//! [`GraphStore`] it is handed and returns. External event sources (delivery
//! notifications, script completion hooks, reminders) call
//! [`resume_on_event`] directly when their own listener fires.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::dag::graph::GraphStore;
use crate::dag::metadata::TaskMetadata;
use crate::dag::status::TaskStatus;
use crate::errors::{Result, TaskgraphError};
use crate::types::TaskId;

/// Result of completing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchStep {
    /// The full available set after the step.
    pub available: Vec<TaskId>,
    /// Tasks that became available because of this step.
    pub newly_available: Vec<TaskId>,
}

/// A task handed back to the caller after resuming, so the user can be
/// routed straight into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumedTask {
    pub id: TaskId,
    pub metadata: TaskMetadata,
}

/// Tasks that are `Pending` and whose dependencies are all `Done`, in node
/// insertion order.
pub fn available_tasks(graph: &GraphStore) -> Vec<TaskId> {
    graph
        .iter_nodes()
        .filter(|(_, node)| node.meta.status() == TaskStatus::Pending)
        .filter(|(id, _)| unfinished_dependencies(graph, id).is_empty())
        .map(|(id, _)| id.clone())
        .collect()
}

/// Whether a single task is available.
pub fn is_available(graph: &GraphStore, id: &str) -> Result<bool> {
    Ok(graph.status(id)? == TaskStatus::Pending && unfinished_dependencies(graph, id).is_empty())
}

/// Mark an `Active` task `Done` and report what that unlocked.
pub fn on_task_done(graph: &mut GraphStore, id: &str) -> Result<DispatchStep> {
    let before: HashSet<TaskId> = available_tasks(graph).into_iter().collect();

    graph.set_status(id, TaskStatus::Done)?;

    let available = available_tasks(graph);
    let newly_available: Vec<TaskId> = available
        .iter()
        .filter(|t| !before.contains(*t))
        .cloned()
        .collect();

    info!(
        task = %id,
        unlocked = newly_available.len(),
        "task done; recomputed available set"
    );

    Ok(DispatchStep {
        available,
        newly_available,
    })
}

/// Interrupt an `Active` task; it leaves the available set until resumed.
pub fn interrupt(graph: &mut GraphStore, id: &str) -> Result<()> {
    graph.set_status(id, TaskStatus::Snoozed)?;
    debug!(task = %id, "task interrupted");
    Ok(())
}

/// External-event callback: put a `Snoozed` task straight back to `Active`.
///
/// Refuses to activate a task that gained unfinished dependencies while it
/// was snoozed.
pub fn resume_on_event(graph: &mut GraphStore, id: &str) -> Result<ResumedTask> {
    let current = graph.status(id)?;
    if current != TaskStatus::Snoozed {
        return Err(TaskgraphError::IllegalTransition {
            task: id.to_string(),
            from: current,
            to: TaskStatus::Active,
        });
    }

    let unfinished = unfinished_dependencies(graph, id);
    if !unfinished.is_empty() {
        return Err(TaskgraphError::DependencyNotSatisfied {
            task: id.to_string(),
            unfinished,
        });
    }

    graph.set_status(id, TaskStatus::Active)?;
    info!(task = %id, "resumed snoozed task on external event");

    Ok(ResumedTask {
        id: id.to_string(),
        metadata: graph.metadata(id)?,
    })
}

/// Direct dependencies of `id` that are not `Done`.
fn unfinished_dependencies(graph: &GraphStore, id: &str) -> Vec<TaskId> {
    graph
        .dependencies(id)
        .iter()
        .filter(|dep| {
            graph
                .status(dep)
                .map(|s| s != TaskStatus::Done)
                .unwrap_or(true)
        })
        .cloned()
        .collect()
}
