// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dag::metadata::{DETAIL_KEY, TaskMetadata};
use crate::dag::status::{self, TaskStatus};
use crate::errors::{Result, TaskgraphError};
use crate::types::{TaskId, new_id};

/// A dependency edge: `target` cannot become available until `source` is
/// `Done`. Edges have no identity beyond the pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// The dependency.
    pub source: TaskId,
    /// The dependent.
    pub target: TaskId,
}

/// Where a newly inserted task goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attach {
    /// No edges.
    TopLevel,
    /// The new task becomes a dependency of the given task (breakdown).
    SubTaskOf(TaskId),
    /// The new task wraps the given task and depends on it.
    SuperTaskOf(TaskId),
}

/// Internal node structure: immediate deps, dependents and metadata.
#[derive(Debug, Clone)]
pub(crate) struct TaskNode {
    /// Direct dependencies: tasks that must be done before this one.
    pub(crate) deps: Vec<TaskId>,
    /// Direct dependents: tasks that depend on this one.
    pub(crate) dependents: Vec<TaskId>,
    pub(crate) meta: TaskMetadata,
}

impl TaskNode {
    fn new(meta: TaskMetadata) -> Self {
        Self {
            deps: Vec::new(),
            dependents: Vec::new(),
            meta,
        }
    }
}

/// In-memory DAG of one project plus per-task metadata.
///
/// Every mutating method is all-or-nothing: it validates first and only then
/// touches state, so an `Err` always leaves the store as it was. Readers get
/// owned snapshots, never references into the adjacency maps.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    /// Task ids in insertion order.
    order: Vec<TaskId>,
    nodes: HashMap<TaskId, TaskNode>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task with status `Pending`, optionally attached to an
    /// existing one.
    pub fn insert_task(
        &mut self,
        name: &str,
        detail: Option<&str>,
        attach: Attach,
    ) -> Result<TaskId> {
        if let Attach::SubTaskOf(other) | Attach::SuperTaskOf(other) = &attach {
            self.require(other)?;
        }

        let mut meta = TaskMetadata::new(name);
        if let Some(detail) = detail {
            meta.set(DETAIL_KEY, detail)?;
        }

        let id = new_id();
        self.insert_node(id.clone(), meta);

        // Fresh node, so neither edge can close a cycle.
        match attach {
            Attach::TopLevel => {}
            Attach::SubTaskOf(parent) => self.link(&id, &parent),
            Attach::SuperTaskOf(child) => self.link(&child, &id),
        }

        debug!(task = %id, name, "inserted task");
        Ok(id)
    }

    /// Delete a task, every edge touching it and its metadata.
    ///
    /// Dependents simply lose the dependency; nothing cascades.
    pub fn remove_task(&mut self, id: &str) -> Result<TaskMetadata> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| TaskgraphError::UnknownTask(id.to_string()))?;

        for dep in &node.deps {
            if let Some(dep_node) = self.nodes.get_mut(dep) {
                dep_node.dependents.retain(|d| d != id);
            }
        }
        for dependent in &node.dependents {
            if let Some(dependent_node) = self.nodes.get_mut(dependent) {
                dependent_node.deps.retain(|d| d != id);
            }
        }
        self.order.retain(|t| t != id);

        debug!(
            task = %id,
            dropped_edges = node.deps.len() + node.dependents.len(),
            "removed task"
        );
        Ok(node.meta)
    }

    /// Make `dependent` wait for `dependency`.
    ///
    /// Returns `false` if the edge already existed.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<bool> {
        self.require(dependent)?;
        self.require(dependency)?;

        if dependent == dependency {
            return Err(TaskgraphError::SelfDependency(dependent.to_string()));
        }

        if self.dependencies(dependent).iter().any(|d| d == dependency) {
            return Ok(false);
        }

        if self.reaches(dependent, dependency) {
            return Err(TaskgraphError::CycleDetected {
                dependent: dependent.to_string(),
                dependency: dependency.to_string(),
            });
        }

        self.link(dependency, dependent);
        debug!(dependent, dependency, "added dependency");
        Ok(true)
    }

    /// Drop the edge if present. Returns whether anything was removed.
    pub fn remove_dependency(&mut self, dependent: &str, dependency: &str) -> bool {
        let removed = match self.nodes.get_mut(dependent) {
            Some(node) => {
                let before = node.deps.len();
                node.deps.retain(|d| d != dependency);
                node.deps.len() != before
            }
            None => false,
        };

        if removed {
            if let Some(node) = self.nodes.get_mut(dependency) {
                node.dependents.retain(|d| d != dependent);
            }
            debug!(dependent, dependency, "removed dependency");
        }
        removed
    }

    /// Move a task to `new_status`. Returns the previous status.
    pub fn set_status(&mut self, id: &str, new_status: TaskStatus) -> Result<TaskStatus> {
        let node = self.node_mut(id)?;
        let from = node.meta.status();
        let to = status::transition(id, from, new_status)?;
        node.meta.set_status(to);

        debug!(task = %id, %from, %to, "status changed");
        Ok(from)
    }

    /// Set an arbitrary non-reserved metadata key.
    pub fn set_metadata(&mut self, id: &str, key: &str, value: &str) -> Result<()> {
        self.node_mut(id)?.meta.set(key, value)
    }

    /// Remove a non-reserved metadata key; absent keys are a no-op.
    pub fn remove_metadata(&mut self, id: &str, key: &str) -> Result<Option<String>> {
        self.node_mut(id)?.meta.remove(key)
    }

    /// The only way to change the reserved `Name` key.
    pub fn rename_task(&mut self, id: &str, name: &str) -> Result<()> {
        self.node_mut(id)?.meta.set_name(name);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All task ids, in insertion order.
    pub fn tasks(&self) -> Vec<TaskId> {
        self.order.clone()
    }

    /// All edges, grouped by source in insertion order.
    pub fn edges(&self) -> Vec<Edge> {
        self.order
            .iter()
            .flat_map(|source| {
                self.dependents(source).iter().map(move |target| Edge {
                    source: source.clone(),
                    target: target.clone(),
                })
            })
            .collect()
    }

    pub fn metadata(&self, id: &str) -> Result<TaskMetadata> {
        Ok(self.node(id)?.meta.clone())
    }

    pub fn status(&self, id: &str) -> Result<TaskStatus> {
        Ok(self.node(id)?.meta.status())
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, id: &str) -> Result<Vec<TaskId>> {
        Ok(self.node(id)?.deps.clone())
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, id: &str) -> Result<Vec<TaskId>> {
        Ok(self.node(id)?.dependents.clone())
    }

    /// Tasks currently in `status`, in insertion order.
    pub fn tasks_with_status(&self, status: TaskStatus) -> Vec<TaskId> {
        self.order
            .iter()
            .filter(|id| {
                self.nodes
                    .get(id.as_str())
                    .is_some_and(|n| n.meta.status() == status)
            })
            .cloned()
            .collect()
    }

    /// Borrowing view used by the dispatcher and the serializer.
    pub(crate) fn iter_nodes(&self) -> impl Iterator<Item = (&TaskId, &TaskNode)> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|node| (id, node)))
    }

    pub(crate) fn dependencies(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn dependents(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Add a node without any checks. Callers guarantee the id is new.
    pub(crate) fn insert_node(&mut self, id: TaskId, meta: TaskMetadata) {
        self.order.push(id.clone());
        self.nodes.insert(id, TaskNode::new(meta));
    }

    /// Add the edge `source -> target` without any checks. Callers guarantee
    /// both endpoints exist and that the edge keeps the graph acyclic.
    pub(crate) fn link(&mut self, source: &str, target: &str) {
        if let Some(node) = self.nodes.get_mut(target) {
            node.deps.push(source.to_string());
        }
        if let Some(node) = self.nodes.get_mut(source) {
            node.dependents.push(target.to_string());
        }
    }

    /// Whether `to` is reachable from `from` following dependency direction
    /// (dependency -> dependent). Visits only the subgraph downstream of
    /// `from`.
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack: Vec<&str> = vec![from];
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(self.dependents(current).iter().map(String::as_str));
        }

        false
    }

    fn require(&self, id: &str) -> Result<()> {
        self.node(id).map(|_| ())
    }

    fn node(&self, id: &str) -> Result<&TaskNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| TaskgraphError::UnknownTask(id.to_string()))
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut TaskNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| TaskgraphError::UnknownTask(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top(store: &mut GraphStore, name: &str) -> TaskId {
        store.insert_task(name, None, Attach::TopLevel).unwrap()
    }

    #[test]
    fn sub_and_super_task_edge_directions() {
        let mut store = GraphStore::new();
        let widget = top(&mut store, "Build widget");

        let part = store
            .insert_task("Order part", Some("from supplier"), Attach::SubTaskOf(widget.clone()))
            .unwrap();
        let ship = store
            .insert_task("Ship widget", None, Attach::SuperTaskOf(widget.clone()))
            .unwrap();

        assert_eq!(store.dependencies_of(&widget).unwrap(), vec![part.clone()]);
        assert_eq!(store.dependencies_of(&ship).unwrap(), vec![widget.clone()]);
        assert_eq!(
            store.metadata(&part).unwrap().get(DETAIL_KEY),
            Some("from supplier")
        );
        assert_eq!(store.status(&part).unwrap(), TaskStatus::Pending);
    }

    #[test]
    fn insert_relative_to_unknown_task_changes_nothing() {
        let mut store = GraphStore::new();
        let err = store
            .insert_task("x", None, Attach::SubTaskOf("nope".into()))
            .unwrap_err();
        assert!(matches!(err, TaskgraphError::UnknownTask(id) if id == "nope"));
        assert!(store.is_empty());
    }

    #[test]
    fn add_dependency_rejects_self_and_cycles_but_accepts_duplicates() {
        let mut store = GraphStore::new();
        let a = top(&mut store, "A");
        let b = top(&mut store, "B");
        let c = top(&mut store, "C");

        assert!(matches!(
            store.add_dependency(&a, &a),
            Err(TaskgraphError::SelfDependency(_))
        ));
        assert!(matches!(
            store.add_dependency(&a, "ghost"),
            Err(TaskgraphError::UnknownTask(id)) if id == "ghost"
        ));
        assert!(matches!(
            store.add_dependency("ghost", &a),
            Err(TaskgraphError::UnknownTask(id)) if id == "ghost"
        ));
        assert!(matches!(
            store.set_status("ghost", TaskStatus::Active),
            Err(TaskgraphError::UnknownTask(_))
        ));
        assert!(matches!(
            store.set_metadata("ghost", "Deadline", "soon"),
            Err(TaskgraphError::UnknownTask(_))
        ));
        assert!(store.edges().is_empty());

        // c depends on b, b depends on a.
        assert!(store.add_dependency(&b, &a).unwrap());
        assert!(store.add_dependency(&c, &b).unwrap());
        assert!(!store.add_dependency(&c, &b).unwrap());
        assert_eq!(store.edges().len(), 2);

        let err = store.add_dependency(&a, &c).unwrap_err();
        assert!(matches!(err, TaskgraphError::CycleDetected { .. }));
        assert_eq!(store.edges().len(), 2);
        assert!(store.dependencies_of(&a).unwrap().is_empty());
    }

    #[test]
    fn remove_task_drops_incident_edges_without_cascading() {
        let mut store = GraphStore::new();
        let a = top(&mut store, "A");
        let b = top(&mut store, "B");
        let c = top(&mut store, "C");
        store.add_dependency(&b, &a).unwrap();
        store.add_dependency(&c, &b).unwrap();

        store.remove_task(&b).unwrap();

        assert_eq!(store.tasks(), vec![a.clone(), c.clone()]);
        assert!(store.edges().is_empty());
        assert!(store.dependencies_of(&c).unwrap().is_empty());
        assert!(matches!(
            store.remove_task(&b),
            Err(TaskgraphError::UnknownTask(_))
        ));
    }

    #[test]
    fn remove_dependency_is_a_noop_when_absent() {
        let mut store = GraphStore::new();
        let a = top(&mut store, "A");
        let b = top(&mut store, "B");

        assert!(!store.remove_dependency(&b, &a));
        store.add_dependency(&b, &a).unwrap();
        assert!(store.remove_dependency(&b, &a));
        assert!(store.dependents_of(&a).unwrap().is_empty());
    }

    #[test]
    fn illegal_status_change_leaves_status_untouched() {
        let mut store = GraphStore::new();
        let a = top(&mut store, "A");

        assert!(matches!(
            store.set_status(&a, TaskStatus::Done),
            Err(TaskgraphError::IllegalTransition { .. })
        ));
        assert_eq!(store.status(&a).unwrap(), TaskStatus::Pending);

        assert_eq!(store.set_status(&a, TaskStatus::Active).unwrap(), TaskStatus::Pending);
        assert_eq!(store.tasks_with_status(TaskStatus::Active), vec![a]);
    }

    #[test]
    fn snapshots_are_detached_from_the_store() {
        let mut store = GraphStore::new();
        let a = top(&mut store, "A");

        let mut snapshot = store.metadata(&a).unwrap();
        snapshot.set("Location", "home").unwrap();

        assert_eq!(store.metadata(&a).unwrap().get("Location"), None);
        assert!(matches!(
            store.set_metadata(&a, "Status", "Done"),
            Err(TaskgraphError::ReservedKey(_))
        ));

        store.rename_task(&a, "Renamed").unwrap();
        assert_eq!(store.metadata(&a).unwrap().name(), "Renamed");
    }
}
