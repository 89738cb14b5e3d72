#![allow(dead_code)]

use std::collections::HashMap;

use taskgraph::dag::{Attach, GraphStore, TaskStatus};
use taskgraph::types::TaskId;

/// Builder for a `GraphStore` whose tasks are addressed by short labels
/// (the label doubles as the task name).
pub struct GraphBuilder {
    graph: GraphStore,
    ids: HashMap<String, TaskId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: GraphStore::new(),
            ids: HashMap::new(),
        }
    }

    pub fn task(mut self, label: &str) -> Self {
        let id = self
            .graph
            .insert_task(label, None, Attach::TopLevel)
            .expect("top-level insert cannot fail");
        self.ids.insert(label.to_string(), id);
        self
    }

    /// `dependent` waits for `dependency`.
    pub fn dep(mut self, dependent: &str, dependency: &str) -> Self {
        let (a, b) = (self.id(dependent), self.id(dependency));
        self.graph
            .add_dependency(&a, &b)
            .expect("builder dependency must be valid");
        self
    }

    pub fn active(mut self, label: &str) -> Self {
        let id = self.id(label);
        self.graph
            .set_status(&id, TaskStatus::Active)
            .expect("Pending -> Active");
        self
    }

    /// Walk a pending task through Active to Done.
    pub fn done(self, label: &str) -> Self {
        let mut this = self.active(label);
        let id = this.id(label);
        this.graph
            .set_status(&id, TaskStatus::Done)
            .expect("Active -> Done");
        this
    }

    pub fn build(self) -> BuiltGraph {
        BuiltGraph {
            graph: self.graph,
            ids: self.ids,
        }
    }

    fn id(&self, label: &str) -> TaskId {
        self.ids
            .get(label)
            .cloned()
            .unwrap_or_else(|| panic!("unknown label {label}"))
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A built graph plus the label -> id mapping.
pub struct BuiltGraph {
    pub graph: GraphStore,
    ids: HashMap<String, TaskId>,
}

impl BuiltGraph {
    pub fn id(&self, label: &str) -> TaskId {
        self.ids
            .get(label)
            .cloned()
            .unwrap_or_else(|| panic!("unknown label {label}"))
    }

    /// Map ids back to labels, keeping order.
    pub fn labels(&self, ids: &[TaskId]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                self.ids
                    .iter()
                    .find(|(_, v)| *v == id)
                    .map(|(k, _)| k.clone())
                    .unwrap_or_else(|| id.clone())
            })
            .collect()
    }
}
