// src/store/project.rs

use tracing::debug;

use crate::dag::graph::GraphStore;
use crate::dag::validate::{Invariant, build_graph};
use crate::errors::{Result, TaskgraphError};
use crate::store::document::{NodeEntry, NodeLinkData, ProjectDocument};

/// One project: a name and its task graph. The unit of persistence.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub name: String,
    pub graph: GraphStore,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: GraphStore::new(),
        }
    }

    pub fn to_document(&self) -> ProjectDocument {
        let mut dag = NodeLinkData::default();
        let mut metadata = std::collections::BTreeMap::new();

        for (id, node) in self.graph.iter_nodes() {
            dag.nodes.push(NodeEntry { id: id.clone() });
            metadata.insert(id.clone(), node.meta.to_map());
        }
        dag.edges = self.graph.edges();

        ProjectDocument {
            name: self.name.clone(),
            dag,
            metadata,
        }
    }

    /// Validate a parsed document; nothing is dropped or repaired.
    pub fn from_document(project_id: &str, doc: ProjectDocument) -> Result<Self> {
        let nodes = doc.dag.nodes.into_iter().map(|n| n.id).collect();
        let graph = build_graph(project_id, nodes, doc.dag.edges, doc.metadata)?;

        debug!(
            project = %project_id,
            tasks = graph.len(),
            "validated project document"
        );

        Ok(Self {
            name: doc.name,
            graph,
        })
    }

    /// Pretty-printed JSON, terminated by a newline.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.to_document())?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(project_id: &str, bytes: &[u8]) -> Result<Self> {
        let doc: ProjectDocument =
            serde_json::from_slice(bytes).map_err(|e| TaskgraphError::CorruptProject {
                project: project_id.to_string(),
                invariant: Invariant::WellFormed,
                detail: e.to_string(),
            })?;
        Self::from_document(project_id, doc)
    }
}
