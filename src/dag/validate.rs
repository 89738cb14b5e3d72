// src/dag/validate.rs

//! Structural validation of a graph read from disk.
//!
//! A persisted project is only turned into a [`GraphStore`] once every
//! structural invariant holds. Nothing is repaired: the first violation is
//! reported and the caller gets no graph at all.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::graph::{Edge, GraphStore};
use crate::dag::metadata::TaskMetadata;
use crate::errors::{Result, TaskgraphError};
use crate::types::TaskId;

/// Structural invariants every project graph must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    /// The document parses as a project at all.
    WellFormed,
    /// The edge set contains no cycle.
    Acyclic,
    /// Edge endpoints and metadata entries reference existing nodes, and
    /// every node has metadata.
    ReferentialIntegrity,
    /// Every node has `Name` and a recognised `Status`.
    ReservedKeys,
    /// No edge has equal source and target.
    NoSelfLoop,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Invariant::WellFormed => "well-formed document",
            Invariant::Acyclic => "acyclicity",
            Invariant::ReferentialIntegrity => "referential integrity",
            Invariant::ReservedKeys => "reserved keys present",
            Invariant::NoSelfLoop => "no self-loop",
        };
        f.write_str(s)
    }
}

/// Check the raw parts of a persisted project and assemble a [`GraphStore`].
///
/// Node order is preserved; duplicate edges collapse into one.
pub fn build_graph(
    project: &str,
    nodes: Vec<TaskId>,
    edges: Vec<Edge>,
    mut metadata: BTreeMap<TaskId, BTreeMap<String, String>>,
) -> Result<GraphStore> {
    let corrupt = |invariant: Invariant, detail: String| TaskgraphError::CorruptProject {
        project: project.to_string(),
        invariant,
        detail,
    };

    let mut known: HashSet<&str> = HashSet::new();
    for id in &nodes {
        if !known.insert(id.as_str()) {
            return Err(corrupt(
                Invariant::ReferentialIntegrity,
                format!("task '{id}' appears more than once in the node list"),
            ));
        }
        if !metadata.contains_key(id) {
            return Err(corrupt(
                Invariant::ReferentialIntegrity,
                format!("task '{id}' has no metadata entry"),
            ));
        }
    }

    if let Some(orphan) = metadata.keys().find(|id| !known.contains(id.as_str())) {
        return Err(corrupt(
            Invariant::ReferentialIntegrity,
            format!("metadata entry '{orphan}' does not match any task"),
        ));
    }

    for edge in &edges {
        for endpoint in [&edge.source, &edge.target] {
            if !known.contains(endpoint.as_str()) {
                return Err(corrupt(
                    Invariant::ReferentialIntegrity,
                    format!(
                        "edge {} -> {} references unknown task '{endpoint}'",
                        edge.source, edge.target
                    ),
                ));
            }
        }
        if edge.source == edge.target {
            return Err(corrupt(
                Invariant::NoSelfLoop,
                format!("task '{}' depends on itself", edge.source),
            ));
        }
    }

    let mut parsed: Vec<(TaskId, TaskMetadata)> = Vec::with_capacity(nodes.len());
    for id in nodes {
        let raw = metadata.remove(&id).unwrap_or_default();
        let meta = TaskMetadata::from_map(raw)
            .map_err(|e| corrupt(Invariant::ReservedKeys, format!("task '{id}': {e}")))?;
        parsed.push((id, meta));
    }

    ensure_acyclic(&edges).map_err(|node| {
        corrupt(
            Invariant::Acyclic,
            format!("cycle detected in task DAG involving task '{node}'"),
        )
    })?;

    let mut store = GraphStore::new();
    for (id, meta) in parsed {
        store.insert_node(id, meta);
    }

    let mut seen: HashSet<&Edge> = HashSet::new();
    for edge in &edges {
        if seen.insert(edge) {
            store.link(&edge.source, &edge.target);
        }
    }

    Ok(store)
}

/// Topologically sort the edge set; on failure return a task on the cycle.
fn ensure_acyclic(edges: &[Edge]) -> std::result::Result<(), String> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for edge in edges {
        graph.add_edge(edge.source.as_str(), edge.target.as_str(), ());
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(cycle.node_id().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, status: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Name".to_string(), name.to_string()),
            ("Status".to_string(), status.to_string()),
        ])
    }

    fn edge(source: &str, target: &str) -> Edge {
        Edge {
            source: source.into(),
            target: target.into(),
        }
    }

    fn invariant_of(err: TaskgraphError) -> Invariant {
        match err {
            TaskgraphError::CorruptProject { invariant, .. } => invariant,
            other => panic!("expected CorruptProject, got {other:?}"),
        }
    }

    #[test]
    fn builds_a_valid_graph_and_collapses_duplicate_edges() {
        let nodes = vec!["a".to_string(), "b".to_string()];
        let metadata = BTreeMap::from([
            ("a".to_string(), meta("A", "Done")),
            ("b".to_string(), meta("B", "Pending")),
        ]);

        let store = build_graph("p", nodes, vec![edge("a", "b"), edge("a", "b")], metadata).unwrap();

        assert_eq!(store.tasks(), vec!["a", "b"]);
        assert_eq!(store.edges(), vec![edge("a", "b")]);
    }

    #[test]
    fn reports_each_invariant() {
        let two = || vec!["a".to_string(), "b".to_string()];
        let good_meta = || {
            BTreeMap::from([
                ("a".to_string(), meta("A", "Pending")),
                ("b".to_string(), meta("B", "Pending")),
            ])
        };

        let err = build_graph("p", two(), vec![edge("a", "z")], good_meta()).unwrap_err();
        assert_eq!(invariant_of(err), Invariant::ReferentialIntegrity);

        let err = build_graph("p", two(), vec![edge("a", "a")], good_meta()).unwrap_err();
        assert_eq!(invariant_of(err), Invariant::NoSelfLoop);

        let mut bad_status = good_meta();
        bad_status.insert("b".to_string(), meta("B", "Blocked"));
        let err = build_graph("p", two(), vec![], bad_status).unwrap_err();
        assert_eq!(invariant_of(err), Invariant::ReservedKeys);

        let err = build_graph("p", two(), vec![edge("a", "b"), edge("b", "a")], good_meta())
            .unwrap_err();
        assert_eq!(invariant_of(err), Invariant::Acyclic);

        let mut extra = good_meta();
        extra.insert("ghost".to_string(), meta("G", "Pending"));
        let err = build_graph("p", two(), vec![], extra).unwrap_err();
        assert_eq!(invariant_of(err), Invariant::ReferentialIntegrity);
    }
}
