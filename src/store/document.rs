// src/store/document.rs

//! On-disk document model.
//!
//! Both documents are pretty-printed JSON so they stay editable by hand.
//!
//! Catalog (`projects.json`):
//!
//! ```json
//! { "projects": [ { "id": "…", "name": "Garden" } ] }
//! ```
//!
//! Project (`projects/<id>.json`), using the node-link layout:
//!
//! ```json
//! {
//!   "name": "Garden",
//!   "DAG": {
//!     "directed": true,
//!     "multigraph": false,
//!     "graph": {},
//!     "nodes": [ { "id": "t1" }, { "id": "t2" } ],
//!     "edges": [ { "source": "t1", "target": "t2" } ]
//!   },
//!   "metadata": {
//!     "t1": { "Name": "Buy seeds", "Status": "Done" },
//!     "t2": { "Name": "Plant", "Status": "Pending", "Location": "52.1,4.3" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dag::graph::Edge;
use crate::types::{ProjectId, TaskId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub projects: Vec<CatalogItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "DAG")]
    pub dag: NodeLinkData,

    #[serde(default)]
    pub metadata: BTreeMap<TaskId, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkData {
    #[serde(default = "default_directed")]
    pub directed: bool,

    #[serde(default)]
    pub multigraph: bool,

    /// Graph-level attributes. Accepted on read, always written empty.
    #[serde(default)]
    pub graph: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub nodes: Vec<NodeEntry>,

    /// Older node-link files call this list `links`.
    #[serde(default, alias = "links")]
    pub edges: Vec<Edge>,
}

fn default_directed() -> bool {
    true
}

impl Default for NodeLinkData {
    fn default() -> Self {
        Self {
            directed: default_directed(),
            multigraph: false,
            graph: serde_json::Map::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: TaskId,
}
