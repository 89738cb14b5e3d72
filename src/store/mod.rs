// src/store/mod.rs

//! Persistence of projects as human-editable text documents.
//!
//! - [`document`] is the serde model of the catalog and project files.
//! - [`project`] converts between documents and validated in-memory projects.
//! - [`fingerprint`] detects out-of-band edits by content hash.
//! - [`repository`] loads, reloads and commits one project.
//! - [`index`] is the catalog of projects.
//! - [`workspace`] composes the two for callers.

pub mod document;
pub mod fingerprint;
pub mod index;
pub mod project;
pub mod repository;
pub mod workspace;

pub use fingerprint::fingerprint_bytes;
pub use index::{IndexEntry, ProjectIndex};
pub use project::Project;
pub use repository::{Commit, ProjectRepository};
pub use workspace::Workspace;
