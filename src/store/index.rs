// src/store/index.rs

//! Catalog of known projects.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/projects.json          catalog
//! <root>/projects/<id>.json     one document per project
//! ```
//!
//! The catalog only knows ids, names and locations. It holds no graph
//! content and is re-persisted after every change.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::errors::{Result, TaskgraphError};
use crate::fs::FileSystem;
use crate::store::document::{CatalogDocument, CatalogItem};
use crate::store::fingerprint::{fingerprint_bytes, read_with_fingerprint};
use crate::store::repository::ProjectRepository;
use crate::types::{Fingerprint, ProjectId, new_id};

pub const CATALOG_FILE: &str = "projects.json";
pub const PROJECTS_DIR: &str = "projects";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: ProjectId,
    pub name: String,
    /// Path of the project document.
    pub location: PathBuf,
}

#[derive(Debug)]
pub struct ProjectIndex {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    entries: Vec<IndexEntry>,
    /// Fingerprint of the catalog as last read or written; `None` when no
    /// catalog file existed.
    fingerprint: Option<Fingerprint>,
}

impl ProjectIndex {
    /// Load the catalog under `root`, creating an empty one if none exists.
    ///
    /// Entries whose project document is missing are dropped (and the
    /// catalog rewritten) so later lookups cannot hand out dangling paths.
    pub fn load(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Result<Self> {
        let mut index = Self {
            fs,
            root: root.into(),
            entries: Vec::new(),
            fingerprint: None,
        };

        let listed = index.refresh()?;
        if index.fingerprint.is_none() {
            warn!(path = ?index.catalog_path(), "no catalog found; creating an empty one");
            index.commit(Vec::new())?;
        } else if listed != index.entries.len() {
            index.commit(index.entries.clone())?;
        }

        Ok(index)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn location_for(&self, id: &str) -> PathBuf {
        self.root.join(PROJECTS_DIR).join(format!("{id}.json"))
    }

    /// Re-read the catalog if another session rewrote it since we last
    /// looked. Returns how many entries the file lists.
    pub fn refresh(&mut self) -> Result<usize> {
        let catalog_path = self.catalog_path();
        if !self.fs.exists(&catalog_path) {
            self.entries.clear();
            self.fingerprint = None;
            return Ok(0);
        }

        let (bytes, fingerprint) = read_with_fingerprint(self.fs.as_ref(), &catalog_path)?;
        if self.fingerprint.as_ref() == Some(&fingerprint) {
            return Ok(self.entries.len());
        }

        let doc: CatalogDocument = serde_json::from_slice(&bytes)?;
        let listed = doc.projects.len();

        let mut entries = Vec::with_capacity(listed);
        for item in doc.projects {
            let location = self.location_for(&item.id);
            if self.fs.exists(&location) {
                info!(project = %item.id, name = %item.name, "catalog entry loaded");
                entries.push(IndexEntry {
                    id: item.id,
                    name: item.name,
                    location,
                });
            } else {
                error!(
                    project = %item.id,
                    path = ?location,
                    "project document missing; dropping catalog entry"
                );
            }
        }

        self.entries = entries;
        self.fingerprint = Some(fingerprint);
        Ok(listed)
    }

    /// Allocate an id, persist an empty project and record it.
    ///
    /// If the catalog cannot be committed the new document is removed again.
    pub fn create(&mut self, name: &str) -> Result<ProjectId> {
        self.refresh()?;

        let id = new_id();
        let location = self.location_for(&id);
        ProjectRepository::create(self.fs.clone(), id.clone(), location.clone(), name)?;

        let mut entries = self.entries.clone();
        entries.push(IndexEntry {
            id: id.clone(),
            name: name.to_string(),
            location: location.clone(),
        });

        if let Err(e) = self.commit(entries) {
            if let Err(cleanup) = self.fs.remove_file(&location) {
                warn!(project = %id, error = %cleanup, "could not remove uncatalogued document");
            }
            return Err(e);
        }

        info!(project = %id, name, "created project");
        Ok(id)
    }

    /// Remove the entry and its document. Not recoverable.
    pub fn delete(&mut self, id: &str) -> Result<IndexEntry> {
        self.refresh()?;

        let pos = self.position(id)?;
        let mut entries = self.entries.clone();
        let entry = entries.remove(pos);
        self.commit(entries)?;

        if self.fs.exists(&entry.location) {
            self.fs.remove_file(&entry.location)?;
        } else {
            warn!(project = %id, path = ?entry.location, "project document already gone");
        }

        info!(project = %id, name = %entry.name, "deleted project");
        Ok(entry)
    }

    /// Update the catalog name. The project document is renamed by the
    /// caller through its repository.
    pub fn rename(&mut self, id: &str, name: &str) -> Result<()> {
        self.refresh()?;

        let pos = self.position(id)?;
        let mut entries = self.entries.clone();
        entries[pos].name = name.to_string();
        self.commit(entries)
    }

    pub fn list(&self) -> Vec<IndexEntry> {
        self.entries.clone()
    }

    pub fn get(&self, id: &str) -> Result<&IndexEntry> {
        let pos = self.position(id)?;
        Ok(&self.entries[pos])
    }

    /// Open a repository for one catalogued project.
    pub fn open_repository(&self, id: &str) -> Result<ProjectRepository> {
        let entry = self.get(id)?;
        ProjectRepository::open(self.fs.clone(), entry.id.clone(), entry.location.clone())
    }

    fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| TaskgraphError::UnknownProject(id.to_string()))
    }

    /// Write `entries` as the new catalog, provided the file still has the
    /// fingerprint we last saw. Memory is only updated on success.
    fn commit(&mut self, entries: Vec<IndexEntry>) -> Result<()> {
        let doc = CatalogDocument {
            projects: entries
                .iter()
                .map(|e| CatalogItem {
                    id: e.id.clone(),
                    name: e.name.clone(),
                })
                .collect(),
        };
        let mut json = serde_json::to_string_pretty(&doc)?;
        json.push('\n');

        let catalog_path = self.catalog_path();
        let on_disk = if self.fs.exists(&catalog_path) {
            Some(read_with_fingerprint(self.fs.as_ref(), &catalog_path)?.1)
        } else {
            None
        };
        if on_disk != self.fingerprint {
            warn!(path = ?catalog_path, "catalog rewritten by another session");
            return Err(TaskgraphError::StaleCatalog(catalog_path));
        }

        self.fs.write_atomic(&catalog_path, json.as_bytes())?;
        self.fingerprint = Some(fingerprint_bytes(json.as_bytes()));
        self.entries = entries;
        Ok(())
    }
}
