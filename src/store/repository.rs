// src/store/repository.rs

//! One project's persisted document and its in-memory graph.
//!
//! Concurrency is optimistic at file granularity. Every mutation:
//!
//! 1. reads the persisted document and its fingerprint,
//! 2. applies the change to a copy of the project in memory,
//! 3. re-checks the fingerprint on disk and fails with `StaleProject` if it
//!    moved,
//! 4. writes the new document atomically (temp file + rename).
//!
//! Nothing blocks; the loser of a race retries against the fresh state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::dag::dispatcher;
use crate::errors::{Result, TaskgraphError};
use crate::fs::FileSystem;
use crate::store::fingerprint::{fingerprint_bytes, read_with_fingerprint};
use crate::store::project::Project;
use crate::types::{Fingerprint, ProjectId, TaskId};

/// Outcome of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit<T> {
    pub value: T,
    /// Fingerprint of the document as written by this commit.
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone)]
struct Loaded {
    project: Project,
    fingerprint: Fingerprint,
}

#[derive(Debug)]
pub struct ProjectRepository {
    id: ProjectId,
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    /// Last successfully validated state. `None` until the first good load,
    /// and again after a reload finds the file corrupt.
    loaded: Option<Loaded>,
    /// Set by the persistence watcher; forces a reload on next access.
    external_change: bool,
}

impl ProjectRepository {
    /// Open an existing project document, validating it.
    pub fn open(fs: Arc<dyn FileSystem>, id: ProjectId, path: PathBuf) -> Result<Self> {
        let mut repo = Self {
            id,
            path,
            fs,
            loaded: None,
            external_change: false,
        };
        repo.current()?;
        Ok(repo)
    }

    /// Persist a new, empty project and open it.
    pub fn create(
        fs: Arc<dyn FileSystem>,
        id: ProjectId,
        path: PathBuf,
        name: &str,
    ) -> Result<Self> {
        let project = Project::new(name);
        let json = project.to_json()?;
        fs.write_atomic(&path, json.as_bytes())?;
        info!(project = %id, path = ?path, name, "created project document");

        Ok(Self {
            id,
            path,
            fs,
            loaded: Some(Loaded {
                project,
                fingerprint: fingerprint_bytes(json.as_bytes()),
            }),
            external_change: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current project, reloading first if the file changed.
    pub fn snapshot(&mut self) -> Result<Project> {
        Ok(self.current()?.project.clone())
    }

    /// Fingerprint of the current persisted state. Pass it to
    /// [`mutate_at`](Self::mutate_at) to make a mutation conditional on
    /// nobody else having committed in between.
    pub fn fingerprint(&mut self) -> Result<Fingerprint> {
        Ok(self.current()?.fingerprint.clone())
    }

    pub fn available_tasks(&mut self) -> Result<Vec<TaskId>> {
        Ok(dispatcher::available_tasks(&self.current()?.project.graph))
    }

    /// Persistence watcher hook: the file now has `fingerprint`.
    pub fn notify_external_change(&mut self, fingerprint: &Fingerprint) {
        let known = self.loaded.as_ref().map(|l| &l.fingerprint);
        if known != Some(fingerprint) {
            info!(project = %self.id, %fingerprint, "external change reported; will reload");
            self.external_change = true;
        }
    }

    /// Apply `op` against the freshly loaded state and commit it.
    pub fn mutate<T, F>(&mut self, op: F) -> Result<Commit<T>>
    where
        F: FnOnce(&mut Project) -> Result<T>,
    {
        let expected = self.fingerprint()?;
        self.mutate_at(&expected, op)
    }

    /// Apply `op` only if the persisted state still has `expected`
    /// fingerprint; otherwise fail with `StaleProject`.
    ///
    /// A failing `op` leaves both memory and disk untouched.
    pub fn mutate_at<T, F>(&mut self, expected: &Fingerprint, op: F) -> Result<Commit<T>>
    where
        F: FnOnce(&mut Project) -> Result<T>,
    {
        let (mut working, current) = {
            let loaded = self.current()?;
            (loaded.project.clone(), loaded.fingerprint.clone())
        };
        if &current != expected {
            warn!(
                project = %self.id,
                expected = %expected,
                actual = %current,
                "mutation based on an outdated version"
            );
            return Err(TaskgraphError::StaleProject(self.id.clone()));
        }

        let value = op(&mut working)?;
        let json = working.to_json()?;

        // Compare-and-swap against whatever is on disk right now.
        let (_, on_disk) = read_with_fingerprint(self.fs.as_ref(), &self.path)?;
        if &on_disk != expected {
            warn!(project = %self.id, %on_disk, "project rewritten during mutation");
            self.external_change = true;
            return Err(TaskgraphError::StaleProject(self.id.clone()));
        }

        self.fs.write_atomic(&self.path, json.as_bytes())?;
        let fingerprint = fingerprint_bytes(json.as_bytes());
        info!(project = %self.id, %fingerprint, "committed project");

        self.loaded = Some(Loaded {
            project: working,
            fingerprint: fingerprint.clone(),
        });

        Ok(Commit { value, fingerprint })
    }

    /// Bring the cached state in line with the file, reloading if needed.
    fn current(&mut self) -> Result<&Loaded> {
        let (bytes, fingerprint) = read_with_fingerprint(self.fs.as_ref(), &self.path)?;

        let up_to_date = !self.external_change
            && self
                .loaded
                .as_ref()
                .is_some_and(|l| l.fingerprint == fingerprint);

        if !up_to_date {
            if self.loaded.is_some() {
                info!(project = %self.id, %fingerprint, "project changed on disk; reloading");
            }
            // Drop the old state first so a corrupt file leaves nothing usable.
            self.loaded = None;
            self.external_change = false;

            let project = Project::from_json(&self.id, &bytes).inspect_err(|e| {
                error!(project = %self.id, error = %e, "refusing to load project");
            })?;
            debug!(project = %self.id, tasks = project.graph.len(), "loaded project");
            self.loaded = Some(Loaded {
                project,
                fingerprint,
            });
        }

        self.loaded
            .as_ref()
            .ok_or_else(|| TaskgraphError::UnknownProject(self.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::graph::Attach;
    use crate::fs::mock::MockFileSystem;

    fn repo(fs: &MockFileSystem) -> ProjectRepository {
        ProjectRepository::create(
            Arc::new(fs.clone()),
            "p1".into(),
            PathBuf::from("data/projects/p1.json"),
            "Home",
        )
        .unwrap()
    }

    #[test]
    fn failed_operation_writes_nothing() {
        let fs = MockFileSystem::new();
        let mut repo = repo(&fs);
        let before = fs.contents("data/projects/p1.json");

        let err = repo
            .mutate(|p| p.graph.remove_task("missing"))
            .unwrap_err();
        assert!(matches!(err, TaskgraphError::UnknownTask(_)));
        assert_eq!(fs.contents("data/projects/p1.json"), before);
    }

    #[test]
    fn external_edit_is_picked_up_on_next_access() {
        let fs = MockFileSystem::new();
        let mut repo = repo(&fs);
        repo.mutate(|p| p.graph.insert_task("A", None, Attach::TopLevel))
            .unwrap();

        let mut edited = repo.snapshot().unwrap();
        edited.name = "Renamed elsewhere".into();
        fs.add_file("data/projects/p1.json", edited.to_json().unwrap());

        assert_eq!(repo.snapshot().unwrap().name, "Renamed elsewhere");
    }

    #[test]
    fn watcher_notification_with_known_fingerprint_is_ignored() {
        let fs = MockFileSystem::new();
        let mut repo = repo(&fs);
        let fp = repo.fingerprint().unwrap();

        repo.notify_external_change(&fp);
        assert!(!repo.external_change);

        repo.notify_external_change(&Fingerprint::from_hex("deadbeef"));
        assert!(repo.external_change);
        // Reload clears the flag.
        assert_eq!(repo.fingerprint().unwrap(), fp);
        assert!(!repo.external_change);
    }
}
