// src/store/workspace.rs

//! Composition root for the persistence layer.
//!
//! Owns the [`ProjectIndex`] explicitly (no global catalog) and lazily opens
//! one [`ProjectRepository`] per project. Each project is its own unit of
//! consistency; nothing here locks across projects.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, warn};

use crate::config::ConfigFile;
use crate::dag::status::TaskStatus;
use crate::errors::{Result, TaskgraphError};
use crate::fs::FileSystem;
use crate::store::index::ProjectIndex;
use crate::store::project::Project;
use crate::store::repository::ProjectRepository;
use crate::types::{Fingerprint, ProjectId, TaskId};

#[derive(Debug)]
pub struct Workspace {
    index: ProjectIndex,
    repositories: HashMap<ProjectId, ProjectRepository>,
    stale_retries: usize,
}

impl Workspace {
    pub fn new(index: ProjectIndex, stale_retries: usize) -> Self {
        Self {
            index,
            repositories: HashMap::new(),
            stale_retries,
        }
    }

    /// Load the catalog from the configured storage root.
    pub fn open(fs: Arc<dyn FileSystem>, cfg: &ConfigFile) -> Result<Self> {
        let index = ProjectIndex::load(fs, cfg.storage.root_path.clone())?;
        Ok(Self::new(index, cfg.sync.stale_retries))
    }

    pub fn index(&self) -> &ProjectIndex {
        &self.index
    }

    pub fn create_project(&mut self, name: &str) -> Result<ProjectId> {
        self.with_catalog_retry(|index| index.create(name))
    }

    pub fn delete_project(&mut self, id: &str) -> Result<()> {
        self.repositories.remove(id);
        self.with_catalog_retry(|index| index.delete(id))?;
        Ok(())
    }

    /// Rename in both the project document and the catalog.
    pub fn rename_project(&mut self, id: &str, name: &str) -> Result<()> {
        let new_name = name.to_string();
        self.with_retry(id, |project| {
            project.name = new_name.clone();
            Ok(())
        })?;
        self.with_catalog_retry(|index| index.rename(id, name))
    }

    /// The repository for `id`, opening it on first use.
    pub fn project(&mut self, id: &str) -> Result<&mut ProjectRepository> {
        if !self.repositories.contains_key(id) {
            if self.index.get(id).is_err() {
                // Possibly created by another session since we loaded.
                self.index.refresh()?;
            }
            let repo = self.index.open_repository(id)?;
            self.repositories.insert(id.to_string(), repo);
        }
        // Present: inserted above or already cached.
        self.repositories
            .get_mut(id)
            .ok_or_else(|| TaskgraphError::UnknownProject(id.to_string()))
    }

    /// Forget the in-memory state of a project. Returns whether it was loaded.
    pub fn unload(&mut self, id: &str) -> bool {
        self.repositories.remove(id).is_some()
    }

    /// Persistence watcher hook. Unloaded projects are read fresh anyway.
    pub fn notify_file_changed(&mut self, id: &str, fingerprint: &Fingerprint) -> Result<()> {
        self.index.get(id)?;
        if let Some(repo) = self.repositories.get_mut(id) {
            repo.notify_external_change(fingerprint);
        }
        Ok(())
    }

    /// Run a mutation, retrying up to the configured number of times when it
    /// loses a race with another writer.
    pub fn with_retry<T, F>(&mut self, id: &str, mut op: F) -> Result<T>
    where
        F: FnMut(&mut Project) -> Result<T>,
    {
        let attempts = self.stale_retries.max(1);
        let repo = self.project(id)?;

        let mut attempt = 1;
        loop {
            match repo.mutate(&mut op) {
                Ok(commit) => return Ok(commit.value),
                Err(e) if e.is_stale() && attempt < attempts => {
                    warn!(project = %id, attempt, attempts, "stale project; retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Catalog counterpart of [`with_retry`](Self::with_retry).
    fn with_catalog_retry<T, F>(&mut self, mut op: F) -> Result<T>
    where
        F: FnMut(&mut ProjectIndex) -> Result<T>,
    {
        let attempts = self.stale_retries.max(1);

        let mut attempt = 1;
        loop {
            match op(&mut self.index) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_stale() && attempt < attempts => {
                    warn!(attempt, attempts, "stale catalog; retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Every task with `status`, grouped by project in catalog order.
    ///
    /// Projects that fail to load are logged and skipped; they need manual
    /// repair and must not hide the rest.
    pub fn tasks_with_status(&mut self, status: TaskStatus) -> Vec<(ProjectId, Vec<TaskId>)> {
        let mut found = Vec::new();

        if let Err(e) = self.index.refresh() {
            warn!(error = %e, "could not refresh catalog; using the cached one");
        }
        for entry in self.index.list() {
            let tasks = self
                .project(&entry.id)
                .and_then(|repo| repo.snapshot())
                .map(|project| project.graph.tasks_with_status(status));

            match tasks {
                Ok(tasks) if !tasks.is_empty() => found.push((entry.id, tasks)),
                Ok(_) => {}
                Err(e) => {
                    error!(project = %entry.id, error = %e, "skipping unreadable project");
                }
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::dag::graph::Attach;
    use crate::fs::mock::MockFileSystem;
    use crate::store::index::PROJECTS_DIR;

    /// Plays a second writer: once armed, every third read of a project
    /// document (the compare-and-swap re-read of one mutation attempt) first
    /// commits a concurrent edit, as long as races remain.
    #[derive(Debug)]
    struct RacingFileSystem {
        inner: MockFileSystem,
        armed: AtomicBool,
        reads: AtomicUsize,
        races_left: AtomicUsize,
        races: AtomicUsize,
    }

    impl RacingFileSystem {
        fn new(inner: MockFileSystem, races_left: usize) -> Self {
            Self {
                inner,
                armed: AtomicBool::new(false),
                reads: AtomicUsize::new(0),
                races_left: AtomicUsize::new(races_left),
                races: AtomicUsize::new(0),
            }
        }

        fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }

        fn races(&self) -> usize {
            self.races.load(Ordering::SeqCst)
        }

        fn is_project_document(path: &Path) -> bool {
            path.parent()
                .and_then(Path::file_name)
                .is_some_and(|dir| dir == PROJECTS_DIR)
        }

        fn concurrent_edit(&self, path: &Path) -> anyhow::Result<()> {
            let n = self.races.fetch_add(1, Ordering::SeqCst) + 1;
            let bytes = self.inner.read(path)?;
            let mut project = Project::from_json("race", &bytes)?;
            project
                .graph
                .insert_task(&format!("Concurrent {n}"), None, Attach::TopLevel)?;
            self.inner.write(path, project.to_json()?.as_bytes())
        }
    }

    impl FileSystem for RacingFileSystem {
        fn read(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
            if self.armed.load(Ordering::SeqCst) && Self::is_project_document(path) {
                let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
                let race = n % 3 == 0
                    && self
                        .races_left
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                            left.checked_sub(1)
                        })
                        .is_ok();
                if race {
                    self.concurrent_edit(path)?;
                }
            }
            self.inner.read(path)
        }

        fn write(&self, path: &Path, contents: &[u8]) -> anyhow::Result<()> {
            self.inner.write(path, contents)
        }

        fn rename(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
            self.inner.rename(from, to)
        }

        fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
            self.inner.remove_file(path)
        }

        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }
    }

    /// Workspace over a racing filesystem with one opened project.
    fn racing_workspace(
        races: usize,
        stale_retries: usize,
    ) -> (Arc<RacingFileSystem>, Workspace, ProjectId) {
        let racing = Arc::new(RacingFileSystem::new(MockFileSystem::new(), races));
        let index = ProjectIndex::load(racing.clone(), PathBuf::from("data")).unwrap();
        let mut ws = Workspace::new(index, stale_retries);
        let id = ws.create_project("Busy").unwrap();
        ws.project(&id).unwrap();
        racing.arm();
        (racing, ws, id)
    }

    fn workspace(fs: &MockFileSystem) -> Workspace {
        let index = ProjectIndex::load(Arc::new(fs.clone()), "data").unwrap();
        Workspace::new(index, 3)
    }

    #[test]
    fn rename_updates_document_and_catalog() {
        let fs = MockFileSystem::new();
        let mut ws = workspace(&fs);
        let id = ws.create_project("Old").unwrap();

        ws.rename_project(&id, "New").unwrap();

        assert_eq!(ws.index().get(&id).unwrap().name, "New");
        assert_eq!(ws.project(&id).unwrap().snapshot().unwrap().name, "New");
    }

    #[test]
    fn tasks_with_status_spans_projects() {
        let fs = MockFileSystem::new();
        let mut ws = workspace(&fs);
        let home = ws.create_project("Home").unwrap();
        let work = ws.create_project("Work").unwrap();
        let _empty = ws.create_project("Empty").unwrap();

        let a = ws
            .with_retry(&home, |p| p.graph.insert_task("Paint", None, Attach::TopLevel))
            .unwrap();
        let b = ws
            .with_retry(&work, |p| {
                let id = p.graph.insert_task("Report", None, Attach::TopLevel)?;
                p.graph.set_status(&id, TaskStatus::Active)?;
                Ok(id)
            })
            .unwrap();

        assert_eq!(
            ws.tasks_with_status(TaskStatus::Pending),
            vec![(home.clone(), vec![a])]
        );
        assert_eq!(ws.tasks_with_status(TaskStatus::Active), vec![(work, vec![b])]);
    }

    #[test]
    fn unknown_project_notifications_are_errors() {
        let fs = MockFileSystem::new();
        let mut ws = workspace(&fs);
        assert!(
            ws.notify_file_changed("nope", &Fingerprint::from_hex("00"))
                .is_err()
        );
    }

    #[test]
    fn retry_after_lost_race_keeps_both_edits() {
        let (racing, mut ws, id) = racing_workspace(1, 3);

        let mine = ws
            .with_retry(&id, |p| p.graph.insert_task("Mine", None, Attach::TopLevel))
            .unwrap();

        assert_eq!(racing.races(), 1);
        let snapshot = ws.project(&id).unwrap().snapshot().unwrap();
        assert_eq!(snapshot.graph.len(), 2);
        let names: Vec<String> = snapshot
            .graph
            .tasks()
            .iter()
            .map(|t| snapshot.graph.metadata(t).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["Concurrent 1", "Mine"]);
        assert!(snapshot.graph.contains(&mine));
    }

    #[test]
    fn stale_surfaces_after_configured_attempts() {
        let (racing, mut ws, id) = racing_workspace(usize::MAX, 3);

        let err = ws
            .with_retry(&id, |p| p.graph.insert_task("Mine", None, Attach::TopLevel))
            .unwrap_err();

        assert!(matches!(err, TaskgraphError::StaleProject(ref p) if *p == id));
        assert_eq!(racing.races(), 3);

        // Only the other writer's edits landed.
        let snapshot = ws.project(&id).unwrap().snapshot().unwrap();
        assert_eq!(snapshot.graph.len(), 3);
    }

    #[test]
    fn projects_created_elsewhere_are_reachable() {
        let fs = MockFileSystem::new();
        let mut mine = workspace(&fs);
        let mut theirs = workspace(&fs);

        let id = theirs.create_project("Theirs").unwrap();
        assert!(mine.project(&id).is_ok());

        let local = mine.create_project("Mine").unwrap();
        let ids: Vec<ProjectId> = workspace(&fs)
            .index()
            .list()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![id, local]);
    }
}
