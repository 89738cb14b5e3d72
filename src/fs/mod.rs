// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface used by the persistence layer.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    /// Create or truncate `path`, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    /// Atomically replace `to` with `from`.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;

    /// Write to a sibling temporary file, then rename it over `path`, so a
    /// reader never observes a half-written document.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let tmp = temp_path_for(path);
        self.write(&tmp, contents)?;
        if let Err(e) = self.rename(&tmp, path) {
            let _ = self.remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }
}

/// Unique sibling path used as the staging file for [`FileSystem::write_atomic`].
pub fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.{}.tmp", crate::types::new_id()))
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents).with_context(|| format!("writing to file {:?}", path))?;
        file.sync_all().with_context(|| format!("syncing file {:?}", path))?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).with_context(|| format!("renaming {:?} to {:?}", from, to))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("removing file {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockFileSystem;
    use super::*;
    use anyhow::bail;

    /// Delegates everything except `rename`, which always fails.
    #[derive(Debug, Default)]
    struct NoRenameFileSystem(MockFileSystem);

    impl FileSystem for NoRenameFileSystem {
        fn read(&self, path: &Path) -> Result<Vec<u8>> {
            self.0.read(path)
        }

        fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
            self.0.write(path, contents)
        }

        fn rename(&self, from: &Path, _to: &Path) -> Result<()> {
            bail!("rename of {:?} refused", from)
        }

        fn remove_file(&self, path: &Path) -> Result<()> {
            self.0.remove_file(path)
        }

        fn exists(&self, path: &Path) -> bool {
            self.0.exists(path)
        }
    }

    #[test]
    fn failed_rename_leaves_no_staging_file() {
        let fs = NoRenameFileSystem::default();
        fs.0.add_file("data/projects.json", "old");

        assert!(fs.write_atomic(Path::new("data/projects.json"), b"new").is_err());

        assert_eq!(fs.0.paths(), vec![PathBuf::from("data/projects.json")]);
        assert_eq!(fs.0.contents("data/projects.json").as_deref(), Some("old"));
    }

    #[test]
    fn temp_path_is_a_hidden_sibling() {
        let tmp = temp_path_for(Path::new("data/projects/p1.json"));
        assert_eq!(tmp.parent(), Some(Path::new("data/projects")));
        let name = tmp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".p1.json."));
        assert!(name.ends_with(".tmp"));
    }
}
