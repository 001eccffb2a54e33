//! Path-addressed access to the data directory.
//!
//! A [`ResourceTree`] wraps the root directory; [`Resource`] is a cheap
//! handle to a slash-separated path under it. Handles are valid whether or
//! not anything exists on disk yet, so callers can compute paths first and
//! probe afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::DataDirError;

/// What a path currently resolves to on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKindOnDisk {
    File,
    Directory,
    /// Nothing exists at the path (yet).
    Missing,
}

/// Root of the on-disk configuration tree.
#[derive(Debug, Clone)]
pub struct ResourceTree {
    root: PathBuf,
}

impl ResourceTree {
    /// Open a tree rooted at `root`. Fails fast when the root is missing or
    /// not a directory; everything downstream assumes plain filesystem
    /// access.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, DataDirError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DataDirError::NotADirectory(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle to `path` (slash-separated, relative to the root). An empty
    /// path addresses the root itself.
    pub fn get(&self, path: &str) -> Resource {
        let mut full = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            full.push(segment);
        }
        Resource {
            path: path.trim_matches('/').to_string(),
            full,
        }
    }

    /// Move whatever is at `from` (file or directory, recursively) to `to`,
    /// creating `to`'s parent directories. Moving a missing source is a
    /// no-op.
    pub fn move_resource(&self, from: &str, to: &str) -> Result<(), DataDirError> {
        let src = self.get(from);
        if !src.exists() {
            return Ok(());
        }
        let dst = self.get(to);
        if let Some(parent) = dst.full.parent() {
            fs::create_dir_all(parent)?;
        }
        trace!("moving {} -> {}", src.path, dst.path);
        fs::rename(&src.full, &dst.full)?;
        Ok(())
    }

    /// Delete whatever is at `path` (recursively for directories). Removing
    /// a missing path is a no-op.
    pub fn remove(&self, path: &str) -> Result<(), DataDirError> {
        let res = self.get(path);
        match res.kind() {
            ResourceKindOnDisk::File => fs::remove_file(&res.full)?,
            ResourceKindOnDisk::Directory => fs::remove_dir_all(&res.full)?,
            ResourceKindOnDisk::Missing => {}
        }
        Ok(())
    }
}

/// Handle to one path in the tree.
#[derive(Debug, Clone)]
pub struct Resource {
    path: String,
    full: PathBuf,
}

impl Resource {
    /// Final path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// Slash-separated path relative to the tree root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Absolute location on disk.
    pub fn file(&self) -> &Path {
        &self.full
    }

    pub fn exists(&self) -> bool {
        self.full.exists()
    }

    pub fn kind(&self) -> ResourceKindOnDisk {
        match fs::metadata(&self.full) {
            Ok(m) if m.is_dir() => ResourceKindOnDisk::Directory,
            Ok(_) => ResourceKindOnDisk::File,
            Err(_) => ResourceKindOnDisk::Missing,
        }
    }

    /// Handle to a child path, without touching the disk.
    pub fn child(&self, name: &str) -> Resource {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.path)
        };
        Resource {
            path,
            full: self.full.join(name),
        }
    }

    /// Child resources of a directory, sorted by name for deterministic
    /// traversal. A file or missing path has no children.
    pub fn list(&self) -> Result<Vec<Resource>, DataDirError> {
        if self.kind() != ResourceKindOnDisk::Directory {
            return Ok(Vec::new());
        }
        let mut children = Vec::new();
        for entry in fs::read_dir(&self.full)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                children.push(self.child(name));
            }
        }
        children.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(children)
    }

    pub fn read(&self) -> Result<Vec<u8>, DataDirError> {
        Ok(fs::read(&self.full)?)
    }

    /// Write the full contents, creating parent directories as needed.
    pub fn write(&self, contents: &[u8]) -> Result<(), DataDirError> {
        if let Some(parent) = self.full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.full, contents)?;
        Ok(())
    }

    /// Ensure the path exists as a directory.
    pub fn mkdirs(&self) -> Result<(), DataDirError> {
        fs::create_dir_all(&self.full)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_rejects_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            ResourceTree::open(&missing),
            Err(DataDirError::NotADirectory(_))
        ));
    }

    #[test]
    fn write_creates_parents_and_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();

        let res = tree.get("workspaces/topp/workspace.xml");
        assert_eq!(res.kind(), ResourceKindOnDisk::Missing);
        res.write(b"hello").unwrap();
        assert_eq!(res.kind(), ResourceKindOnDisk::File);
        assert_eq!(res.read().unwrap(), b"hello");
        assert_eq!(res.name(), "workspace.xml");
    }

    #[test]
    fn list_is_sorted_and_empty_for_files() {
        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        tree.get("styles/b.xml").write(b"b").unwrap();
        tree.get("styles/a.xml").write(b"a").unwrap();

        let names: Vec<String> = tree
            .get("styles")
            .list()
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a.xml", "b.xml"]);
        assert!(tree.get("styles/a.xml").list().unwrap().is_empty());
    }

    #[test]
    fn move_and_remove_directories() {
        let dir = TempDir::new().unwrap();
        let tree = ResourceTree::open(dir.path()).unwrap();
        tree.get("workspaces/old/ds/featuretype.xml").write(b"x").unwrap();

        tree.move_resource("workspaces/old", "workspaces/new").unwrap();
        assert!(!tree.get("workspaces/old").exists());
        assert!(tree.get("workspaces/new/ds/featuretype.xml").exists());

        tree.remove("workspaces/new").unwrap();
        assert!(!tree.get("workspaces/new").exists());

        // both are no-ops on missing paths
        tree.move_resource("workspaces/ghost", "elsewhere").unwrap();
        tree.remove("workspaces/ghost").unwrap();
    }
}
