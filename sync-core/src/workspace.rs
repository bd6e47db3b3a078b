use std::path::{Path, PathBuf};

use crate::report;

/// Provisions and cleans per-run staging directories; moves and renames
/// trees. Filesystem errors here are logged but non-fatal to the enclosing
/// batch (spec.md §4.D) — callers treat a failed rename as "this module's
/// staged tree doesn't exist", not as a fatal error.
pub struct WorkspaceManager {
    staging_root: PathBuf,
    destination_root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(staging_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
            destination_root: destination_root.into(),
        }
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Purge staging and destination roots at startup, gated by
    /// `cleanup-temp-dirs`. Destination root is recreated empty only if it
    /// didn't already exist as a git checkout — callers only set `cleanup`
    /// when they intend the destination to be re-cloned by the environment.
    pub fn cleanup(&self) {
        for root in [&self.staging_root, &self.destination_root] {
            if root.exists() {
                if let Err(err) = std::fs::remove_dir_all(root) {
                    report::warn("workspace", format!("failed to purge {}: {err}", root.display()));
                }
            }
        }
    }

    pub fn ensure_staging_root(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.staging_root)
    }

    /// Path a module of `category`/`upstream_name` would be staged at before
    /// renaming to its transformed name.
    pub fn upstream_staging_path(&self, upstream_name: &str) -> PathBuf {
        self.staging_root.join(upstream_name)
    }

    /// Path a module is staged at once keyed by its transformed name.
    pub fn transformed_staging_path(&self, transformed_name: &str) -> PathBuf {
        self.staging_root.join(transformed_name)
    }
}

/// Recursively remove any `.git` entry under `path`. Non-fatal: logs and
/// continues on error.
pub fn strip_vcs_metadata(path: &Path) {
    let git_dir = path.join(".git");
    if !git_dir.exists() {
        return;
    }
    if let Err(err) = remove_path(&git_dir) {
        report::warn(
            "workspace",
            format!("failed to strip .git from {}: {err}", path.display()),
        );
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Rename a staging subtree from its upstream-named path to its
/// transformed-named path, removing any pre-existing tree at the
/// destination first. No-op when source and destination coincide.
pub fn rename_staged_tree(from: &Path, to: &Path) -> std::io::Result<()> {
    if from == to {
        return Ok(());
    }
    if to.exists() {
        remove_path(to)?;
    }
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn rename_is_noop_when_paths_coincide() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("a.txt"), "x").unwrap();
        rename_staged_tree(&path, &path).unwrap();
        assert!(path.join("a.txt").exists());
    }

    #[test]
    fn rename_overwrites_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("upstream-name");
        let to = dir.path().join("transformed-name");
        fs::create_dir_all(&from).unwrap();
        fs::write(from.join("new.txt"), "new").unwrap();
        fs::create_dir_all(&to).unwrap();
        fs::write(to.join("stale.txt"), "stale").unwrap();

        rename_staged_tree(&from, &to).unwrap();

        assert!(!from.exists());
        assert!(to.join("new.txt").exists());
        assert!(!to.join("stale.txt").exists());
    }

    #[test]
    fn strip_vcs_metadata_removes_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        fs::create_dir_all(&git_dir).unwrap();
        fs::write(git_dir.join("HEAD"), "ref: refs/heads/main").unwrap();

        strip_vcs_metadata(dir.path());

        assert!(!git_dir.exists());
    }

    #[test]
    fn strip_vcs_metadata_is_noop_without_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        strip_vcs_metadata(dir.path());
        assert!(dir.path().exists());
    }
}
