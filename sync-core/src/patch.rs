use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{SyncError, SyncErrorKind, SyncResult};
use crate::report;

/// Locate every `*.patch` file under `module_root/patches`, sorted by full
/// path so application order is deterministic (spec.md §4.F). A missing or
/// empty `patches/` directory is not an error — most modules carry none.
pub fn discover_patches(module_root: &Path) -> SyncResult<Vec<PathBuf>> {
    let patches_dir = module_root.join("patches");
    if !patches_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    collect_patch_files(&patches_dir, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_patch_files(dir: &Path, out: &mut Vec<PathBuf>) -> SyncResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|err| {
        SyncError::from_io(SyncErrorKind::PatchApplyFailed, &format!("reading {}", dir.display()), err)
    })?;
    for entry in entries {
        let entry = entry.map_err(|err| {
            SyncError::from_io(SyncErrorKind::PatchApplyFailed, &format!("reading entry in {}", dir.display()), err)
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_patch_files(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("patch") {
            out.push(path);
        }
    }
    Ok(())
}

/// Apply every discovered patch against `module_root`'s working tree via
/// `git apply --index`, the same invocation the teacher's job runner uses
/// to keep the index in sync with `.gitattributes` EOL normalisation
/// (SPEC_FULL.md "Open Questions"). Stops at the first failing patch.
pub fn apply_patches(module_root: &Path, patches: &[PathBuf], scope: &str) -> SyncResult<()> {
    for patch in patches {
        report::debug(scope, format!("applying patch {}", patch.display()));
        let output = Command::new("git")
            .arg("-C")
            .arg(module_root)
            .arg("apply")
            .arg("--index")
            .arg(patch)
            .output()
            .map_err(|err| {
                SyncError::from_io(
                    SyncErrorKind::PatchApplyFailed,
                    &format!("spawning git apply for {}", patch.display()),
                    err,
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::new(
                SyncErrorKind::PatchApplyFailed,
                format!("git apply {} failed: {}", patch.display(), stderr.trim()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_patches_dir_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let patches = discover_patches(dir.path()).unwrap();
        assert!(patches.is_empty());
    }

    #[test]
    fn empty_patches_dir_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("patches")).unwrap();
        let patches = discover_patches(dir.path()).unwrap();
        assert!(patches.is_empty());
    }

    #[test]
    fn patches_are_sorted_lexicographically_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let patches_dir = dir.path().join("patches");
        fs::create_dir_all(&patches_dir).unwrap();
        fs::write(patches_dir.join("b-second.patch"), "").unwrap();
        fs::write(patches_dir.join("a-first.patch"), "").unwrap();
        fs::write(patches_dir.join("readme.md"), "").unwrap();

        let patches = discover_patches(dir.path()).unwrap();
        let names: Vec<_> = patches
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a-first.patch", "b-second.patch"]);
    }

    #[test]
    fn nested_patch_directories_are_included() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("patches").join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("deep.patch"), "").unwrap();

        let patches = discover_patches(dir.path()).unwrap();
        assert_eq!(patches.len(), 1);
        assert!(patches[0].ends_with("deep.patch"));
    }
}
