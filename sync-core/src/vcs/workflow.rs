//! The Git Workflow state machine (spec.md §4.G): per module, drive the
//! destination working tree from `[opened]` through `[on-default]` →
//! `[on-feature]` → `[staged]` → `[committed]`/`[clean]` → `[pushed]`.
//! Adapted from the teacher's `vcs::branches`/`vcs::commits`/`vcs::remotes`,
//! which operate on `Repository::discover(".")`; here every step takes an
//! explicit `&Repository` so the engine can drive a caller-supplied
//! destination path instead of the process's current directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::build::CheckoutBuilder;
use git2::{BranchType, Cred, Oid, PushOptions, RemoteCallbacks, Repository, RepositoryState, Signature};

use crate::error::{SyncError, SyncErrorKind, SyncResult};
use crate::patch;
use crate::report;
use crate::vcs::credentials;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// The feature branch's working tree had no staging-area changes after
    /// the copy and patch steps; nothing was committed or pushed.
    Clean { branch: String },
    Pushed { branch: String, commit: Oid },
}

fn git_error(kind: SyncErrorKind, context: &str, err: git2::Error) -> SyncError {
    SyncError::from_git(kind, context, err)
}

/// `opened → on-default`. Materialises a local ref from the remote tracking
/// branch when only that exists (detached-HEAD CI checkouts), then
/// force-checks-out the default branch.
fn checkout_default_branch(repo: &Repository, default_branch: &str, remote_name: &str) -> SyncResult<()> {
    if repo.find_branch(default_branch, BranchType::Local).is_err() {
        let tracking_name = format!("refs/remotes/{remote_name}/{default_branch}");
        let tracking_ref = repo.find_reference(&tracking_name).map_err(|err| {
            git_error(
                SyncErrorKind::GitOperationFailed,
                &format!("default branch `{default_branch}` has no local or remote-tracking ref"),
                err,
            )
        })?;
        let commit = tracking_ref.peel_to_commit().map_err(|err| {
            git_error(SyncErrorKind::GitOperationFailed, "resolving remote-tracking commit", err)
        })?;
        repo.branch(default_branch, &commit, false).map_err(|err| {
            git_error(SyncErrorKind::GitOperationFailed, "materialising local default branch", err)
        })?;
    }

    repo.set_head(&format!("refs/heads/{default_branch}"))
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "setting HEAD to default branch", err))?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_head(Some(&mut checkout))
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "checking out default branch", err))
}

/// `on-default → on-feature`. Reuses the remote-tracking ref if this module
/// was synced before (idempotency path); otherwise branches from HEAD.
fn checkout_feature_branch(repo: &Repository, feature: &str, remote_name: &str) -> SyncResult<()> {
    let tracking_name = format!("refs/remotes/{remote_name}/{feature}");

    if let Ok(tracking_ref) = repo.find_reference(&tracking_name) {
        let commit = tracking_ref.peel_to_commit().map_err(|err| {
            git_error(SyncErrorKind::GitOperationFailed, "resolving prior feature branch commit", err)
        })?;
        match repo.find_branch(feature, BranchType::Local) {
            Ok(branch) => {
                let mut reference = branch.into_reference();
                reference
                    .set_target(commit.id(), "sync: reuse prior feature branch")
                    .map_err(|err| {
                        git_error(SyncErrorKind::GitOperationFailed, "resetting local feature branch", err)
                    })?;
            }
            Err(_) => {
                repo.branch(feature, &commit, false).map_err(|err| {
                    git_error(SyncErrorKind::GitOperationFailed, "creating feature branch from remote", err)
                })?;
            }
        }
    } else if repo.find_branch(feature, BranchType::Local).is_err() {
        let head_commit = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "resolving HEAD commit", err))?;
        repo.branch(feature, &head_commit, false)
            .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "creating new feature branch", err))?;
    }

    repo.set_head(&format!("refs/heads/{feature}"))
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "setting HEAD to feature branch", err))?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_head(Some(&mut checkout))
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "checking out feature branch", err))
}

/// Recursively copy `src` into `dst`, overwriting files in place. Split
/// across up to `width` threads at the top level (spec.md §5's "recursive
/// copy uses the same W as a worker count").
fn copy_tree_parallel(src: &Path, dst: &Path, width: usize) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    let entries: Vec<PathBuf> = std::fs::read_dir(src)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();

    let width = width.max(1).min(entries.len().max(1));
    let chunks: Vec<&[PathBuf]> = if entries.is_empty() {
        Vec::new()
    } else {
        entries.chunks(entries.len().div_ceil(width)).collect()
    };

    std::thread::scope(|scope| -> std::io::Result<()> {
        let mut handles = Vec::new();
        for chunk in chunks {
            let dst = dst.to_path_buf();
            handles.push(scope.spawn(move || -> std::io::Result<()> {
                for path in chunk {
                    let name = path.file_name().expect("entry has a file name");
                    let target = dst.join(name);
                    if path.is_dir() {
                        copy_dir_recursive_single_threaded(path, &target)?;
                    } else {
                        if let Some(parent) = target.parent() {
                            std::fs::create_dir_all(parent)?;
                        }
                        std::fs::copy(path, &target)?;
                    }
                }
                Ok(())
            }));
        }
        for handle in handles {
            handle.join().expect("copy worker panicked")?;
        }
        Ok(())
    })
}

fn copy_dir_recursive_single_threaded(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        if path.is_dir() {
            copy_dir_recursive_single_threaded(&path, &target)?;
        } else {
            std::fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

fn git_add_all(repo_root: &Path) -> SyncResult<()> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .arg("add")
        .arg("-A")
        .output()
        .map_err(|err| SyncError::from_io(SyncErrorKind::GitOperationFailed, "spawning git add -A", err))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SyncError::new(
            SyncErrorKind::GitOperationFailed,
            format!("git add -A failed: {}", stderr.trim()),
        ));
    }
    Ok(())
}

/// `staged → committed | clean`. Diffs the index against HEAD's tree; an
/// empty diff means nothing to commit.
fn index_has_staged_changes(repo: &Repository) -> SyncResult<bool> {
    let head_tree = repo
        .head()
        .and_then(|h| h.peel_to_tree())
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "resolving HEAD tree", err))?;
    let diff = repo
        .diff_tree_to_index(Some(&head_tree), None, None)
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "diffing index against HEAD", err))?;
    Ok(diff.deltas().len() > 0)
}

fn commit_staged(
    repo: &Repository,
    message: &str,
    author_name: &str,
    author_email: &str,
) -> SyncResult<Oid> {
    let mut index = repo
        .index()
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "opening index", err))?;
    let tree_id = index
        .write_tree()
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "writing tree from index", err))?;
    let tree = repo
        .find_tree(tree_id)
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "reading written tree", err))?;

    let signature = Signature::now(author_name, author_email)
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "building commit signature", err))?;
    let parent = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "resolving parent commit", err))?;

    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "creating commit", err))
}

/// `committed → pushed`. Basic-auth with the PAT when configured, otherwise
/// the ambient credential cascade from [`credentials`].
fn push_branch(repo: &Repository, remote_name: &str, feature: &str, pat: Option<&str>) -> SyncResult<()> {
    if repo.state() != RepositoryState::Clean {
        return Err(SyncError::new(
            SyncErrorKind::PushFailed,
            "repository has pending operations (merge/rebase/etc); refusing to push",
        ));
    }

    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|err| git_error(SyncErrorKind::PushFailed, "locating remote", err))?;

    let mut callbacks = RemoteCallbacks::new();
    let config = repo.config().ok().map(std::rc::Rc::new);
    let pat = pat.map(|p| p.to_string());
    callbacks.credentials(move |url, username_from_url, allowed_types| {
        if let Some(token) = pat.as_deref() {
            return Cred::userpass_plaintext("x-access-token", token);
        }
        credentials::resolve_credentials(url, username_from_url, allowed_types, config.as_ref())
            .map_err(|message| git2::Error::from_str(&message))
    });

    let mut push_opts = PushOptions::new();
    push_opts.remote_callbacks(callbacks);

    let refspec = format!("refs/heads/{feature}:refs/heads/{feature}");
    remote
        .push(&[refspec.as_str()], Some(&mut push_opts))
        .map_err(|err| git_error(SyncErrorKind::PushFailed, "pushing feature branch", err))?;

    Ok(())
}

/// Drives one module through the full state machine. `staged_module_path`
/// is the Fetch Pool's staged tree for this module; `child_path` is the
/// optional subpath inside the destination repo under which modules live.
#[allow(clippy::too_many_arguments)]
pub fn run_git_workflow(
    destination_root: &Path,
    staged_module_path: &Path,
    transformed_name: &str,
    upstream_url: &str,
    child_path: Option<&str>,
    author_name: &str,
    author_email: &str,
    remote_name: &str,
    default_branch: &str,
    pat: Option<&str>,
    copy_width: usize,
    scope: &str,
) -> SyncResult<WorkflowOutcome> {
    let _ = upstream_url; // used by the PR Submitter, carried for call-site symmetry
    let repo = Repository::open(destination_root)
        .map_err(|err| git_error(SyncErrorKind::GitOperationFailed, "opening destination repository", err))?;

    checkout_default_branch(&repo, default_branch, remote_name)?;
    report::debug(scope, format!("{transformed_name}: on default branch `{default_branch}`"));

    let feature = format!("feat/avm-module-sync/{transformed_name}");
    checkout_feature_branch(&repo, &feature, remote_name)?;
    report::debug(scope, format!("{transformed_name}: on feature branch `{feature}`"));

    let dest_subtree = match child_path {
        Some(child) if !child.is_empty() => destination_root.join(child).join(transformed_name),
        _ => destination_root.join(transformed_name),
    };
    copy_tree_parallel(staged_module_path, &dest_subtree, copy_width)
        .map_err(|err| SyncError::from_io(SyncErrorKind::FilesystemError, "copying staged tree into destination", err))?;

    let patches = patch::discover_patches(&dest_subtree)?;
    patch::apply_patches(destination_root, &patches, scope)?;

    git_add_all(destination_root)?;

    if !index_has_staged_changes(&repo)? {
        report::info(scope, format!("{transformed_name}: clean, nothing to commit"));
        return Ok(WorkflowOutcome::Clean { branch: feature });
    }

    let message = format!("feat(module): Synced AVM module {transformed_name}");
    let commit = commit_staged(&repo, &message, author_name, author_email)?;
    report::info(scope, format!("{transformed_name}: committed {commit}"));

    push_branch(&repo, remote_name, &feature, pat)?;
    report::info(scope, format!("{transformed_name}: pushed {feature} to {remote_name}"));

    Ok(WorkflowOutcome::Pushed { branch: feature, commit })
}
