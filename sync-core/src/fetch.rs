use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::catalogue::{Category, ModuleCapabilities};
use crate::report;
use crate::transform::transform_name;
use crate::workspace::{self, WorkspaceManager};

/// Outcome of fetching a single module. `staged_path` is `None` when the
/// clone or the rename into the transformed name failed — later stages skip
/// this module because its transformed path will not exist (spec.md §4.E).
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub upstream_name: String,
    pub transformed_name: String,
    pub staged_path: Option<PathBuf>,
}

fn fetch_one_blocking(
    url: &str,
    upstream_path: &std::path::Path,
    transformed_path: &std::path::Path,
    name: &str,
    scope: &str,
) -> bool {
    // Reject an obviously malformed `RepoURL` before handing it to git2;
    // a bad URL is a clone failure like any other (spec.md §4.E step 4) and
    // must not block other modules in the batch.
    if url::Url::parse(url).is_err() {
        report::warn(scope, format!("{name}: repo URL `{url}` is not a valid URL"));
        return false;
    }

    if upstream_path.exists() {
        report::info(scope, format!("{name}: reusing prior partial staging tree"));
    } else {
        report::debug(scope, format!("{name}: cloning {url}"));
        if let Err(err) = git2::Repository::clone(url, upstream_path) {
            report::warn(scope, format!("{name}: clone failed: {err}"));
            return false;
        }
    }

    workspace::strip_vcs_metadata(upstream_path);

    match workspace::rename_staged_tree(upstream_path, transformed_path) {
        Ok(()) => {
            report::info(
                scope,
                format!("{name}: staged at {}", transformed_path.display()),
            );
            true
        }
        Err(err) => {
            report::warn(
                scope,
                format!("{name}: failed to rename staged tree: {err}"),
            );
            false
        }
    }
}

async fn process_one<T: ModuleCapabilities>(
    module: &T,
    category: Category,
    workspace: &WorkspaceManager,
) -> FetchOutcome {
    let name = module.name().to_string();
    let url = module.repo_url().to_string();
    let transformed_name = transform_name(category, &name);
    let upstream_path = workspace.upstream_staging_path(&name);
    let transformed_path = workspace.transformed_staging_path(&transformed_name);
    let scope = category.label().to_string();

    let upstream_path_for_blocking = upstream_path.clone();
    let transformed_path_for_blocking = transformed_path.clone();
    let name_for_blocking = name.clone();

    let succeeded = tokio::task::spawn_blocking(move || {
        fetch_one_blocking(
            &url,
            &upstream_path_for_blocking,
            &transformed_path_for_blocking,
            &name_for_blocking,
            &scope,
        )
    })
    .await
    .unwrap_or(false);

    FetchOutcome {
        upstream_name: name,
        transformed_name,
        staged_path: succeeded.then_some(transformed_path),
    }
}

/// Bounded-parallelism worker pool: a single producer feeds `width`
/// long-running workers over a rendezvous channel (spec.md §4.E, §5). The
/// caller blocks (awaits) until every worker has drained the channel.
pub async fn run_fetch_pool<T>(
    modules: Vec<T>,
    category: Category,
    workspace: Arc<WorkspaceManager>,
    width: usize,
) -> Vec<FetchOutcome>
where
    T: ModuleCapabilities + Clone + Send + 'static,
{
    if let Err(err) = workspace.ensure_staging_root() {
        report::warn(
            category.label(),
            format!("failed to create staging root: {err}"),
        );
    }

    let width = width.max(1);
    let (tx, rx) = mpsc::channel::<T>(width);
    let rx = Arc::new(AsyncMutex::new(rx));

    let producer = tokio::spawn(async move {
        for module in modules {
            if tx.send(module).await.is_err() {
                break;
            }
        }
        // Dropping `tx` here closes the channel, draining the workers.
    });

    let mut workers = Vec::with_capacity(width);
    for _ in 0..width {
        let rx = Arc::clone(&rx);
        let workspace = Arc::clone(&workspace);
        workers.push(tokio::spawn(async move {
            let mut out = Vec::new();
            loop {
                let next = {
                    let mut guard = rx.lock().await;
                    guard.recv().await
                };
                match next {
                    Some(module) => {
                        out.push(process_one(&module, category, &workspace).await);
                    }
                    None => break,
                }
            }
            out
        }));
    }

    let _ = producer.await;

    let mut outcomes = Vec::new();
    for worker in workers {
        if let Ok(mut batch) = worker.await {
            outcomes.append(&mut batch);
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{CommonFields, ResourceModule};
    use std::fs;

    fn local_repo_module(name: &str, src_repo: &std::path::Path) -> ResourceModule {
        ResourceModule {
            common: CommonFields {
                module_name: name.to_string(),
                repo_url: format!("file://{}", src_repo.display()),
                module_status: "Available".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn init_upstream_repo(dir: &std::path::Path) {
        let repo = git2::Repository::init(dir).unwrap();
        fs::write(dir.join("main.bicep"), "// module body\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(std::path::Path::new("main.bicep")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Tester", "tester@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
    }

    #[tokio::test]
    async fn fetch_pool_stages_under_transformed_name_without_git_metadata() {
        let upstream_dir = tempfile::tempdir().unwrap();
        init_upstream_repo(upstream_dir.path());

        let staging_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let workspace = Arc::new(WorkspaceManager::new(staging_dir.path(), dest_dir.path()));

        let modules = vec![local_repo_module(
            "avm-res-storage-account",
            upstream_dir.path(),
        )];

        let outcomes = run_fetch_pool(modules, Category::Resource, workspace, 2).await;

        assert_eq!(outcomes.len(), 1);
        let outcome = &outcomes[0];
        assert_eq!(outcome.transformed_name, "rvm-res-azurerm-storage-account");
        let staged = outcome.staged_path.as_ref().expect("staged path present");
        assert!(staged.ends_with("rvm-res-azurerm-storage-account"));
        assert!(staged.join("main.bicep").exists());
        assert!(!staged.join(".git").exists());
    }

    #[tokio::test]
    async fn failed_clone_does_not_block_other_modules() {
        let upstream_dir = tempfile::tempdir().unwrap();
        init_upstream_repo(upstream_dir.path());

        let staging_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let workspace = Arc::new(WorkspaceManager::new(staging_dir.path(), dest_dir.path()));

        let broken = ResourceModule {
            common: CommonFields {
                module_name: "avm-res-broken".to_string(),
                repo_url: "file:///no/such/path/on/disk".to_string(),
                module_status: "Available".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let good = local_repo_module("avm-res-storage-account", upstream_dir.path());

        let outcomes = run_fetch_pool(vec![broken, good], Category::Resource, workspace, 2).await;

        assert_eq!(outcomes.len(), 2);
        let broken_outcome = outcomes
            .iter()
            .find(|o| o.upstream_name == "avm-res-broken")
            .unwrap();
        assert!(broken_outcome.staged_path.is_none());
        let good_outcome = outcomes
            .iter()
            .find(|o| o.upstream_name == "avm-res-storage-account")
            .unwrap();
        assert!(good_outcome.staged_path.is_some());
    }

    #[tokio::test]
    async fn malformed_repo_url_is_treated_as_a_clone_failure() {
        let staging_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let workspace = Arc::new(WorkspaceManager::new(staging_dir.path(), dest_dir.path()));

        let malformed = ResourceModule {
            common: CommonFields {
                module_name: "avm-res-malformed".to_string(),
                repo_url: "not a url".to_string(),
                module_status: "Available".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let outcomes = run_fetch_pool(vec![malformed], Category::Resource, workspace, 2).await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].staged_path.is_none());
    }
}
