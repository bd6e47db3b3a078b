//! Orchestrator (spec.md §4.I): for each enabled category, in turn,
//! load → filter → batch(W) → fetch → sequential(git-workflow + PR).

use std::sync::Arc;

use crate::catalogue::{self, Category, CatalogueSource, ModuleCapabilities};
use crate::config::EngineConfig;
use crate::error::{SyncError, SyncErrorKind, SyncResult};
use crate::fetch::{self, FetchOutcome};
use crate::filter::{self, FilterSets};
use crate::pr::{self, PullRequestRequest};
use crate::report;
use crate::transform::transform_name;
use crate::vcs::{self, WorkflowOutcome};
use crate::workspace::WorkspaceManager;

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub category: Option<&'static str>,
    pub seen: usize,
    pub filtered_in: usize,
    pub filtered_out: usize,
    pub fetch_failures: usize,
    pub prs_created: usize,
    pub prs_skipped_clean: usize,
    pub errors: usize,
}

impl RunSummary {
    fn for_category(category: Category) -> Self {
        Self {
            category: Some(category.label()),
            ..Default::default()
        }
    }
}

async fn run_category<T>(
    category: Category,
    modules: SyncResult<Vec<T>>,
    sets: &FilterSets,
    workspace: Arc<WorkspaceManager>,
    config: &EngineConfig,
) -> RunSummary
where
    T: ModuleCapabilities + Clone + Send + 'static,
{
    let mut summary = RunSummary::for_category(category);
    let scope = category.label();

    let modules = match modules {
        Ok(modules) => modules,
        Err(err) => {
            report::error(scope, format!("catalogue load failed: {err}"));
            summary.errors += 1;
            return summary;
        }
    };
    summary.seen = modules.len();

    let kept = filter::filter_modules(modules, sets, scope);
    summary.filtered_in = kept.len();
    summary.filtered_out = summary.seen - summary.filtered_in;

    let outcomes: Vec<FetchOutcome> =
        fetch::run_fetch_pool(kept.clone(), category, Arc::clone(&workspace), config.fetch_pool_width).await;
    summary.fetch_failures = outcomes.iter().filter(|o| o.staged_path.is_none()).count();

    // The Fetch Pool's worker pool does not preserve input order across its
    // concurrent workers, so outcomes are matched back to modules by name
    // rather than by position (spec.md §5 only orders the Git Workflow
    // phase, not the fetch phase).
    let mut outcomes_by_name: std::collections::HashMap<String, FetchOutcome> = outcomes
        .into_iter()
        .map(|outcome| (outcome.upstream_name.clone(), outcome))
        .collect();

    let staged: Vec<(T, FetchOutcome)> = kept
        .into_iter()
        .filter_map(|module| {
            let outcome = outcomes_by_name.remove(module.name())?;
            outcome.staged_path.is_some().then_some((module, outcome))
        })
        .collect();

    for (module, outcome) in staged {
        let staged_path = outcome.staged_path.expect("filtered for Some above");
        let transformed_name = transform_name(category, module.name());
        debug_assert_eq!(transformed_name, outcome.transformed_name);

        let workflow_result = vcs::run_git_workflow(
            &config.source_repo_path,
            &staged_path,
            &transformed_name,
            module.repo_url(),
            config.module_sync_source_repo_child_path.as_deref(),
            &config.module_sync_author_name,
            &config.module_sync_author_email,
            "origin",
            "main",
            config.ado_pat.as_deref(),
            config.fetch_pool_width,
            scope,
        );

        let workflow_result = match workflow_result {
            Ok(outcome) => outcome,
            Err(err) => {
                report::error(scope, format!("{transformed_name}: git workflow failed: {err}"));
                summary.errors += 1;
                continue;
            }
        };

        match workflow_result {
            WorkflowOutcome::Clean { .. } => {
                summary.prs_skipped_clean += 1;
            }
            WorkflowOutcome::Pushed { branch, .. } => {
                let session_token = match config.token_source.token() {
                    Ok(token) => token,
                    Err(err) => {
                        report::error(scope, format!("{transformed_name}: acquiring PR API token failed: {err}"));
                        summary.errors += 1;
                        continue;
                    }
                };

                let request = PullRequestRequest {
                    organization: config.ado_organization.clone(),
                    project: config.ado_project.clone(),
                    repo_id: config.ado_repo_id,
                    source_ref: format!("refs/heads/{branch}"),
                    target_ref: "refs/heads/main".to_string(),
                    title: format!("feat(module): Synced AVM module {transformed_name}"),
                    description: format!("Synced from {}", module.repo_url()),
                };

                match pr::submit_pull_request(request, session_token).await {
                    Ok(result) => {
                        report::info(scope, format!("{transformed_name}: PR created at {}", result.url));
                        summary.prs_created += 1;
                    }
                    Err(err) => {
                        report::error(scope, format!("{transformed_name}: PR submission failed: {err}"));
                        summary.errors += 1;
                    }
                }
            }
        }
    }

    summary
}

/// Drives every enabled category sequentially, per spec.md §4.I — categories
/// never overlap so the single destination working tree always has one
/// writer.
///
/// Per spec.md §6/§7, failure to open the destination repository is
/// startup-fatal and distinct from the per-module `GitOperationFailed`
/// errors the Git Workflow raises later for each module: it is checked once,
/// up front, before any category is processed, and surfaces as `Err` rather
/// than folding into a `RunSummary`.
pub async fn run(config: &EngineConfig) -> SyncResult<Vec<RunSummary>> {
    let workspace = Arc::new(WorkspaceManager::new(
        config.temp_avm_module_repo_path.clone(),
        config.source_repo_path.clone(),
    ));
    if config.cleanup_temp_dirs {
        workspace.cleanup();
    }
    if config.pull_remote_repo {
        report::info(
            "orchestrator",
            "pull-remote-repo set; re-cloning/pulling the destination working tree is the caller's responsibility, not this engine's (spec.md §9 Open Question ii)",
        );
    }

    open_destination_repo(&config.source_repo_path)?;

    let sets = FilterSets::new(
        config.allowed_statuses.clone(),
        config.inclusion_override.clone(),
        config.exclusion_list.clone(),
    );

    let mut summaries = Vec::new();

    if config.process_resource {
        let source = resource_source(config);
        let modules = catalogue::load_resource_catalogue(source);
        summaries.push(run_category(Category::Resource, modules, &sets, Arc::clone(&workspace), config).await);
    }
    if config.process_pattern {
        let source = pattern_source(config);
        let modules = catalogue::load_pattern_catalogue(source);
        summaries.push(run_category(Category::Pattern, modules, &sets, Arc::clone(&workspace), config).await);
    }
    if config.process_utility {
        let source = utility_source(config);
        let modules = catalogue::load_utility_catalogue(source);
        summaries.push(run_category(Category::Utility, modules, &sets, Arc::clone(&workspace), config).await);
    }

    Ok(summaries)
}

/// Startup-fatal check (spec.md §6/§7): the destination working tree must
/// already exist and be a git repository before any category runs. A later
/// per-module open failure inside the Git Workflow is a different, routine
/// per-module error and does not go through this path.
fn open_destination_repo(destination_root: &std::path::Path) -> SyncResult<()> {
    git2::Repository::open(destination_root).map_err(|err| {
        SyncError::from_git(
            SyncErrorKind::GitOperationFailed,
            "opening destination repository at startup",
            err,
        )
    })?;
    Ok(())
}

fn resource_source(config: &EngineConfig) -> CatalogueSource<'_> {
    if config.read_local_csv {
        CatalogueSource::Local(
            config
                .local_resource_csv_path
                .as_deref()
                .expect("validated by EngineConfig::build"),
        )
    } else {
        CatalogueSource::Remote(Category::Resource.default_url())
    }
}

fn pattern_source(config: &EngineConfig) -> CatalogueSource<'_> {
    if config.read_local_csv {
        CatalogueSource::Local(
            config
                .local_pattern_csv_path
                .as_deref()
                .expect("validated by EngineConfig::build"),
        )
    } else {
        CatalogueSource::Remote(Category::Pattern.default_url())
    }
}

fn utility_source(config: &EngineConfig) -> CatalogueSource<'_> {
    if config.read_local_csv {
        CatalogueSource::Local(
            config
                .local_utility_csv_path
                .as_deref()
                .expect("validated by EngineConfig::build"),
        )
    } else {
        CatalogueSource::Remote(Category::Utility.default_url())
    }
}
