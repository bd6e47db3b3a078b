use clap::Parser;

/// Synchronises AVM modules from upstream catalogues into an internal monorepo.
#[derive(Parser, Debug)]
#[command(name = "avm-sync", version, about, propagate_version = true)]
pub struct Cli {
    /// Process the resource-module catalogue
    #[arg(long = "process-resource")]
    pub process_resource: bool,

    /// Process the pattern-module catalogue
    #[arg(long = "process-pattern")]
    pub process_pattern: bool,

    /// Process the utility-module catalogue
    #[arg(long = "process-utility")]
    pub process_utility: bool,

    /// Purge staging and destination roots at startup
    #[arg(long = "cleanup-temp-dirs")]
    pub cleanup_temp_dirs: bool,

    /// Destination service organization
    #[arg(long = "ado-organization")]
    pub ado_organization: Option<String>,

    /// Destination service project
    #[arg(long = "ado-project")]
    pub ado_project: Option<String>,

    /// Destination repository id (UUID)
    #[arg(long = "ado-repo-id")]
    pub ado_repo_id: Option<String>,

    /// Session token for the destination service's REST API
    #[arg(long = "ado-session-token")]
    pub ado_session_token: Option<String>,

    /// Personal access token used for git push authentication
    #[arg(long = "ado-pat")]
    pub ado_pat: Option<String>,

    /// Obtain an API token via ambient cloud identity instead of a session token
    #[arg(long = "use-local-identity")]
    pub use_local_identity: bool,

    /// Commit author name
    #[arg(long = "module-sync-author-name")]
    pub module_sync_author_name: Option<String>,

    /// Commit author email
    #[arg(long = "module-sync-author-email")]
    pub module_sync_author_email: Option<String>,

    /// Optional subpath inside the destination repo under which modules live
    #[arg(long = "module-sync-source-repo-child-path")]
    pub module_sync_source_repo_child_path: Option<String>,

    /// Use local CSV files instead of remote catalogue URLs
    #[arg(long = "read-local-csv")]
    pub read_local_csv: bool,

    /// Local resource catalogue path (with --read-local-csv)
    #[arg(long = "local-resource-csv-path")]
    pub local_resource_csv_path: Option<std::path::PathBuf>,

    /// Local pattern catalogue path (with --read-local-csv)
    #[arg(long = "local-pattern-csv-path")]
    pub local_pattern_csv_path: Option<std::path::PathBuf>,

    /// Local utility catalogue path (with --read-local-csv)
    #[arg(long = "local-utility-csv-path")]
    pub local_utility_csv_path: Option<std::path::PathBuf>,

    /// Reserved: governs whether to (re)clone the destination at startup
    #[arg(long = "pull-remote-repo")]
    pub pull_remote_repo: bool,

    /// Staging root
    #[arg(long = "temp-avm-module-repo-path", default_value = "./avm_modules")]
    pub temp_avm_module_repo_path: std::path::PathBuf,

    /// Destination working tree path
    #[arg(long = "source-repo-path")]
    pub source_repo_path: Option<String>,

    /// Comma-separated status allow-list
    #[arg(long = "allowed-statuses", default_value = "Available")]
    pub allowed_statuses: String,

    /// Comma-separated module names always admitted regardless of status
    #[arg(long = "inclusion-override")]
    pub inclusion_override: Option<String>,

    /// Comma-separated module names always rejected regardless of status or inclusion
    #[arg(long = "exclusion-list")]
    pub exclusion_list: Option<String>,

    /// Verbose logging and clone progress
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_flags_parse_and_carry_over_into_raw_config() {
        let cli = Cli::parse_from([
            "avm-sync",
            "--process-resource",
            "--ado-organization",
            "contoso",
            "--ado-project",
            "platform",
            "--ado-repo-id",
            "00000000-0000-0000-0000-000000000000",
            "--ado-session-token",
            "token",
            "--source-repo-path",
            "/tmp/dest",
        ]);
        assert!(cli.process_resource);
        assert!(!cli.process_pattern);
        assert_eq!(cli.allowed_statuses, "Available");

        let raw: avm_sync_core::RawConfig = cli.into();
        assert!(raw.process_resource);
        assert_eq!(raw.ado_organization.as_deref(), Some("contoso"));
        assert_eq!(raw.source_repo_path.as_deref(), Some("/tmp/dest"));
        assert_eq!(raw.allowed_statuses.as_deref(), Some("Available"));
    }

    #[test]
    fn read_local_csv_carries_configured_paths_into_raw_config() {
        let dir = tempfile::tempdir().unwrap();
        let resource_csv = dir.path().join("resource.csv");
        std::fs::write(&resource_csv, "ModuleName,RepoURL\n").unwrap();

        let cli = Cli::parse_from([
            "avm-sync",
            "--process-resource",
            "--read-local-csv",
            "--local-resource-csv-path",
            resource_csv.to_str().unwrap(),
            "--ado-organization",
            "contoso",
            "--ado-project",
            "platform",
            "--ado-repo-id",
            "00000000-0000-0000-0000-000000000000",
            "--ado-session-token",
            "token",
            "--source-repo-path",
            "/tmp/dest",
        ]);

        let raw: avm_sync_core::RawConfig = cli.into();
        assert!(raw.read_local_csv);
        assert_eq!(raw.local_resource_csv_path, Some(resource_csv));
    }

    #[test]
    fn inclusion_override_and_exclusion_list_carry_into_raw_config() {
        let cli = Cli::parse_from([
            "avm-sync",
            "--process-resource",
            "--ado-organization",
            "contoso",
            "--ado-project",
            "platform",
            "--ado-repo-id",
            "00000000-0000-0000-0000-000000000000",
            "--ado-session-token",
            "token",
            "--source-repo-path",
            "/tmp/dest",
            "--inclusion-override",
            "avm-res-storage-account,avm-res-keyvault",
            "--exclusion-list",
            "avm-res-deprecated-thing",
        ]);

        let raw: avm_sync_core::RawConfig = cli.into();
        assert_eq!(
            raw.inclusion_override.as_deref(),
            Some("avm-res-storage-account,avm-res-keyvault")
        );
        assert_eq!(raw.exclusion_list.as_deref(), Some("avm-res-deprecated-thing"));
    }
}

impl From<Cli> for avm_sync_core::RawConfig {
    fn from(cli: Cli) -> Self {
        avm_sync_core::RawConfig {
            process_resource: cli.process_resource,
            process_pattern: cli.process_pattern,
            process_utility: cli.process_utility,
            cleanup_temp_dirs: cli.cleanup_temp_dirs,

            ado_organization: cli.ado_organization,
            ado_project: cli.ado_project,
            ado_repo_id: cli.ado_repo_id,
            ado_session_token: cli.ado_session_token,
            ado_pat: cli.ado_pat,
            use_local_identity: cli.use_local_identity,

            module_sync_author_name: cli.module_sync_author_name,
            module_sync_author_email: cli.module_sync_author_email,
            module_sync_source_repo_child_path: cli.module_sync_source_repo_child_path,

            read_local_csv: cli.read_local_csv,
            local_resource_csv_path: cli.local_resource_csv_path,
            local_pattern_csv_path: cli.local_pattern_csv_path,
            local_utility_csv_path: cli.local_utility_csv_path,

            pull_remote_repo: cli.pull_remote_repo,
            temp_avm_module_repo_path: Some(cli.temp_avm_module_repo_path),
            source_repo_path: cli.source_repo_path,

            allowed_statuses: Some(cli.allowed_statuses),
            inclusion_override: cli.inclusion_override,
            exclusion_list: cli.exclusion_list,
            debug: cli.debug,
        }
    }
}
