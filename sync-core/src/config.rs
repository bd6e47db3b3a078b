//! Immutable engine configuration (spec.md §4.J / SPEC_FULL.md §4.J). Built
//! once from parsed CLI flags, validated, then frozen — deliberately not a
//! `lazy_static!`-backed mutable global the way the teacher's
//! `vizier-core::config` module works (see `config/defaults.rs`,
//! `config/validate.rs` there); spec.md §9 flags that pattern as a hazard
//! this engine should not repeat.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{AmbientIdentityTokenSource, StaticTokenSource, TokenSource};
use crate::error::{SyncError, SyncErrorKind, SyncResult};

#[derive(Clone)]
pub struct EngineConfig {
    pub process_resource: bool,
    pub process_pattern: bool,
    pub process_utility: bool,
    pub cleanup_temp_dirs: bool,

    pub ado_organization: String,
    pub ado_project: String,
    pub ado_repo_id: Uuid,
    pub ado_session_token: Option<String>,
    pub ado_pat: Option<String>,
    pub use_local_identity: bool,

    pub module_sync_author_name: String,
    pub module_sync_author_email: String,
    pub module_sync_source_repo_child_path: Option<String>,

    pub read_local_csv: bool,
    pub local_resource_csv_path: Option<PathBuf>,
    pub local_pattern_csv_path: Option<PathBuf>,
    pub local_utility_csv_path: Option<PathBuf>,

    pub pull_remote_repo: bool,
    pub temp_avm_module_repo_path: PathBuf,
    pub source_repo_path: PathBuf,

    pub allowed_statuses: Vec<String>,
    pub inclusion_override: Vec<String>,
    pub exclusion_list: Vec<String>,
    pub debug: bool,

    pub fetch_pool_width: usize,

    /// PR API token acquisition (SPEC_FULL.md §4.N). Defaults to wrapping
    /// `ado_session_token` or, under `use_local_identity`, a placeholder that
    /// fails until a caller injects a real ambient-identity `TokenSource` via
    /// [`EngineConfig::with_token_source`].
    pub token_source: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("process_resource", &self.process_resource)
            .field("process_pattern", &self.process_pattern)
            .field("process_utility", &self.process_utility)
            .field("cleanup_temp_dirs", &self.cleanup_temp_dirs)
            .field("ado_organization", &self.ado_organization)
            .field("ado_project", &self.ado_project)
            .field("ado_repo_id", &self.ado_repo_id)
            .field("ado_session_token", &self.ado_session_token.as_ref().map(|_| "<redacted>"))
            .field("ado_pat", &self.ado_pat.as_ref().map(|_| "<redacted>"))
            .field("use_local_identity", &self.use_local_identity)
            .field("module_sync_author_name", &self.module_sync_author_name)
            .field("module_sync_author_email", &self.module_sync_author_email)
            .field(
                "module_sync_source_repo_child_path",
                &self.module_sync_source_repo_child_path,
            )
            .field("read_local_csv", &self.read_local_csv)
            .field("pull_remote_repo", &self.pull_remote_repo)
            .field("temp_avm_module_repo_path", &self.temp_avm_module_repo_path)
            .field("source_repo_path", &self.source_repo_path)
            .field("allowed_statuses", &self.allowed_statuses)
            .field("inclusion_override", &self.inclusion_override)
            .field("exclusion_list", &self.exclusion_list)
            .field("debug", &self.debug)
            .field("fetch_pool_width", &self.fetch_pool_width)
            .field("token_source", &"<dyn TokenSource>")
            .finish()
    }
}

/// Raw inputs as parsed off the CLI, before validation. Mirrors the flags
/// named in spec.md §6 one-for-one.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub process_resource: bool,
    pub process_pattern: bool,
    pub process_utility: bool,
    pub cleanup_temp_dirs: bool,

    pub ado_organization: Option<String>,
    pub ado_project: Option<String>,
    pub ado_repo_id: Option<String>,
    pub ado_session_token: Option<String>,
    pub ado_pat: Option<String>,
    pub use_local_identity: bool,

    pub module_sync_author_name: Option<String>,
    pub module_sync_author_email: Option<String>,
    pub module_sync_source_repo_child_path: Option<String>,

    pub read_local_csv: bool,
    pub local_resource_csv_path: Option<PathBuf>,
    pub local_pattern_csv_path: Option<PathBuf>,
    pub local_utility_csv_path: Option<PathBuf>,

    pub pull_remote_repo: bool,
    pub temp_avm_module_repo_path: Option<PathBuf>,
    pub source_repo_path: Option<String>,

    pub allowed_statuses: Option<String>,
    pub inclusion_override: Option<String>,
    pub exclusion_list: Option<String>,
    pub debug: bool,
}

fn invalid(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorKind::ConfigInvalid, message.into())
}

fn split_comma_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

impl EngineConfig {
    /// Validate and freeze a `RawConfig` into an `EngineConfig`, per
    /// SPEC_FULL.md §4.J.
    pub fn build(raw: RawConfig) -> SyncResult<Self> {
        if !(raw.process_resource || raw.process_pattern || raw.process_utility) {
            return Err(invalid("at least one of process-resource/-pattern/-utility must be enabled"));
        }

        let source_repo_path = raw
            .source_repo_path
            .ok_or_else(|| invalid("source-repo-path is required"))?;

        if raw.read_local_csv {
            let categories_missing = [
                (raw.process_resource, raw.local_resource_csv_path.is_none()),
                (raw.process_pattern, raw.local_pattern_csv_path.is_none()),
                (raw.process_utility, raw.local_utility_csv_path.is_none()),
            ];
            if categories_missing.iter().any(|(enabled, missing)| *enabled && *missing) {
                return Err(invalid(
                    "read-local-csv is set but a local CSV path is missing for an enabled category",
                ));
            }
        }

        let ado_organization = raw
            .ado_organization
            .ok_or_else(|| invalid("ado-organization is required"))?;
        let ado_project = raw.ado_project.ok_or_else(|| invalid("ado-project is required"))?;
        let ado_repo_id_raw = raw.ado_repo_id.ok_or_else(|| invalid("ado-repo-id is required"))?;
        let ado_repo_id = Uuid::parse_str(&ado_repo_id_raw)
            .map_err(|err| invalid(format!("ado-repo-id must be a UUID: {err}")))?;

        if !raw.use_local_identity && raw.ado_session_token.is_none() {
            return Err(invalid(
                "ado-session-token is required unless use-local-identity is set",
            ));
        }

        let allowed_statuses = raw
            .allowed_statuses
            .as_deref()
            .map(split_comma_list)
            .unwrap_or_else(|| vec!["Available".to_string()]);
        let inclusion_override = raw.inclusion_override.as_deref().map(split_comma_list).unwrap_or_default();
        let exclusion_list = raw.exclusion_list.as_deref().map(split_comma_list).unwrap_or_default();

        Ok(EngineConfig {
            process_resource: raw.process_resource,
            process_pattern: raw.process_pattern,
            process_utility: raw.process_utility,
            cleanup_temp_dirs: raw.cleanup_temp_dirs,

            ado_organization,
            ado_project,
            ado_repo_id,
            ado_session_token: raw.ado_session_token,
            ado_pat: raw.ado_pat,
            use_local_identity: raw.use_local_identity,

            module_sync_author_name: raw
                .module_sync_author_name
                .unwrap_or_else(|| "AVM Module Sync".to_string()),
            module_sync_author_email: raw
                .module_sync_author_email
                .unwrap_or_else(|| "avm-module-sync@example.com".to_string()),
            module_sync_source_repo_child_path: raw.module_sync_source_repo_child_path,

            read_local_csv: raw.read_local_csv,
            local_resource_csv_path: raw.local_resource_csv_path,
            local_pattern_csv_path: raw.local_pattern_csv_path,
            local_utility_csv_path: raw.local_utility_csv_path,

            pull_remote_repo: raw.pull_remote_repo,
            temp_avm_module_repo_path: raw
                .temp_avm_module_repo_path
                .unwrap_or_else(|| PathBuf::from("./avm_modules")),
            source_repo_path: PathBuf::from(source_repo_path),

            allowed_statuses,
            inclusion_override,
            exclusion_list,
            debug: raw.debug,

            fetch_pool_width: 10,

            token_source: default_token_source(raw.use_local_identity, raw.ado_session_token.as_deref()),
        })
    }

    /// Replace the PR-API token source, e.g. to supply a real
    /// ambient-identity `TokenSource` in place of the `use_local_identity`
    /// placeholder (SPEC_FULL.md §4.N).
    pub fn with_token_source(mut self, token_source: Arc<dyn TokenSource>) -> Self {
        self.token_source = token_source;
        self
    }
}

fn default_token_source(use_local_identity: bool, session_token: Option<&str>) -> Arc<dyn TokenSource> {
    if use_local_identity {
        Arc::new(AmbientIdentityTokenSource)
    } else {
        Arc::new(StaticTokenSource::new(session_token.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_raw() -> RawConfig {
        RawConfig {
            process_resource: true,
            ado_organization: Some("contoso".to_string()),
            ado_project: Some("platform".to_string()),
            ado_repo_id: Some(Uuid::nil().to_string()),
            ado_session_token: Some("token".to_string()),
            source_repo_path: Some("/tmp/dest".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn no_category_enabled_is_invalid() {
        let raw = RawConfig {
            process_resource: false,
            ..minimal_raw()
        };
        let err = EngineConfig::build(raw).unwrap_err();
        assert!(matches!(err.kind(), SyncErrorKind::ConfigInvalid));
    }

    #[test]
    fn missing_session_token_without_local_identity_is_invalid() {
        let raw = RawConfig {
            ado_session_token: None,
            use_local_identity: false,
            ..minimal_raw()
        };
        let err = EngineConfig::build(raw).unwrap_err();
        assert!(matches!(err.kind(), SyncErrorKind::ConfigInvalid));
    }

    #[test]
    fn local_identity_waives_session_token_requirement() {
        let raw = RawConfig {
            ado_session_token: None,
            use_local_identity: true,
            ..minimal_raw()
        };
        assert!(EngineConfig::build(raw).is_ok());
    }

    #[test]
    fn default_token_source_wraps_session_token() {
        let config = EngineConfig::build(minimal_raw()).unwrap();
        assert_eq!(config.token_source.token().unwrap(), "token");
    }

    #[test]
    fn local_identity_token_source_fails_until_replaced() {
        let raw = RawConfig {
            ado_session_token: None,
            use_local_identity: true,
            ..minimal_raw()
        };
        let config = EngineConfig::build(raw).unwrap();
        let err = config.token_source.token().unwrap_err();
        assert!(matches!(err.kind(), SyncErrorKind::AuthFailed));

        let config = config.with_token_source(Arc::new(crate::auth::StaticTokenSource::new("minted")));
        assert_eq!(config.token_source.token().unwrap(), "minted");
    }

    #[test]
    fn non_uuid_repo_id_is_invalid() {
        let raw = RawConfig {
            ado_repo_id: Some("not-a-uuid".to_string()),
            ..minimal_raw()
        };
        let err = EngineConfig::build(raw).unwrap_err();
        assert!(matches!(err.kind(), SyncErrorKind::ConfigInvalid));
    }

    #[test]
    fn allowed_statuses_default_to_available() {
        let config = EngineConfig::build(minimal_raw()).unwrap();
        assert_eq!(config.allowed_statuses, vec!["Available".to_string()]);
    }

    #[test]
    fn inclusion_override_and_exclusion_list_default_empty() {
        let config = EngineConfig::build(minimal_raw()).unwrap();
        assert!(config.inclusion_override.is_empty());
        assert!(config.exclusion_list.is_empty());
    }

    #[test]
    fn inclusion_override_and_exclusion_list_are_split_and_trimmed() {
        let raw = RawConfig {
            inclusion_override: Some("avm-res-storage-account, avm-res-keyvault".to_string()),
            exclusion_list: Some("avm-res-deprecated-thing".to_string()),
            ..minimal_raw()
        };
        let config = EngineConfig::build(raw).unwrap();
        assert_eq!(
            config.inclusion_override,
            vec!["avm-res-storage-account".to_string(), "avm-res-keyvault".to_string()]
        );
        assert_eq!(config.exclusion_list, vec!["avm-res-deprecated-thing".to_string()]);
    }

    #[test]
    fn read_local_csv_requires_path_for_each_enabled_category() {
        let raw = RawConfig {
            process_resource: true,
            process_pattern: true,
            read_local_csv: true,
            local_resource_csv_path: Some(PathBuf::from("resource.csv")),
            local_pattern_csv_path: None,
            ..minimal_raw()
        };
        let err = EngineConfig::build(raw).unwrap_err();
        assert!(matches!(err.kind(), SyncErrorKind::ConfigInvalid));
    }
}
