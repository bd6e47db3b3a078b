//! Credential resolution cascade for pushing the feature branch, adapted
//! from the teacher's `vcs::remotes` push path (SPEC_FULL.md §4.N). Tries,
//! in order: a configured credential helper, SSH keys on disk, a bare
//! username, then whatever `git2::Cred::default()` resolves to.

use std::path::PathBuf;
use std::rc::Rc;

use git2::{Cred, CredentialType, Error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshKeyKind {
    IdEd25519,
    IdRsa,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    CredentialHelper,
    SshKey(SshKeyKind),
    Username,
    Default,
}

impl CredentialStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            CredentialStrategy::CredentialHelper => "helper",
            CredentialStrategy::SshKey(SshKeyKind::IdEd25519) => "file-id_ed25519",
            CredentialStrategy::SshKey(SshKeyKind::IdRsa) => "file-id_rsa",
            CredentialStrategy::Username => "username",
            CredentialStrategy::Default => "default",
        }
    }
}

fn user_home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

struct SshKeyPaths {
    private: PathBuf,
    public: Option<PathBuf>,
}

fn locate_default_key(kind: &SshKeyKind) -> Option<SshKeyPaths> {
    let home = user_home_dir()?;
    let key_name = match kind {
        SshKeyKind::IdEd25519 => "id_ed25519",
        SshKeyKind::IdRsa => "id_rsa",
    };
    let private = home.join(".ssh").join(key_name);
    if !private.exists() {
        return None;
    }
    let mut public = private.clone();
    public.set_extension("pub");
    let public = public.exists().then_some(public);
    Some(SshKeyPaths { private, public })
}

pub(crate) fn build_credential_plan(
    allowed_types: CredentialType,
    has_helper: bool,
) -> Vec<CredentialStrategy> {
    let mut plan = Vec::new();
    if has_helper {
        plan.push(CredentialStrategy::CredentialHelper);
    }
    if allowed_types.contains(CredentialType::SSH_KEY) {
        plan.push(CredentialStrategy::SshKey(SshKeyKind::IdEd25519));
        plan.push(CredentialStrategy::SshKey(SshKeyKind::IdRsa));
    }
    if allowed_types.contains(CredentialType::USERNAME) {
        plan.push(CredentialStrategy::Username);
    }
    plan.push(CredentialStrategy::Default);
    plan
}

fn sanitize(err: &Error) -> String {
    err.message().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn try_strategy(
    strategy: &CredentialStrategy,
    url: &str,
    username_from_url: Option<&str>,
    config: Option<&Rc<git2::Config>>,
) -> Result<Cred, String> {
    let username = username_from_url.unwrap_or("git");
    match strategy {
        CredentialStrategy::CredentialHelper => match config {
            Some(cfg) => Cred::credential_helper(cfg, url, username_from_url)
                .map_err(|err| format!("credential helper returned no data: {}", sanitize(&err))),
            None => Err("no git config available for credential helper".to_string()),
        },
        CredentialStrategy::SshKey(kind) => match locate_default_key(kind) {
            Some(paths) => Cred::ssh_key(username, paths.public.as_deref(), &paths.private, None)
                .map_err(|err| sanitize(&err)),
            None => Err(format!("no key for {}", strategy.label())),
        },
        CredentialStrategy::Username => Cred::username(username).map_err(|err| sanitize(&err)),
        CredentialStrategy::Default => Cred::default().map_err(|err| sanitize(&err)),
    }
}

/// Run the cascade, returning the first successful credential and, on total
/// failure, the last attempt's message for diagnostics.
pub(crate) fn resolve_credentials(
    url: &str,
    username_from_url: Option<&str>,
    allowed_types: CredentialType,
    config: Option<&Rc<git2::Config>>,
) -> Result<Cred, String> {
    let plan = build_credential_plan(allowed_types, config.is_some());
    let mut last_message = "no credential strategy configured".to_string();
    for strategy in &plan {
        match try_strategy(strategy, url, username_from_url, config) {
            Ok(cred) => return Ok(cred),
            Err(message) => last_message = message,
        }
    }
    Err(last_message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_always_ends_with_default() {
        let plan = build_credential_plan(CredentialType::all(), false);
        assert_eq!(plan.last(), Some(&CredentialStrategy::Default));
    }

    #[test]
    fn helper_entry_only_present_when_config_available() {
        let plan = build_credential_plan(CredentialType::all(), true);
        assert!(plan.contains(&CredentialStrategy::CredentialHelper));
        let plan_without = build_credential_plan(CredentialType::all(), false);
        assert!(!plan_without.contains(&CredentialStrategy::CredentialHelper));
    }
}
