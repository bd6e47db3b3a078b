//! PR API token acquisition (SPEC_FULL.md §4.N). The engine needs exactly one
//! bearer-ish string to authenticate against the destination service's REST
//! API; how that string is produced is an external collaborator's problem
//! (spec.md §1 excludes "credential acquisition from a cloud identity
//! provider" from the core). `TokenSource` is the seam: the orchestrator asks
//! for a token and never talks to an identity provider itself.

use crate::error::{SyncError, SyncErrorKind, SyncResult};

pub trait TokenSource: Send + Sync {
    fn token(&self) -> SyncResult<String>;
}

/// Wraps a session token supplied directly on the CLI (`--ado-session-token`).
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticTokenSource {
    fn token(&self) -> SyncResult<String> {
        Ok(self.0.clone())
    }
}

/// Placeholder for `--use-local-identity`: minting a token from the ambient
/// cloud identity provider is out of scope for this core (spec.md §1). A
/// caller that actually has access to that provider supplies its own
/// `TokenSource` in place of this one; left unreplaced, it fails loudly
/// with `AuthFailed` instead of silently returning an empty token.
pub struct AmbientIdentityTokenSource;

impl TokenSource for AmbientIdentityTokenSource {
    fn token(&self) -> SyncResult<String> {
        Err(SyncError::new(
            SyncErrorKind::AuthFailed,
            "use-local-identity was set but no ambient-identity TokenSource was injected; \
             minting a token from the cloud identity provider is outside this engine's core",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_source_returns_configured_token() {
        let source = StaticTokenSource::new("abc123");
        assert_eq!(source.token().unwrap(), "abc123");
    }

    #[test]
    fn ambient_identity_source_fails_until_replaced() {
        let source = AmbientIdentityTokenSource;
        let err = source.token().unwrap_err();
        assert!(matches!(err.kind(), SyncErrorKind::AuthFailed));
    }
}
