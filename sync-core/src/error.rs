use std::fmt;

/// Error kinds surfaced by the sync engine, matching the propagation policy:
/// startup-fatal kinds abort the whole process, per-catalogue kinds abort one
/// category, per-module kinds are logged and the orchestrator moves on.
#[derive(Debug)]
pub enum SyncErrorKind {
    ConfigInvalid,
    AuthFailed,
    CatalogueFetchFailed,
    CatalogueParseFailed,
    CloneFailed,
    FilesystemError,
    PatchApplyFailed,
    GitOperationFailed,
    PushFailed,
    PRCreateFailed,
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncErrorKind::ConfigInvalid => "config invalid",
            SyncErrorKind::AuthFailed => "authentication failed",
            SyncErrorKind::CatalogueFetchFailed => "catalogue fetch failed",
            SyncErrorKind::CatalogueParseFailed => "catalogue parse failed",
            SyncErrorKind::CloneFailed => "clone failed",
            SyncErrorKind::FilesystemError => "filesystem error",
            SyncErrorKind::PatchApplyFailed => "patch apply failed",
            SyncErrorKind::GitOperationFailed => "git operation failed",
            SyncErrorKind::PushFailed => "push failed",
            SyncErrorKind::PRCreateFailed => "pull request creation failed",
        };
        write!(f, "{label}")
    }
}

/// Engine error: a kind, a human message, optional module context, and an
/// optional boxed source. Shaped after `vcs::remotes::PushError` in the
/// teacher rather than a `thiserror`-derived enum.
#[derive(Debug)]
pub struct SyncError {
    kind: SyncErrorKind,
    message: String,
    module: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl SyncError {
    pub fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            module: None,
            source: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> &SyncErrorKind {
        &self.kind
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn from_git(kind: SyncErrorKind, context: &str, err: git2::Error) -> Self {
        let message = format!("{context}: {}", sanitize(err.message()));
        Self {
            kind,
            message,
            module: None,
            source: Some(Box::new(err)),
        }
    }

    pub fn from_io(kind: SyncErrorKind, context: &str, err: std::io::Error) -> Self {
        let message = format!("{context}: {err}");
        Self {
            kind,
            message,
            module: None,
            source: Some(Box::new(err)),
        }
    }
}

fn sanitize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "[{module}] {}: {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
