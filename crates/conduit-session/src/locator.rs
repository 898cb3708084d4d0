//! Target executable discovery.
//!
//! Resolution order: configured override (returned as-is), then each
//! candidate install location that exists and is executable, then a `PATH`
//! lookup through `which`. Nothing is cached; every spawn resolves again so
//! a binary installed while the host runs is picked up.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use conduit_common::SessionError;
use conduit_config::BinaryConfig;
use tracing::{debug, warn};

/// Hard ceiling on the `PATH` lookup.
pub const MAX_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct BinaryLocator {
    program: String,
    override_path: Option<PathBuf>,
    candidates: Vec<PathBuf>,
    lookup_timeout: Duration,
}

impl BinaryLocator {
    /// A locator that only consults `PATH`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            override_path: None,
            candidates: Vec::new(),
            lookup_timeout: MAX_LOOKUP_TIMEOUT,
        }
    }

    pub fn from_config(config: &BinaryConfig) -> Self {
        Self::new(config.program.clone())
            .with_override(config.override_path())
            .with_candidates(config.candidate_paths())
            .with_lookup_timeout(Duration::from_secs(u64::from(config.lookup_timeout_secs)))
    }

    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        self.override_path = path;
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout.min(MAX_LOOKUP_TIMEOUT);
        self
    }

    pub fn set_override(&mut self, path: Option<PathBuf>) {
        self.override_path = path;
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn override_path(&self) -> Option<&Path> {
        self.override_path.as_deref()
    }

    /// Find the executable, or fail with [`SessionError::BinaryNotFound`].
    pub async fn resolve(&self) -> Result<PathBuf, SessionError> {
        if let Some(path) = &self.override_path {
            debug!(path = %path.display(), "Using configured binary override");
            return Ok(path.clone());
        }

        if let Some(path) = self.candidates.iter().find(|p| is_executable(p)) {
            debug!(path = %path.display(), "Found binary at known location");
            return Ok(path.clone());
        }

        if let Some(path) = self.lookup_on_path().await {
            debug!(path = %path.display(), "Found binary on PATH");
            return Ok(path);
        }

        Err(SessionError::BinaryNotFound {
            program: self.program.clone(),
        })
    }

    async fn lookup_on_path(&self) -> Option<PathBuf> {
        #[cfg(windows)]
        let finder = "where";
        #[cfg(not(windows))]
        let finder = "which";

        let mut cmd = tokio::process::Command::new(finder);
        cmd.arg(&self.program)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.lookup_timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                stdout
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(PathBuf::from)
            }
            Ok(Ok(output)) => {
                debug!(program = %self.program, status = %output.status, "PATH lookup found nothing");
                None
            }
            Ok(Err(e)) => {
                debug!(program = %self.program, "PATH lookup failed to run: {e}");
                None
            }
            Err(_) => {
                warn!(
                    program = %self.program,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "PATH lookup timed out"
                );
                None
            }
        }
    }
}

/// True if `path` is a regular file with an execute bit set.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
