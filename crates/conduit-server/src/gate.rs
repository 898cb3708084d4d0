//! Remote Gate: password login, bearer tokens, and the project allow-list.
//!
//! Tokens are random and live only in memory, so restarting the server
//! invalidates every one of them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use conduit_config::expand_home;
use rand::RngCore;
use serde::Serialize;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Random bytes in a bearer token.
const TOKEN_BYTES: usize = 32;

/// Random bytes in a generated password.
const PASSWORD_BYTES: usize = 4;

/// WebSocket close code for a missing or unknown token.
pub const CLOSE_UNAUTHORIZED: u16 = 4001;

/// WebSocket close code for a directory outside the allow-list.
pub const CLOSE_FORBIDDEN: u16 = 4003;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Wrong password")]
    WrongPassword,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("directory not allowed: {0}")]
    DirectoryNotAllowed(String),
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::WrongPassword | GateError::Unauthorized => StatusCode::UNAUTHORIZED,
            GateError::DirectoryNotAllowed(_) => StatusCode::FORBIDDEN,
        }
    }

    pub fn close_code(&self) -> u16 {
        match self {
            GateError::WrongPassword | GateError::Unauthorized => CLOSE_UNAUTHORIZED,
            GateError::DirectoryNotAllowed(_) => CLOSE_FORBIDDEN,
        }
    }
}

#[derive(Debug, Serialize)]
struct GateErrorBody {
    error: String,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let body = GateErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// One browsable project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub path: String,
}

pub struct RemoteGate {
    password: String,
    tokens: RwLock<HashSet<String>>,
    project_roots: Vec<PathBuf>,
}

impl RemoteGate {
    pub fn new(password: impl Into<String>, project_roots: Vec<PathBuf>) -> Self {
        Self {
            password: password.into(),
            tokens: RwLock::new(HashSet::new()),
            project_roots,
        }
    }

    /// A short random password for servers started without one.
    pub fn generate_password() -> String {
        random_hex(PASSWORD_BYTES)
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn project_roots(&self) -> &[PathBuf] {
        &self.project_roots
    }

    /// Exchange the password for a fresh bearer token.
    pub async fn authenticate(&self, credential: &str) -> Result<String, GateError> {
        let matches: bool = credential.as_bytes().ct_eq(self.password.as_bytes()).into();
        if !matches {
            warn!("Login rejected: wrong password");
            return Err(GateError::WrongPassword);
        }
        let token = random_hex(TOKEN_BYTES);
        self.tokens.write().await.insert(token.clone());
        info!("Login accepted, token issued");
        Ok(token)
    }

    /// Check a token issued by this process.
    pub async fn authorize(&self, token: Option<&str>) -> Result<(), GateError> {
        match token {
            Some(token) if self.tokens.read().await.contains(token) => Ok(()),
            _ => Err(GateError::Unauthorized),
        }
    }

    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Working directory for a connection. No request means home; anything
    /// else must be the home directory or lie inside a project root.
    pub fn resolve_directory(&self, requested: Option<&str>) -> Result<PathBuf, GateError> {
        let home = dirs::home_dir();
        let requested = requested.map(str::trim).filter(|dir| !dir.is_empty());
        let Some(requested) = requested else {
            return Ok(home.unwrap_or_else(|| PathBuf::from("/")));
        };

        let not_allowed = || GateError::DirectoryNotAllowed(requested.to_string());
        let canonical = expand_home(requested)
            .canonicalize()
            .map_err(|_| not_allowed())?;
        if !canonical.is_dir() {
            return Err(not_allowed());
        }

        let is_home = home
            .and_then(|h| h.canonicalize().ok())
            .is_some_and(|h| h == canonical);
        let in_root = self
            .project_roots
            .iter()
            .filter_map(|root| root.canonicalize().ok())
            .any(|root| canonical.starts_with(&root));

        if is_home || in_root {
            Ok(canonical)
        } else {
            debug!(dir = %canonical.display(), "Directory outside project roots");
            Err(not_allowed())
        }
    }

    /// Non-hidden directories directly under each project root, sorted by
    /// name. Unreadable roots are skipped.
    pub fn list_projects(&self) -> Vec<Project> {
        let mut projects: Vec<Project> = self
            .project_roots
            .iter()
            .flat_map(|root| list_dir(root))
            .collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        projects
    }
}

fn list_dir(root: &Path) -> Vec<Project> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(root = %root.display(), "Cannot read project root: {e}");
            return Vec::new();
        }
    };
    entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            (!name.starts_with('.')).then(|| Project {
                name,
                path: entry.path().to_string_lossy().into_owned(),
            })
        })
        .collect()
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate_with_root(root: &Path) -> RemoteGate {
        RemoteGate::new("hunter2", vec![root.to_path_buf()])
    }

    #[tokio::test]
    async fn correct_password_issues_token() {
        let gate = RemoteGate::new("hunter2", Vec::new());
        let token = gate.authenticate("hunter2").await.unwrap();

        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(gate.authorize(Some(&token)).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let gate = RemoteGate::new("hunter2", Vec::new());
        assert_eq!(
            gate.authenticate("hunter3").await,
            Err(GateError::WrongPassword)
        );
        assert_eq!(gate.token_count().await, 0);
    }

    #[tokio::test]
    async fn password_must_match_exactly() {
        let gate = RemoteGate::new("hunter2", Vec::new());
        for attempt in ["", "hunter", "hunter22", "HUNTER2", "hunter2 "] {
            assert_eq!(
                gate.authenticate(attempt).await,
                Err(GateError::WrongPassword),
                "{attempt:?}"
            );
        }
        assert!(gate.authenticate("hunter2").await.is_ok());
    }

    #[tokio::test]
    async fn unissued_tokens_are_unauthorized() {
        let gate = RemoteGate::new("hunter2", Vec::new());
        assert_eq!(gate.authorize(None).await, Err(GateError::Unauthorized));
        assert_eq!(
            gate.authorize(Some("deadbeef")).await,
            Err(GateError::Unauthorized)
        );

        // A token from another gate (another server process) is worthless here.
        let other = RemoteGate::new("hunter2", Vec::new());
        let foreign = other.authenticate("hunter2").await.unwrap();
        assert_eq!(
            gate.authorize(Some(&foreign)).await,
            Err(GateError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn tokens_are_unique() {
        let gate = RemoteGate::new("pw", Vec::new());
        let a = gate.authenticate("pw").await.unwrap();
        let b = gate.authenticate("pw").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(gate.token_count().await, 2);
    }

    #[test]
    fn generated_password_is_short_hex() {
        let password = RemoteGate::generate_password();
        assert_eq!(password.len(), 8);
        assert!(password.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn error_codes() {
        assert_eq!(GateError::Unauthorized.close_code(), 4001);
        assert_eq!(GateError::WrongPassword.status(), StatusCode::UNAUTHORIZED);
        let forbidden = GateError::DirectoryNotAllowed("/etc".into());
        assert_eq!(forbidden.close_code(), 4003);
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_directory_means_home() {
        let gate = RemoteGate::new("pw", Vec::new());
        let dir = gate.resolve_directory(None).unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(dir, home);
        }
        assert_eq!(gate.resolve_directory(Some("  ")).unwrap(), dir);
    }

    #[test]
    fn project_directories_are_allowed() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("alpha");
        std::fs::create_dir(&project).unwrap();
        let gate = gate_with_root(root.path());

        let resolved = gate
            .resolve_directory(Some(project.to_str().unwrap()))
            .unwrap();
        assert_eq!(resolved, project.canonicalize().unwrap());
    }

    #[test]
    fn directories_outside_roots_are_refused() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let gate = gate_with_root(root.path());

        let err = gate
            .resolve_directory(Some(elsewhere.path().to_str().unwrap()))
            .unwrap_err();
        assert!(matches!(err, GateError::DirectoryNotAllowed(_)));
    }

    #[test]
    fn parent_traversal_is_refused() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("alpha");
        std::fs::create_dir(&project).unwrap();
        let gate = RemoteGate::new("pw", vec![project.clone()]);

        let sneaky = project.join("..").join("..");
        let err = gate
            .resolve_directory(Some(sneaky.to_str().unwrap()))
            .unwrap_err();
        assert!(matches!(err, GateError::DirectoryNotAllowed(_)));
    }

    #[test]
    fn missing_directory_is_refused() {
        let root = tempfile::tempdir().unwrap();
        let gate = gate_with_root(root.path());
        let ghost = root.path().join("ghost");
        assert!(gate.resolve_directory(Some(ghost.to_str().unwrap())).is_err());
    }

    #[test]
    fn projects_are_sorted_and_skip_hidden() {
        let root = tempfile::tempdir().unwrap();
        for name in ["zeta", "alpha", ".git", "mid"] {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        std::fs::write(root.path().join("notes.txt"), "x").unwrap();
        let gate = gate_with_root(root.path());

        let names: Vec<String> = gate.list_projects().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn unreadable_root_lists_nothing() {
        let gate = RemoteGate::new("pw", vec![PathBuf::from("/definitely/not/here")]);
        assert!(gate.list_projects().is_empty());
    }
}
