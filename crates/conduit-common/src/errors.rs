use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Errors from the process-session lifecycle.
///
/// Only `BinaryNotFound` and `SpawnFailed` ever reach a consumer; write and
/// resize races against process exit are swallowed where they happen.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{program} not found in the configured path, known install locations, or PATH")]
    BinaryNotFound { program: String },

    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to resize PTY: {0}")]
    ResizeFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConduitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),
}
