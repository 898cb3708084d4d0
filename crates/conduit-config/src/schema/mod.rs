//! Configuration schema types for Conduit.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod binary;
mod logging;
mod server;
mod shell;
mod terminal;

pub use binary::*;
pub use logging::*;
pub use server::*;
pub use shell::*;
pub use terminal::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConduitConfig {
    pub binary: BinaryConfig,
    pub shell: ShellConfig,
    pub terminal: TerminalConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Expand a leading `~` or `~/` against the user's home directory.
///
/// Paths without the prefix, or hosts without a home directory, come back
/// unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
