//! Conduit configuration.
//!
//! TOML-based settings consumed read-only by the session host: which
//! executable to launch, how to shape its environment, starting geometry,
//! and the network server's listen address and project roots. Every section
//! uses serde defaults, so a partial file merges over the built-in values.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    expand_home, BinaryConfig, ConduitConfig, LogLevel, LoggingConfig, ServerConfig, ShellConfig,
    TerminalConfig,
};

use conduit_common::ConfigError;
use std::path::Path;
use tracing::warn;

/// Load config from the platform default path (creating a commented
/// default file if none exists) or from an explicit override path.
///
/// Out-of-range fields are reset to their defaults with a warning; the
/// rest of the file still applies. Only unreadable or unparsable files
/// are errors.
pub fn load_config(override_path: Option<&Path>) -> Result<ConduitConfig, ConfigError> {
    let mut config = match override_path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };
    for problem in validation::repair(&mut config) {
        warn!("config: {problem}");
    }
    Ok(config)
}
