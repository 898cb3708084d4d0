//! Where the config file lives, and seeding it on first run.

use conduit_common::ConfigError;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::template::default_config_toml;

const APP_DIR: &str = "conduit";
const FILE_NAME: &str = "config.toml";

/// `<platform config dir>/conduit/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the commented template to `path`, creating parent directories.
/// A file that already exists is left alone.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let fail = |what: &str, target: &Path, e: std::io::Error| {
        ConfigError::ParseError(format!("cannot {what} {}: {e}", target.display()))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| fail("create", parent, e))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
        Err(e) => return Err(fail("open", path, e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| fail("write", path, e))?;

    info!("created default config at {}", path.display());
    Ok(())
}
