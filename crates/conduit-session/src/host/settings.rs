//! Construction-time settings for a [`super::SessionHost`].

use std::path::PathBuf;

use conduit_common::Geometry;
use conduit_config::{expand_home, ConduitConfig};

use crate::env::EnvPolicy;
use crate::locator::BinaryLocator;

#[derive(Debug, Clone)]
pub struct HostSettings {
    pub locator: BinaryLocator,
    pub env: EnvPolicy,
    /// Arguments passed to every launch.
    pub args: Vec<String>,
    /// Size of a session created before its consumer reports one.
    pub default_geometry: Geometry,
    /// Used when a spawn names no directory. `None` means home.
    pub default_directory: Option<PathBuf>,
}

impl HostSettings {
    /// Settings from a loaded config, with `geometry` as the starting
    /// size (desktop and network deployments differ).
    pub fn from_config(config: &ConduitConfig, geometry: Geometry) -> Self {
        Self {
            locator: BinaryLocator::from_config(&config.binary),
            env: EnvPolicy::from_config(&config.shell),
            args: config.shell.args.clone(),
            default_geometry: geometry,
            default_directory: config
                .shell
                .working_directory
                .as_deref()
                .map(expand_home),
        }
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self::from_config(&ConduitConfig::default(), Geometry::DESKTOP)
    }
}
