//! Network server settings.

use conduit_common::Geometry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::expand_home;

/// Listen address, credential, and browsable project roots for the
/// networked deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Login password. Empty means a random one is generated at start-up.
    pub password: String,
    /// Directories whose children may be opened as session working
    /// directories.
    pub project_roots: Vec<String>,
    /// Starting size for network sessions.
    pub cols: u16,
    pub rows: u16,
}

impl ServerConfig {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.cols, self.rows)
    }

    pub fn project_root_paths(&self) -> Vec<PathBuf> {
        self.project_roots.iter().map(|r| expand_home(r)).collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let Geometry { cols, rows } = Geometry::NETWORK;
        Self {
            bind: "0.0.0.0".into(),
            port: 3131,
            password: String::new(),
            project_roots: vec!["~/Desktop/Github".into()],
            cols,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 3131);
        assert!(config.password.is_empty());
        assert_eq!(config.geometry(), Geometry::new(80, 24));
        assert_eq!(config.project_roots, vec!["~/Desktop/Github"]);
    }

    #[test]
    fn server_partial_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
port = 9000
project_roots = ["/srv/projects", "/home/me/work"]
"#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.project_root_paths(),
            vec![PathBuf::from("/srv/projects"), PathBuf::from("/home/me/work")]
        );
        assert_eq!(config.cols, 80);
    }
}
