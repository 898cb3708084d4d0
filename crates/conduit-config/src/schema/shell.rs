//! Child process environment and launch settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Variables the wrapped CLI uses to detect that it is already running
/// inside itself (or inside an Electron node shim). Removing them keeps the
/// child from refusing to start or recursing.
pub const DEFAULT_STRIP_ENV: &[&str] = &[
    "CLAUDECODE",
    "CLAUDE_CODE_SESSION",
    "CLAUDE_CODE_ENTRY_POINT",
    "ELECTRON_RUN_AS_NODE",
];

/// Settings applied to every spawned session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Initial working directory. `None` means the user's home directory.
    pub working_directory: Option<String>,
    /// Extra arguments passed to the target program.
    pub args: Vec<String>,
    /// Host variables removed from the copied environment.
    pub strip_env: Vec<String>,
    /// Extra environment variables injected into the child.
    pub env: BTreeMap<String, String>,
    /// `LANG` value used when the host has none.
    pub lang_fallback: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            working_directory: None,
            args: Vec::new(),
            strip_env: DEFAULT_STRIP_ENV.iter().map(|s| s.to_string()).collect(),
            env: BTreeMap::from([(
                "NODE_OPTIONS".to_string(),
                "--max-old-space-size=4096".to_string(),
            )]),
            lang_fallback: "en_US.UTF-8".into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_config_defaults() {
        let config = ShellConfig::default();
        assert!(config.working_directory.is_none());
        assert!(config.args.is_empty());
        assert!(config.strip_env.contains(&"CLAUDECODE".to_string()));
        assert!(config.strip_env.contains(&"ELECTRON_RUN_AS_NODE".to_string()));
        assert_eq!(
            config.env.get("NODE_OPTIONS").map(String::as_str),
            Some("--max-old-space-size=4096")
        );
        assert_eq!(config.lang_fallback, "en_US.UTF-8");
    }

    #[test]
    fn shell_config_partial_toml() {
        let config: ShellConfig = toml::from_str(
            r#"
working_directory = "~/src"
strip_env = ["MY_WRAPPER_MARKER"]
"#,
        )
        .unwrap();
        assert_eq!(config.working_directory.as_deref(), Some("~/src"));
        assert_eq!(config.strip_env, vec!["MY_WRAPPER_MARKER"]);
        // Defaults preserved
        assert_eq!(config.lang_fallback, "en_US.UTF-8");
        assert!(config.env.contains_key("NODE_OPTIONS"));
    }

    #[test]
    fn shell_config_with_env_table() {
        let config: ShellConfig = toml::from_str(
            r#"
[env]
EDITOR = "nvim"
"#,
        )
        .unwrap();
        assert_eq!(config.env.get("EDITOR").unwrap(), "nvim");
        assert!(!config.env.contains_key("NODE_OPTIONS"));
    }
}
