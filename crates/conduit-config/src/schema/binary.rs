//! Target executable discovery settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::expand_home;

/// Well-known install locations probed when no override is set.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "/usr/local/bin/claude",
    "/usr/bin/claude",
    "/opt/homebrew/bin/claude",
    "~/.npm-global/bin/claude",
    "~/.local/bin/claude",
    "~/.claude/local/claude",
];

/// How to find the interactive program each session runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryConfig {
    /// Executable name used for the `PATH` lookup.
    pub program: String,
    /// Explicit path. Empty string means unset. Returned without checks.
    pub override_path: String,
    /// Ordered install locations, each must exist and be executable.
    pub candidates: Vec<String>,
    /// Upper bound on the `which` lookup, in seconds (1-5).
    pub lookup_timeout_secs: u32,
}

impl BinaryConfig {
    /// The override, if one is configured.
    pub fn override_path(&self) -> Option<PathBuf> {
        let trimmed = self.override_path.trim();
        (!trimmed.is_empty()).then(|| expand_home(trimmed))
    }

    /// Candidate paths with `~` expanded.
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        self.candidates.iter().map(|c| expand_home(c)).collect()
    }
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            program: "claude".into(),
            override_path: String::new(),
            candidates: DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            lookup_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_config_defaults() {
        let config = BinaryConfig::default();
        assert_eq!(config.program, "claude");
        assert!(config.override_path().is_none());
        assert_eq!(config.candidates.len(), DEFAULT_CANDIDATES.len());
        assert_eq!(config.lookup_timeout_secs, 5);
    }

    #[test]
    fn blank_override_counts_as_unset() {
        let config = BinaryConfig {
            override_path: "   ".into(),
            ..Default::default()
        };
        assert!(config.override_path().is_none());
    }

    #[test]
    fn override_is_returned_verbatim() {
        let config = BinaryConfig {
            override_path: "/does/not/exist".into(),
            ..Default::default()
        };
        assert_eq!(config.override_path(), Some(PathBuf::from("/does/not/exist")));
    }

    #[test]
    fn candidate_paths_expand_home() {
        let config = BinaryConfig {
            candidates: vec!["~/.local/bin/claude".into(), "/usr/bin/claude".into()],
            ..Default::default()
        };
        let paths = config.candidate_paths();
        assert_eq!(paths[1], PathBuf::from("/usr/bin/claude"));
        if dirs::home_dir().is_some() {
            assert!(!paths[0].starts_with("~"));
        }
    }
}
