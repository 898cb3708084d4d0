//! Child environment shaping.
//!
//! Children get a full copy of the host environment (the wrapped CLI needs
//! the user's `PATH`, credentials and tooling), with a handful of terminal
//! variables forced and the host's own nesting markers removed.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

use conduit_config::ShellConfig;

pub const TERM: &str = "xterm-256color";
pub const COLORTERM: &str = "truecolor";

/// A child environment. Names and values are kept as the OS gives them,
/// so variables that are not valid Unicode pass through untouched.
pub type Environment = BTreeMap<OsString, OsString>;

/// Transformation from the host environment to a child environment.
#[derive(Debug, Clone)]
pub struct EnvPolicy {
    strip: Vec<String>,
    extra: BTreeMap<String, String>,
    lang_fallback: String,
}

impl EnvPolicy {
    pub fn new(
        strip: Vec<String>,
        extra: BTreeMap<String, String>,
        lang_fallback: impl Into<String>,
    ) -> Self {
        Self {
            strip,
            extra,
            lang_fallback: lang_fallback.into(),
        }
    }

    pub fn from_config(shell: &ShellConfig) -> Self {
        Self::new(
            shell.strip_env.clone(),
            shell.env.clone(),
            shell.lang_fallback.clone(),
        )
    }

    pub fn strip_keys(&self) -> &[String] {
        &self.strip
    }

    /// Apply the policy to an explicit host environment.
    ///
    /// Extra variables override host values, terminal variables override
    /// both, and stripped keys are removed last so nothing reintroduces them.
    pub fn apply<I, K, V>(&self, host: I) -> Environment
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut env: Environment = host
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        for (key, value) in &self.extra {
            env.insert(key.into(), value.into());
        }

        env.insert("TERM".into(), TERM.into());
        env.insert("COLORTERM".into(), COLORTERM.into());

        if env.get(OsStr::new("LANG")).map_or(true, |lang| lang.is_empty()) {
            env.insert("LANG".into(), (&self.lang_fallback).into());
        }
        if !env.contains_key(OsStr::new("HOME")) {
            if let Some(home) = dirs::home_dir() {
                env.insert("HOME".into(), home.into_os_string());
            }
        }

        for key in &self.strip {
            env.remove(OsStr::new(key));
        }

        env
    }

    /// Apply the policy to this process's environment.
    pub fn child_environment(&self) -> Environment {
        self.apply(std::env::vars_os())
    }
}

impl Default for EnvPolicy {
    fn default() -> Self {
        Self::from_config(&ShellConfig::default())
    }
}
