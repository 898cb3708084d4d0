//! Full configuration validation.
//!
//! Each check appends to a shared error list so a broken file reports every
//! problem at once instead of one per reload. [`repair`] resets just the
//! offending fields so the rest of a file still applies.

mod helpers;


use crate::schema::ConduitConfig;
use conduit_common::{ConfigError, Geometry};

use helpers::{reset_if, validate_non_empty, validate_range};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ConduitConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_binary(&mut errors, config);
    validate_shell(&mut errors, config);
    validate_geometry(&mut errors, "terminal", config.terminal.cols, config.terminal.rows);
    validate_geometry(&mut errors, "server", config.server.cols, config.server.rows);
    validate_server(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

/// Reset every invalid field to its default, returning one message per
/// field changed. Valid fields keep their configured values.
pub fn repair(config: &mut ConduitConfig) -> Vec<String> {
    let defaults = ConduitConfig::default();
    let mut fixed = Vec::new();

    let binary = &mut config.binary;
    reset_if(
        &mut fixed,
        "binary.program",
        binary.program.trim().is_empty(),
        &mut binary.program,
        &defaults.binary.program,
    );
    reset_if(
        &mut fixed,
        "binary.lookup_timeout_secs",
        !(1..=5).contains(&binary.lookup_timeout_secs),
        &mut binary.lookup_timeout_secs,
        &defaults.binary.lookup_timeout_secs,
    );

    let shell = &mut config.shell;
    let before = shell.strip_env.len();
    shell.strip_env.retain(|key| is_variable_name(key));
    if shell.strip_env.len() != before {
        fixed.push("shell.strip_env: dropped entries that are not variable names".into());
    }
    reset_if(
        &mut fixed,
        "shell.lang_fallback",
        shell.lang_fallback.trim().is_empty(),
        &mut shell.lang_fallback,
        &defaults.shell.lang_fallback,
    );

    let terminal = &mut config.terminal;
    reset_if(
        &mut fixed,
        "terminal.cols",
        !dimension_ok(terminal.cols),
        &mut terminal.cols,
        &defaults.terminal.cols,
    );
    reset_if(
        &mut fixed,
        "terminal.rows",
        !dimension_ok(terminal.rows),
        &mut terminal.rows,
        &defaults.terminal.rows,
    );

    let server = &mut config.server;
    reset_if(
        &mut fixed,
        "server.cols",
        !dimension_ok(server.cols),
        &mut server.cols,
        &defaults.server.cols,
    );
    reset_if(
        &mut fixed,
        "server.rows",
        !dimension_ok(server.rows),
        &mut server.rows,
        &defaults.server.rows,
    );
    reset_if(
        &mut fixed,
        "server.port",
        server.port == 0,
        &mut server.port,
        &defaults.server.port,
    );
    reset_if(
        &mut fixed,
        "server.bind",
        server.bind.trim().is_empty(),
        &mut server.bind,
        &defaults.server.bind,
    );

    fixed
}

fn is_variable_name(key: &str) -> bool {
    !key.is_empty() && !key.contains('=')
}

fn dimension_ok(value: u16) -> bool {
    (1..=Geometry::MAX_DIMENSION).contains(&value)
}

fn validate_binary(errors: &mut Vec<String>, config: &ConduitConfig) {
    validate_non_empty(errors, "binary.program", &config.binary.program);
    validate_range(
        errors,
        "binary.lookup_timeout_secs",
        config.binary.lookup_timeout_secs,
        1,
        5,
    );
}

fn validate_shell(errors: &mut Vec<String>, config: &ConduitConfig) {
    for key in &config.shell.strip_env {
        if !is_variable_name(key) {
            errors.push(format!("shell.strip_env entry {key:?} is not a variable name"));
        }
    }
    validate_non_empty(errors, "shell.lang_fallback", &config.shell.lang_fallback);
}

fn validate_geometry(errors: &mut Vec<String>, section: &str, cols: u16, rows: u16) {
    let max = u32::from(Geometry::MAX_DIMENSION);
    validate_range(errors, &format!("{section}.cols"), u32::from(cols), 1, max);
    validate_range(errors, &format!("{section}.rows"), u32::from(rows), 1, max);
}

fn validate_server(errors: &mut Vec<String>, config: &ConduitConfig) {
    if config.server.port == 0 {
        errors.push("server.port must be non-zero".into());
    }
    validate_non_empty(errors, "server.bind", &config.server.bind);
}
