//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Conduit Configuration
# Only override what you want to change -- missing fields use defaults.

[binary]
# program = "claude"          # name used for the PATH lookup
# override_path = ""          # explicit executable, used as-is when set
# lookup_timeout_secs = 5     # 1-5
# candidates = [
#   "/usr/local/bin/claude",
#   "/usr/bin/claude",
#   "/opt/homebrew/bin/claude",
#   "~/.npm-global/bin/claude",
#   "~/.local/bin/claude",
#   "~/.claude/local/claude",
# ]

[shell]
# working_directory = "~"     # default: home directory
# args = []
# lang_fallback = "en_US.UTF-8"
# strip_env = ["CLAUDECODE", "CLAUDE_CODE_SESSION", "CLAUDE_CODE_ENTRY_POINT", "ELECTRON_RUN_AS_NODE"]

# [shell.env]
# NODE_OPTIONS = "--max-old-space-size=4096"

[terminal]
# cols = 120                  # 1-500
# rows = 40                   # 1-500

[server]
# bind = "0.0.0.0"
# port = 3131
# password = ""               # empty: random password printed at start-up
# project_roots = ["~/Desktop/Github"]
# cols = 80
# rows = 24

[logging]
# level = "info"              # trace, debug, info, warn, error
"##
    .to_string()
}
