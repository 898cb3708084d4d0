use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Conduit: run an interactive CLI in a managed pseudo-terminal session.
#[derive(Parser, Debug)]
#[command(name = "conduit", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a session in this terminal (the default).
    Attach {
        /// Working directory for the session.
        #[arg(short = 'd', long)]
        directory: Option<PathBuf>,
    },
    /// Print the executable the next session would launch.
    Locate,
}

impl Args {
    /// The subcommand, defaulting to `attach` in the configured directory.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Attach { directory: None })
    }
}

pub fn parse() -> Args {
    Args::parse()
}
