//! conduit: run the target CLI in a pseudo-terminal bound to this terminal.

mod attach;
mod cli;

use conduit_common::ConduitError;
use conduit_config::{ConduitConfig, LogLevel};
use conduit_session::{BinaryLocator, HostSettings, SessionHost};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Command;

/// Logs go to stderr so they never mix with session output on stdout.
fn init_logging(cli_level: Option<&str>, config_level: LogLevel) {
    let level = cli_level.unwrap_or(config_level.as_directive());
    let fallback = format!("warn,conduit={level},conduit_session={level},conduit_config={level}");
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

async fn run(command: Command, config: ConduitConfig) -> Result<(), ConduitError> {
    match command {
        Command::Locate => {
            let path = BinaryLocator::from_config(&config.binary).resolve().await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Attach { directory } => {
            let settings = HostSettings::from_config(&config, config.terminal.geometry());
            let host = SessionHost::with_pty(settings);
            attach::run(host, directory).await
        }
    }
}

#[tokio::main]
async fn main() {
    let args = cli::parse();

    let (config, config_error) = match conduit_config::load_config(args.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (ConduitConfig::default(), Some(e)),
    };
    init_logging(args.log_level.as_deref(), config.logging.level);
    if let Some(e) = config_error {
        warn!("Config load failed, using defaults: {e}");
    }

    if let Err(e) = run(args.command(), config).await {
        error!("{e}");
        eprintln!("conduit: {e}");
        std::process::exit(1);
    }
}
