//! conduit-server: interactive sessions over WebSocket.
//!
//! Serves a small HTTP API (password login, project listing) and a `/ws`
//! relay. Each authorized WebSocket gets its own session running the target
//! CLI in the requested project directory; closing the socket kills it.

mod connection;
mod gate;
mod protocol;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use conduit_common::ConduitError;
use conduit_config::{ConduitConfig, LogLevel, ServerConfig};
use conduit_session::{HostSettings, SessionHost};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::gate::RemoteGate;
use crate::routes::AppState;

#[derive(Parser, Debug)]
#[command(name = "conduit-server", version, about = "Serve interactive CLI sessions over WebSocket")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind.
    #[arg(long)]
    bind: Option<String>,

    /// Login password. A random one is generated when unset.
    #[arg(long, env = "CONDUIT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Directory whose subdirectories are offered as projects.
    #[arg(long, env = "PROJECTS_DIR")]
    projects_dir: Option<String>,

    /// Config file path override.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(cli_level: Option<&str>, config_level: LogLevel) {
    let level = cli_level.unwrap_or(config_level.as_directive());
    let fallback = format!(
        "warn,conduit_server={level},conduit_session={level},conduit_config={level}"
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

/// Command-line and environment values win over the config file.
fn apply_overrides(args: &Args, server: &mut ServerConfig) {
    if let Some(port) = args.port {
        server.port = port;
    }
    if let Some(bind) = &args.bind {
        server.bind = bind.clone();
    }
    if let Some(password) = &args.password {
        server.password = password.clone();
    }
    if let Some(dir) = &args.projects_dir {
        server.project_roots = vec![dir.clone()];
    }
}

/// Resolve on Ctrl-C, after killing every session.
async fn shutdown_signal(host: SessionHost) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Interrupt received, stopping sessions");
    host.shutdown().await;
}

async fn run(args: Args, mut config: ConduitConfig) -> Result<(), ConduitError> {
    apply_overrides(&args, &mut config.server);

    let password = if config.server.password.is_empty() {
        RemoteGate::generate_password()
    } else {
        config.server.password.clone()
    };
    let gate = Arc::new(RemoteGate::new(password, config.server.project_root_paths()));
    let host = SessionHost::with_pty(HostSettings::from_config(
        &config,
        config.server.geometry(),
    ));

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ConduitError::Network(format!("failed to bind {addr}: {e}")))?;

    let binary = match host.locate().await {
        Ok(path) => path.display().to_string(),
        Err(_) => "NOT FOUND".to_string(),
    };
    info!("conduit-server v{} listening on {addr}", env!("CARGO_PKG_VERSION"));
    info!("Local:    http://localhost:{}", config.server.port);
    info!("Password: {}", gate.password());
    for root in gate.project_roots() {
        info!("Projects: {}", root.display());
    }
    info!("Binary:   {binary}");

    let state = AppState {
        host: host.clone(),
        gate,
    };
    axum::serve(
        listener,
        routes::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(host.clone()))
    .await?;

    // Already done by the signal handler; repeated for non-signal exits.
    host.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let (config, config_error) = match conduit_config::load_config(args.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (ConduitConfig::default(), Some(e)),
    };
    init_logging(args.log_level.as_deref(), config.logging.level);
    if let Some(e) = config_error {
        warn!("Config load failed, using defaults: {e}");
    }

    if let Err(e) = run(args, config).await {
        error!("{e}");
        std::process::exit(1);
    }
}
