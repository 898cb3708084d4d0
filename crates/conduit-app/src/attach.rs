//! Local host: one session bound to the invoking terminal.
//!
//! Keyboard bytes go straight to the session while it runs. After the
//! process exits, the next keypress restarts it in place and Ctrl-Q quits.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use conduit_common::{ConduitError, ExitInfo, SessionEvent, SessionId};
use conduit_session::SessionHost;
use crossterm::terminal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Ctrl-Q.
pub const QUIT_KEY: u8 = 0x11;

/// How often the terminal size is checked.
const RESIZE_POLL: Duration = Duration::from_millis(250);

/// What one chunk of keyboard input means in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Forward,
    Restart,
    Quit,
}

pub fn classify_input(running: bool, bytes: &[u8]) -> KeyAction {
    if running {
        KeyAction::Forward
    } else if bytes.contains(&QUIT_KEY) {
        KeyAction::Quit
    } else {
        KeyAction::Restart
    }
}

pub fn exit_banner(exit: &ExitInfo) -> String {
    let reason = match &exit.signal {
        Some(signal) => format!("terminated by {signal}"),
        None => format!("exited with code {}", exit.exit_code),
    };
    format!("\r\n\r\n[Process {reason}]\r\nPress any key to restart, Ctrl-Q to quit.\r\n")
}

pub fn error_banner(message: &str) -> String {
    format!("\r\n[Error: {message}]\r\nPress any key to retry, Ctrl-Q to quit.\r\n")
}

/// Restores cooked mode when dropped, including on early return.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("Failed to restore terminal mode: {e}");
        }
    }
}

/// Forward stdin chunks from a blocking thread.
fn spawn_stdin_reader() -> io::Result<mpsc::UnboundedReceiver<Vec<u8>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("stdin reader stopped: {e}");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Attach the invoking terminal to a fresh session until the user quits.
pub async fn run(host: SessionHost, directory: Option<PathBuf>) -> Result<(), ConduitError> {
    let id = SessionId::from("local");
    let _raw = RawModeGuard::enable()?;
    let input = spawn_stdin_reader()?;
    let mut stdout = io::stdout();

    let result = relay(&host, &id, directory, input, &mut stdout, || {
        terminal::size().ok()
    })
    .await;

    let killed = host.shutdown().await;
    debug!(killed, "Local session closed");
    result
}

/// The attach loop, independent of the real terminal.
pub async fn relay<W, F>(
    host: &SessionHost,
    id: &SessionId,
    directory: Option<PathBuf>,
    mut input: mpsc::UnboundedReceiver<Vec<u8>>,
    out: &mut W,
    mut terminal_size: F,
) -> Result<(), ConduitError>
where
    W: Write,
    F: FnMut() -> Option<(u16, u16)>,
{
    let (tx, mut events) = mpsc::unbounded_channel();
    host.attach(id, tx).await;

    let mut size = terminal_size();
    if let Some((cols, rows)) = size {
        host.resize(id, cols, rows).await;
    }
    let mut running = host.spawn(id, directory.clone()).await.is_ok();
    let mut resize_tick = tokio::time::interval(RESIZE_POLL);

    loop {
        tokio::select! {
            biased;

            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    SessionEvent::Data { bytes, .. } => write_out(out, &bytes)?,
                    SessionEvent::Exited { exit, .. } => {
                        running = false;
                        write_out(out, exit_banner(&exit).as_bytes())?;
                    }
                    SessionEvent::Error { message, .. } => {
                        running = false;
                        write_out(out, error_banner(&message).as_bytes())?;
                    }
                }
            }

            chunk = input.recv() => {
                let Some(bytes) = chunk else { break };
                match classify_input(running, &bytes) {
                    KeyAction::Forward => host.write(id, &bytes).await,
                    KeyAction::Quit => break,
                    KeyAction::Restart => {
                        info!(session = %id, "Restarting session");
                        write_out(out, b"\r\n")?;
                        running = host.spawn(id, directory.clone()).await.is_ok();
                    }
                }
            }

            _ = resize_tick.tick() => {
                let current = terminal_size();
                if current.is_some() && current != size {
                    size = current;
                    if let Some((cols, rows)) = current {
                        host.resize(id, cols, rows).await;
                    }
                }
            }
        }
    }

    host.remove(id).await;
    Ok(())
}

fn write_out<W: Write>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    out.write_all(bytes)?;
    out.flush()
}
