//! `portable-pty` backed launcher.

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};

use conduit_common::{ExitInfo, Geometry, SessionError};

use super::types::{LaunchSpec, Launcher, ProcessControl, ProcessHandle, ProcessWaiter};

/// Read buffer size for PTY output.
pub const PTY_READ_CHUNK: usize = 8192;

fn pty_size(geometry: Geometry) -> PtySize {
    PtySize {
        rows: geometry.rows,
        cols: geometry.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// Build a `CommandBuilder` whose environment is exactly `spec.env`.
fn build_command(spec: &LaunchSpec) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(&spec.program);
    cmd.args(&spec.args);
    cmd.cwd(&spec.cwd);

    cmd.env_clear();
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    cmd
}

/// Launches children inside native pseudo-terminals.
#[derive(Debug, Default, Clone, Copy)]
pub struct PtyLauncher;

impl Launcher for PtyLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<ProcessHandle, SessionError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(pty_size(spec.geometry))
            .map_err(|e| SessionError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        let child = pair
            .slave
            .spawn_command(build_command(spec))
            .map_err(|e| {
                SessionError::SpawnFailed(format!("'{}': {e}", spec.program.display()))
            })?;

        // Only the master side is needed from here on
        drop(pair.slave);

        let pid = child.process_id();
        let killer = child.clone_killer();

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| SessionError::SpawnFailed(format!("failed to clone PTY reader: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| SessionError::SpawnFailed(format!("failed to take PTY writer: {e}")))?;

        Ok(ProcessHandle {
            pid,
            writer,
            reader,
            control: Box::new(PtyControl {
                master: pair.master,
                killer,
            }),
            waiter: Box::new(PtyWaiter { child }),
        })
    }
}

struct PtyControl {
    master: Box<dyn MasterPty + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
}

impl ProcessControl for PtyControl {
    fn resize(&self, geometry: Geometry) -> Result<(), SessionError> {
        self.master
            .resize(pty_size(geometry))
            .map_err(|e| SessionError::ResizeFailed(e.to_string()))
    }

    fn kill(&mut self) -> Result<(), SessionError> {
        self.killer.kill().map_err(SessionError::Io)
    }
}

struct PtyWaiter {
    child: Box<dyn Child + Send + Sync>,
}

impl ProcessWaiter for PtyWaiter {
    fn wait(mut self: Box<Self>) -> ExitInfo {
        match self.child.wait() {
            Ok(status) => ExitInfo {
                exit_code: status.exit_code(),
                signal: status.signal().map(str::to_owned),
            },
            Err(e) => {
                tracing::debug!("failed to reap child: {e}");
                ExitInfo::code(1)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::{Read, Write};
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::time::Duration;

    fn sh_spec(geometry: Geometry) -> LaunchSpec {
        let mut env = BTreeMap::new();
        env.insert("PATH".into(), "/usr/bin:/bin".into());
        env.insert("TERM".into(), "xterm-256color".into());
        LaunchSpec {
            program: PathBuf::from("/bin/sh"),
            args: Vec::new(),
            cwd: std::env::temp_dir(),
            env,
            geometry,
        }
    }

    /// Drain `reader` on a thread until `needle` shows up or five seconds pass.
    fn read_until(mut reader: Box<dyn Read + Send>, needle: &'static str) -> String {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = [0u8; PTY_READ_CHUNK];
            let mut seen = String::new();
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        seen.push_str(&String::from_utf8_lossy(&buf[..n]));
                        if seen.contains(needle) {
                            break;
                        }
                    }
                }
            }
            let _ = tx.send(seen);
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap_or_default()
    }

    #[test]
    fn launch_and_echo() {
        let mut handle = PtyLauncher.launch(&sh_spec(Geometry::NETWORK)).expect("spawn sh");
        assert!(handle.pid.is_some());

        handle.writer.write_all(b"echo conduit-$((40+2))\n").unwrap();
        handle.writer.flush().unwrap();

        let output = read_until(handle.reader, "conduit-42");
        assert!(output.contains("conduit-42"), "got: {output:?}");

        handle.control.kill().unwrap();
        let exit = handle.waiter.wait();
        assert!(exit.exit_code != 0 || exit.signal.is_some());
    }

    #[test]
    fn initial_geometry_is_visible_to_child() {
        let mut handle = PtyLauncher
            .launch(&sh_spec(Geometry::new(100, 30)))
            .expect("spawn sh");

        handle.writer.write_all(b"stty size\n").unwrap();
        handle.writer.flush().unwrap();

        let output = read_until(handle.reader, "30 100");
        assert!(output.contains("30 100"), "got: {output:?}");
        let _ = handle.control.kill();
    }

    #[test]
    fn exit_code_is_reported() {
        let mut handle = PtyLauncher.launch(&sh_spec(Geometry::NETWORK)).expect("spawn sh");
        handle.writer.write_all(b"exit 7\n").unwrap();
        handle.writer.flush().unwrap();

        let _ = read_until(handle.reader, "\u{0}");
        let exit = handle.waiter.wait();
        assert_eq!(exit.exit_code, 7);
        assert!(exit.signal.is_none());
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let mut spec = sh_spec(Geometry::NETWORK);
        spec.program = PathBuf::from("/definitely/not/a/program");
        let err = PtyLauncher.launch(&spec).unwrap_err();
        assert!(matches!(err, SessionError::SpawnFailed(_)));
    }
}
