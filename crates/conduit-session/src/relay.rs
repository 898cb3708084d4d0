//! PTY pumps and event routing.
//!
//! Each launched process gets a `pty-writer` thread that drains queued
//! input in order, so a child that stops reading never blocks the caller.
//! A `pty-reader` thread forwards output chunks, then reaps the child and
//! reports its exit. Every notice carries
//! the generation it was launched with; the router drops anything whose
//! generation no longer matches the session, so a replaced or killed
//! process can never leak output or an exit into its successor.

use std::io::{ErrorKind, Read, Write};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;

use conduit_common::{SessionError, SessionEvent, SessionId};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, trace};

use crate::pty::{ProcessWaiter, PTY_READ_CHUNK};
use crate::registry::SessionRegistry;

#[derive(Debug)]
pub(crate) enum PumpEvent {
    Output {
        id: SessionId,
        generation: u64,
        bytes: Vec<u8>,
    },
    Exited {
        id: SessionId,
        generation: u64,
        exit: conduit_common::ExitInfo,
    },
}

pub(crate) type PumpSender = mpsc::UnboundedSender<PumpEvent>;

/// Queue feeding one process's `pty-writer` thread. Dropping it ends the
/// thread once the queue is drained.
pub(crate) type InputSender = std_mpsc::Sender<Vec<u8>>;

/// Start the writer thread for one process.
pub(crate) fn start_writer(
    id: SessionId,
    mut writer: Box<dyn Write + Send>,
) -> Result<InputSender, SessionError> {
    let (tx, rx) = std_mpsc::channel::<Vec<u8>>();
    thread::Builder::new()
        .name("pty-writer".to_string())
        .spawn(move || {
            for bytes in rx {
                if let Err(e) = writer.write_all(&bytes).and_then(|()| writer.flush()) {
                    debug!(session = %id, "PTY write failed: {e}");
                    break;
                }
            }
        })
        .map_err(SessionError::Io)?;
    Ok(tx)
}

/// Start the reader thread for one process.
pub(crate) fn start_pump(
    id: SessionId,
    generation: u64,
    mut reader: Box<dyn Read + Send>,
    waiter: Box<dyn ProcessWaiter>,
    tx: PumpSender,
) -> Result<(), SessionError> {
    thread::Builder::new()
        .name("pty-reader".to_string())
        .spawn(move || {
            let mut buf = [0u8; PTY_READ_CHUNK];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break, // EOF, child closed its terminal
                    Ok(n) => {
                        let event = PumpEvent::Output {
                            id: id.clone(),
                            generation,
                            bytes: buf[..n].to_vec(),
                        };
                        if tx.send(event).is_err() {
                            break; // Host dropped
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        // EIO is the normal end-of-stream on Linux
                        trace!(session = %id, "PTY reader stopped: {e}");
                        break;
                    }
                }
            }

            let exit = waiter.wait();
            let _ = tx.send(PumpEvent::Exited {
                id,
                generation,
                exit,
            });
        })
        .map(|_| ())
        .map_err(SessionError::Io)
}

/// Deliver one pump notice to its session, or drop it if stale.
pub(crate) fn route(registry: &mut SessionRegistry, event: PumpEvent) {
    match event {
        PumpEvent::Output {
            id,
            generation,
            bytes,
        } => match registry.get(&id) {
            Some(session) if session.generation() == generation && session.is_active() => {
                session.emit(SessionEvent::Data { id, bytes });
            }
            _ => trace!(session = %id, generation, len = bytes.len(), "Dropping stale output"),
        },
        PumpEvent::Exited {
            id,
            generation,
            exit,
        } => {
            let Some(session) = registry.get_mut(&id) else {
                debug!(session = %id, "Exit for unknown session");
                return;
            };
            if session.mark_exited(generation, &exit) {
                info!(
                    session = %id,
                    exit_code = exit.exit_code,
                    signal = exit.signal.as_deref().unwrap_or(""),
                    "Process exited"
                );
                session.emit(SessionEvent::Exited { id, exit });
            } else {
                trace!(session = %id, generation, "Dropping stale exit");
            }
        }
    }
}

/// Drain pump notices into the registry until every sender is gone.
pub(crate) async fn run(registry: Arc<Mutex<SessionRegistry>>, mut rx: mpsc::UnboundedReceiver<PumpEvent>) {
    while let Some(event) = rx.recv().await {
        let mut registry = registry.lock().await;
        route(&mut registry, event);
    }
    debug!("Session relay stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::Launcher;
    use crate::session::LiveProcess;
    use crate::testing::{launch_spec, FakeLauncher};
    use conduit_common::{ExitInfo, Geometry};
    use std::path::PathBuf;

    fn registry_with_running(id: &SessionId) -> (SessionRegistry, u64, mpsc::UnboundedReceiver<SessionEvent>) {
        let launcher = FakeLauncher::new();
        let handle = launcher.launch(&launch_spec()).unwrap();
        let mut registry = SessionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let session = registry.get_or_create(id, Geometry::DESKTOP);
        session.bind(tx);
        let generation = session.start(
            LiveProcess {
                pid: handle.pid,
                input: start_writer(id.clone(), handle.writer).unwrap(),
                control: handle.control,
            },
            PathBuf::from("/tmp"),
        );
        (registry, generation, rx)
    }

    #[tokio::test]
    async fn writer_keeps_input_order() {
        let launcher = FakeLauncher::new();
        let handle = launcher.launch(&launch_spec()).unwrap();
        let fake = launcher.last().unwrap();

        let input = start_writer(SessionId::from("tab-1"), handle.writer).unwrap();
        for chunk in [&b"one "[..], &b"two "[..], &b"three"[..]] {
            input.send(chunk.to_vec()).unwrap();
        }
        drop(input);

        assert_eq!(fake.written_eventually(13).await, b"one two three");
        assert_eq!(fake.writes().len(), 3);
    }

    #[tokio::test]
    async fn current_output_is_delivered() {
        let id = SessionId::from("tab-1");
        let (mut registry, generation, mut rx) = registry_with_running(&id);

        route(
            &mut registry,
            PumpEvent::Output {
                id: id.clone(),
                generation,
                bytes: b"hello".to_vec(),
            },
        );

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Data {
                id,
                bytes: b"hello".to_vec()
            }
        );
    }

    #[tokio::test]
    async fn stale_generation_is_dropped() {
        let id = SessionId::from("tab-1");
        let (mut registry, generation, mut rx) = registry_with_running(&id);

        route(
            &mut registry,
            PumpEvent::Output {
                id: id.clone(),
                generation: generation - 1,
                bytes: b"old".to_vec(),
            },
        );
        route(
            &mut registry,
            PumpEvent::Exited {
                id: id.clone(),
                generation: generation - 1,
                exit: ExitInfo::code(0),
            },
        );

        assert!(rx.try_recv().is_err());
        assert!(registry.get(&id).unwrap().is_active());
    }

    #[tokio::test]
    async fn exit_updates_state_then_notifies() {
        let id = SessionId::from("tab-1");
        let (mut registry, generation, mut rx) = registry_with_running(&id);

        route(
            &mut registry,
            PumpEvent::Exited {
                id: id.clone(),
                generation,
                exit: ExitInfo::code(3),
            },
        );

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Exited {
                id: id.clone(),
                exit: ExitInfo::code(3)
            }
        );
        assert!(!registry.get(&id).unwrap().is_active());

        // Output arriving after the exit has nowhere to go.
        route(
            &mut registry,
            PumpEvent::Output {
                id,
                generation,
                bytes: b"late".to_vec(),
            },
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn output_after_kill_is_dropped() {
        let id = SessionId::from("tab-1");
        let (mut registry, generation, mut rx) = registry_with_running(&id);

        registry.get_mut(&id).unwrap().kill();
        route(
            &mut registry,
            PumpEvent::Output {
                id: id.clone(),
                generation,
                bytes: b"after kill".to_vec(),
            },
        );
        route(
            &mut registry,
            PumpEvent::Exited {
                id,
                generation,
                exit: ExitInfo::code(1),
            },
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn pump_forwards_then_reports_exit() {
        let launcher = FakeLauncher::new();
        let handle = launcher.launch(&launch_spec()).unwrap();
        let fake = launcher.last().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = SessionId::from("tab-9");

        start_pump(id.clone(), 4, handle.reader, handle.waiter, tx).unwrap();
        fake.emit(b"one");
        fake.exit(ExitInfo::code(0));

        match rx.recv().await.unwrap() {
            PumpEvent::Output { generation, bytes, .. } => {
                assert_eq!(generation, 4);
                assert_eq!(bytes, b"one");
            }
            other => panic!("unexpected: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            PumpEvent::Exited { id: got, exit, .. } => {
                assert_eq!(got, id);
                assert_eq!(exit, ExitInfo::code(0));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
