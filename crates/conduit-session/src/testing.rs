//! Scripted stand-ins for processes and time.
//!
//! [`FakeLauncher`] hands out processes whose output, exit, and received
//! input are driven and inspected from the test. [`InstantClock`] and
//! [`RecordingClock`] replace real sleeps in the text injector.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use conduit_common::{ExitInfo, Geometry, SessionError, SessionEvent};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::injector::Clock;
use crate::pty::{LaunchSpec, Launcher, ProcessControl, ProcessHandle, ProcessWaiter};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A plausible launch spec for tests that construct handles directly.
pub fn launch_spec() -> LaunchSpec {
    LaunchSpec {
        program: PathBuf::from("/usr/local/bin/claude"),
        args: Vec::new(),
        cwd: std::env::temp_dir(),
        env: BTreeMap::new(),
        geometry: Geometry::DESKTOP,
    }
}

/// Wait up to five seconds for the next event, panicking on timeout.
pub async fn next_event(rx: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

/// Collect `Data` payloads until `needle` has been seen, or five seconds pass.
pub async fn collect_output(rx: &mut UnboundedReceiver<SessionEvent>, needle: &str) -> String {
    let mut seen = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !seen.contains(needle) {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(SessionEvent::Data { bytes, .. })) => {
                seen.push_str(&String::from_utf8_lossy(&bytes));
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }
    seen
}

// =============================================================================
// FAKE PROCESSES
// =============================================================================

static NEXT_PID: AtomicU32 = AtomicU32::new(40_000);

#[derive(Default)]
struct FakeShared {
    output: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    exit: Mutex<Option<mpsc::Sender<ExitInfo>>>,
    writes: Mutex<Vec<Vec<u8>>>,
    resizes: Mutex<Vec<Geometry>>,
    killed: AtomicBool,
    stalled: AtomicBool,
}

impl FakeShared {
    fn finish(&self, exit: ExitInfo) {
        // Close output before reporting the exit, as a real PTY does.
        locked(&self.output).take();
        if let Some(tx) = locked(&self.exit).take() {
            let _ = tx.send(exit);
        }
    }
}

/// Test-side view of one launched fake process.
#[derive(Clone)]
pub struct FakeProcess {
    shared: Arc<FakeShared>,
    pub pid: u32,
    pub spec: LaunchSpec,
}

impl FakeProcess {
    /// Produce output as if the child wrote `bytes` to its terminal.
    pub fn emit(&self, bytes: &[u8]) {
        if let Some(tx) = locked(&self.shared.output).as_ref() {
            let _ = tx.send(bytes.to_vec());
        }
    }

    /// End the process on its own with `exit`.
    pub fn exit(&self, exit: ExitInfo) {
        self.shared.finish(exit);
    }

    /// Every `write_all` received, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        locked(&self.shared.writes).clone()
    }

    /// All received input concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.writes().concat()
    }

    /// Input received so far, once at least `len` bytes have arrived or
    /// five seconds have passed. Writes land on a separate thread.
    pub async fn written_eventually(&self, len: usize) -> Vec<u8> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let seen = self.written();
            if seen.len() >= len || tokio::time::Instant::now() >= deadline {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Stop consuming input, like a child whose terminal buffer is full.
    /// Writes block until the process is killed.
    pub fn stall_input(&self) {
        self.shared.stalled.store(true, Ordering::SeqCst);
    }

    pub fn resizes(&self) -> Vec<Geometry> {
        locked(&self.shared.resizes).clone()
    }

    pub fn is_killed(&self) -> bool {
        self.shared.killed.load(Ordering::SeqCst)
    }

    /// Neither killed nor exited.
    pub fn is_alive(&self) -> bool {
        locked(&self.shared.exit).is_some()
    }
}

/// Launcher that records specs and hands out [`FakeProcess`]es.
#[derive(Default)]
pub struct FakeLauncher {
    processes: Mutex<Vec<FakeProcess>>,
    fail_with: Mutex<Option<String>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A launcher whose every launch fails with `SpawnFailed(reason)`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let launcher = Self::default();
        *locked(&launcher.fail_with) = Some(reason.into());
        launcher
    }

    pub fn processes(&self) -> Vec<FakeProcess> {
        locked(&self.processes).clone()
    }

    pub fn last(&self) -> Option<FakeProcess> {
        locked(&self.processes).last().cloned()
    }

    pub fn launch_count(&self) -> usize {
        locked(&self.processes).len()
    }

    pub fn alive_count(&self) -> usize {
        locked(&self.processes)
            .iter()
            .filter(|p| p.is_alive())
            .count()
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<ProcessHandle, SessionError> {
        if let Some(reason) = locked(&self.fail_with).clone() {
            return Err(SessionError::SpawnFailed(reason));
        }

        let (output_tx, output_rx) = mpsc::channel();
        let (exit_tx, exit_rx) = mpsc::channel();
        let shared = Arc::new(FakeShared {
            output: Mutex::new(Some(output_tx)),
            exit: Mutex::new(Some(exit_tx)),
            ..Default::default()
        });
        let pid = NEXT_PID.fetch_add(1, Ordering::Relaxed);

        locked(&self.processes).push(FakeProcess {
            shared: Arc::clone(&shared),
            pid,
            spec: spec.clone(),
        });

        Ok(ProcessHandle {
            pid: Some(pid),
            writer: Box::new(FakeWriter {
                shared: Arc::clone(&shared),
            }),
            reader: Box::new(FakeReader {
                rx: output_rx,
                pending: Vec::new(),
            }),
            control: Box::new(FakeControl { shared }),
            waiter: Box::new(FakeWaiter { rx: exit_rx }),
        })
    }
}

struct FakeReader {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for FakeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

struct FakeWriter {
    shared: Arc<FakeShared>,
}

impl Write for FakeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        while self.shared.stalled.load(Ordering::SeqCst)
            && !self.shared.killed.load(Ordering::SeqCst)
        {
            std::thread::sleep(Duration::from_millis(5));
        }
        if self.shared.killed.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "process killed"));
        }
        locked(&self.shared.writes).push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct FakeControl {
    shared: Arc<FakeShared>,
}

impl ProcessControl for FakeControl {
    fn resize(&self, geometry: Geometry) -> Result<(), SessionError> {
        locked(&self.shared.resizes).push(geometry);
        Ok(())
    }

    fn kill(&mut self) -> Result<(), SessionError> {
        self.shared.killed.store(true, Ordering::SeqCst);
        self.shared.finish(ExitInfo {
            exit_code: 1,
            signal: Some("SIGKILL".into()),
        });
        Ok(())
    }
}

struct FakeWaiter {
    rx: mpsc::Receiver<ExitInfo>,
}

impl ProcessWaiter for FakeWaiter {
    fn wait(self: Box<Self>) -> ExitInfo {
        self.rx.recv().unwrap_or_else(|_| ExitInfo::code(1))
    }
}

// =============================================================================
// CLOCKS
// =============================================================================

/// Returns from every sleep immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantClock;

#[async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

/// Records requested sleeps without waiting.
#[derive(Debug, Default, Clone)]
pub struct RecordingClock {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        locked(&self.sleeps).clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        locked(&self.sleeps).push(duration);
        tokio::task::yield_now().await;
    }
}
