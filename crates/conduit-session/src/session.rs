//! Per-session state.
//!
//! A [`ProcessSession`] outlives the processes it runs: after an exit or a
//! kill the entry stays, remembers its directory and geometry, and can be
//! spawned again in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use conduit_common::{EventSink, ExitInfo, Geometry, SessionEvent, SessionId};
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::pty::ProcessControl;
use crate::relay::InputSender;

/// Label used when the working directory has no final component.
pub const DEFAULT_LABEL: &str = "Session";

/// Lifecycle state. Only `Running` accepts input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Unspawned,
    Running,
    Exited { exit: ExitInfo },
    Killed,
}

/// Read-only view of a session for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub label: String,
    pub working_directory: PathBuf,
    pub geometry: Geometry,
    #[serde(flatten)]
    pub state: SessionState,
    pub pid: Option<u32>,
}

/// The parts of a launched process the session keeps. The writer lives on
/// its own thread behind `input`; the reader and waiter live on the output
/// pump thread.
pub(crate) struct LiveProcess {
    pub pid: Option<u32>,
    pub input: InputSender,
    pub control: Box<dyn ProcessControl>,
}

impl Drop for LiveProcess {
    fn drop(&mut self) {
        // The process may already be gone
        let _ = self.control.kill();
    }
}

pub struct ProcessSession {
    id: SessionId,
    working_directory: PathBuf,
    label: String,
    geometry: Geometry,
    state: SessionState,
    /// Bumped whenever a process is attached or detached, so output and
    /// exit notices from a replaced process can be told apart.
    generation: u64,
    process: Option<LiveProcess>,
    sink: Option<EventSink>,
    input_lock: Arc<tokio::sync::Mutex<()>>,
}

impl ProcessSession {
    pub fn new(id: SessionId, geometry: Geometry) -> Self {
        let working_directory = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Self {
            label: label_for(&working_directory),
            id,
            working_directory,
            geometry,
            state: SessionState::Unspawned,
            generation: 0,
            process: None,
            sink: None,
            input_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid)
    }

    /// True while a process is attached and has not exited.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Running && self.process.is_some()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Serializes whole-text submissions to this session.
    pub(crate) fn input_lock(&self) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(&self.input_lock)
    }

    /// Route this session's events to `sink`, replacing any previous one.
    pub fn bind(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    pub fn unbind(&mut self) {
        self.sink = None;
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Some(sink) = &self.sink {
            if sink.send(event).is_err() {
                trace!(session = %self.id, "Event sink closed");
            }
        }
    }

    /// Attach a freshly launched process. Returns the generation the
    /// process's output must carry.
    pub(crate) fn start(&mut self, process: LiveProcess, working_directory: PathBuf) -> u64 {
        self.terminate();
        self.label = label_for(&working_directory);
        self.working_directory = working_directory;
        self.process = Some(process);
        self.state = SessionState::Running;
        self.generation += 1;
        self.generation
    }

    /// Queue bytes for the process. Never blocks; dropped silently unless
    /// running.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.state != SessionState::Running {
            trace!(session = %self.id, len = bytes.len(), "Dropping input for inactive session");
            return;
        }
        let Some(process) = self.process.as_ref() else {
            return;
        };
        if process.input.send(bytes.to_vec()).is_err() {
            debug!(session = %self.id, "PTY writer gone, dropping input");
        }
    }

    /// Record a new size and apply it to the live process, if any. Sizes
    /// outside the accepted range are ignored.
    pub fn resize(&mut self, geometry: Geometry) {
        if !geometry.is_sane() {
            debug!(session = %self.id, %geometry, "Ignoring out-of-range resize");
            return;
        }
        self.geometry = geometry;
        if let Some(process) = &self.process {
            if let Err(e) = process.control.resize(geometry) {
                debug!(session = %self.id, %geometry, "PTY resize failed: {e}");
            }
        }
    }

    /// Stop the live process, if any, without touching the sink. Output or
    /// an exit notice still in flight from it is discarded.
    pub(crate) fn terminate(&mut self) -> bool {
        let Some(mut process) = self.process.take() else {
            return false;
        };
        if let Err(e) = process.control.kill() {
            debug!(session = %self.id, "Kill failed (process likely already gone): {e}");
        }
        self.generation += 1;
        if self.state == SessionState::Running {
            self.state = SessionState::Killed;
        }
        true
    }

    /// Best-effort termination. Always leaves the session in `Killed`.
    pub fn kill(&mut self) {
        if self.terminate() {
            info!(session = %self.id, "Session killed");
        }
        self.state = SessionState::Killed;
    }

    /// Record a natural exit reported by the pump. Returns `false` if the
    /// notice belongs to a process this session no longer owns.
    pub(crate) fn mark_exited(&mut self, generation: u64, exit: &ExitInfo) -> bool {
        if generation != self.generation || !self.is_active() {
            return false;
        }
        self.process = None;
        self.generation += 1;
        self.state = SessionState::Exited { exit: exit.clone() };
        true
    }

    pub fn snapshot(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            label: self.label.clone(),
            working_directory: self.working_directory.clone(),
            geometry: self.geometry,
            state: self.state.clone(),
            pid: self.pid(),
        }
    }
}

/// Human label for a working directory: its last path component.
pub fn label_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_LABEL.to_string())
}
