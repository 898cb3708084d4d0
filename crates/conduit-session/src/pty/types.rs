//! Types shared by every launcher implementation.

use std::io::{Read, Write};
use std::path::PathBuf;

use conduit_common::{ExitInfo, Geometry, SessionError};

use crate::env::Environment;

/// Everything needed to start one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Complete child environment. Nothing else is inherited.
    pub env: Environment,
    pub geometry: Geometry,
}

/// Control half of a running process: geometry and termination.
pub trait ProcessControl: Send {
    fn resize(&self, geometry: Geometry) -> Result<(), SessionError>;

    /// Request termination. Calling this on an already-dead process is not
    /// an error worth surfacing; implementations may return one anyway.
    fn kill(&mut self) -> Result<(), SessionError>;
}

/// Reaps the child once its output stream is drained.
pub trait ProcessWaiter: Send {
    /// Block until the child exits.
    fn wait(self: Box<Self>) -> ExitInfo;
}

/// A freshly launched process, split into the pieces the session layer
/// hands to different owners: the writer and control stay with the
/// session, the reader and waiter move to the output pump thread.
pub struct ProcessHandle {
    pub pid: Option<u32>,
    pub writer: Box<dyn Write + Send>,
    pub reader: Box<dyn Read + Send>,
    pub control: Box<dyn ProcessControl>,
    pub waiter: Box<dyn ProcessWaiter>,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Starts child processes attached to a terminal of the requested size.
pub trait Launcher: Send + Sync {
    fn launch(&self, spec: &LaunchSpec) -> Result<ProcessHandle, SessionError>;
}
