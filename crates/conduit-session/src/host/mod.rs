//! The session host: one context object per process that owns the
//! registry, launches children, and routes their output.
//!
//! `SessionHost` is cheap to clone; clones share state. Constructing one
//! starts the relay task, so it must happen inside a Tokio runtime.

mod settings;


pub use settings::HostSettings;

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use conduit_common::{EventSink, Geometry, SessionCommand, SessionError, SessionEvent, SessionId};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::env::EnvPolicy;
use crate::injector::{Clock, InputTarget, TextInjector, TokioClock};
use crate::locator::BinaryLocator;
use crate::pty::{LaunchSpec, Launcher, ProcessHandle, PtyLauncher};
use crate::registry::SessionRegistry;
use crate::relay::{self, PumpSender};
use crate::session::{LiveProcess, SessionInfo};

/// Longest text fragment written to logs.
const LOG_PREVIEW_CHARS: usize = 80;

#[derive(Clone)]
pub struct SessionHost {
    inner: Arc<HostInner>,
}

struct HostInner {
    registry: Arc<Mutex<SessionRegistry>>,
    locator: RwLock<BinaryLocator>,
    launcher: Arc<dyn Launcher>,
    env: EnvPolicy,
    args: Vec<String>,
    default_geometry: Geometry,
    default_directory: Option<PathBuf>,
    injector: TextInjector,
    pump_tx: PumpSender,
}

impl SessionHost {
    pub fn new(settings: HostSettings, launcher: Arc<dyn Launcher>, clock: Arc<dyn Clock>) -> Self {
        let registry = Arc::new(Mutex::new(SessionRegistry::new()));
        let (pump_tx, pump_rx) = mpsc::unbounded_channel();
        tokio::spawn(relay::run(Arc::clone(&registry), pump_rx));

        Self {
            inner: Arc::new(HostInner {
                registry,
                locator: RwLock::new(settings.locator),
                launcher,
                env: settings.env,
                args: settings.args,
                default_geometry: settings.default_geometry,
                default_directory: settings.default_directory,
                injector: TextInjector::new(clock),
                pump_tx,
            }),
        }
    }

    /// A host that launches real PTY processes and sleeps in real time.
    pub fn with_pty(settings: HostSettings) -> Self {
        Self::new(settings, Arc::new(PtyLauncher), Arc::new(TokioClock))
    }

    pub fn default_geometry(&self) -> Geometry {
        self.inner.default_geometry
    }

    // -------------------------------------------------------------------------
    // Binary resolution
    // -------------------------------------------------------------------------

    fn locator(&self) -> BinaryLocator {
        match self.inner.locator.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Resolve the target executable exactly as the next spawn would.
    pub async fn locate(&self) -> Result<PathBuf, SessionError> {
        self.locator().resolve().await
    }

    /// Replace the binary override used by future spawns.
    pub fn set_binary_override(&self, path: Option<PathBuf>) {
        let mut guard = match self.inner.locator.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.set_override(path);
    }

    // -------------------------------------------------------------------------
    // Session operations
    // -------------------------------------------------------------------------

    /// Create the session if needed and route its events to `sink`.
    pub async fn attach(&self, id: &SessionId, sink: EventSink) {
        let mut registry = self.inner.registry.lock().await;
        registry
            .get_or_create(id, self.inner.default_geometry)
            .bind(sink);
        debug!(session = %id, "Consumer attached");
    }

    /// Stop routing events for `id`. The process keeps running.
    pub async fn detach(&self, id: &SessionId) {
        if let Some(session) = self.inner.registry.lock().await.get_mut(id) {
            session.unbind();
        }
    }

    /// Launch the target program for `id`, replacing any process the
    /// session already has. Failures are reported both as the returned
    /// error and as an `Error` event on the session's sink.
    pub async fn spawn(
        &self,
        id: &SessionId,
        working_directory: Option<PathBuf>,
    ) -> Result<(), SessionError> {
        {
            let mut registry = self.inner.registry.lock().await;
            registry
                .get_or_create(id, self.inner.default_geometry)
                .terminate();
        }

        let program = match self.locate().await {
            Ok(program) => program,
            Err(e) => {
                warn!(session = %id, "{e}");
                self.report_error(id, &e).await;
                return Err(e);
            }
        };

        let cwd = self.resolve_directory(working_directory);
        let env = self.inner.env.child_environment();

        let mut registry = self.inner.registry.lock().await;
        let session = registry.get_or_create(id, self.inner.default_geometry);
        // A concurrent spawn may have launched while the lock was released.
        session.terminate();

        let spec = LaunchSpec {
            program,
            args: self.inner.args.clone(),
            cwd,
            env,
            geometry: session.geometry(),
        };

        let handle = match self.inner.launcher.launch(&spec) {
            Ok(handle) => handle,
            Err(e) => {
                error!(session = %id, program = %spec.program.display(), "Spawn failed: {e}");
                session.emit(error_event(id, &e));
                return Err(e);
            }
        };

        let ProcessHandle {
            pid,
            writer,
            reader,
            mut control,
            waiter,
        } = handle;

        let input = match relay::start_writer(id.clone(), writer) {
            Ok(input) => input,
            Err(e) => {
                error!(session = %id, "Failed to start input pump: {e}");
                let _ = control.kill();
                session.emit(error_event(id, &e));
                return Err(e);
            }
        };
        let generation = session.start(
            LiveProcess {
                pid,
                input,
                control,
            },
            spec.cwd.clone(),
        );

        if let Err(e) = relay::start_pump(
            id.clone(),
            generation,
            reader,
            waiter,
            self.inner.pump_tx.clone(),
        ) {
            error!(session = %id, "Failed to start output pump: {e}");
            session.kill();
            session.emit(error_event(id, &e));
            return Err(e);
        }

        info!(
            session = %id,
            pid = pid.unwrap_or_default(),
            program = %spec.program.display(),
            cwd = %spec.cwd.display(),
            geometry = %spec.geometry,
            "Session spawned"
        );
        Ok(())
    }

    /// Forward raw bytes. Dropped unless the session is running.
    pub async fn write(&self, id: &SessionId, bytes: &[u8]) {
        let mut registry = self.inner.registry.lock().await;
        match registry.get_mut(id) {
            Some(session) => session.write(bytes),
            None => debug!(session = %id, "Write for unknown session"),
        }
    }

    /// Type `text` then press Enter, in the background. Submissions to the
    /// same session run one after another, never interleaved.
    pub fn submit_text(&self, id: &SessionId, text: String) -> JoinHandle<()> {
        debug!(session = %id, text = %preview(&text), "Submitting text");
        let host = self.clone();
        let id = id.clone();

        tokio::spawn(async move {
            let lock = {
                let registry = host.inner.registry.lock().await;
                match registry.get(&id) {
                    Some(session) => session.input_lock(),
                    None => {
                        debug!(session = %id, "Submit for unknown session");
                        return;
                    }
                }
            };
            let _serial = lock.lock().await;

            // Pin the submission to the process running now. A restart or
            // kill mid-sequence turns the remaining writes into no-ops.
            let generation = match host.inner.registry.lock().await.get(&id) {
                Some(session) if session.is_active() => session.generation(),
                _ => {
                    debug!(session = %id, "Submit for inactive session");
                    return;
                }
            };

            let target = SessionInput {
                registry: Arc::clone(&host.inner.registry),
                id,
                generation,
            };
            host.inner.injector.inject(&target, &text).await;
        })
    }

    /// Record a new size and apply it to the live process, if any.
    pub async fn resize(&self, id: &SessionId, cols: u16, rows: u16) {
        let mut registry = self.inner.registry.lock().await;
        match registry.get_mut(id) {
            Some(session) => session.resize(Geometry::new(cols, rows)),
            None => debug!(session = %id, cols, rows, "Resize for unknown session"),
        }
    }

    /// Terminate the session's process. The entry stays and can respawn.
    pub async fn kill(&self, id: &SessionId) {
        if let Some(session) = self.inner.registry.lock().await.get_mut(id) {
            session.kill();
        }
    }

    /// Terminate and forget a session.
    pub async fn remove(&self, id: &SessionId) {
        if self.inner.registry.lock().await.remove(id).is_some() {
            debug!(session = %id, "Session removed");
        }
    }

    /// Kill every session. Safe to call more than once.
    pub async fn shutdown(&self) -> usize {
        self.inner.registry.lock().await.kill_all()
    }

    pub async fn snapshot(&self, id: &SessionId) -> Option<SessionInfo> {
        self.inner
            .registry
            .lock()
            .await
            .get(id)
            .map(|session| session.snapshot())
    }

    pub async fn sessions(&self) -> Vec<SessionInfo> {
        let registry = self.inner.registry.lock().await;
        registry
            .ids()
            .iter()
            .filter_map(|id| registry.get(id).map(|session| session.snapshot()))
            .collect()
    }

    /// Apply a consumer command. Spawn failures surface as `Error` events.
    pub async fn dispatch(&self, command: SessionCommand) {
        match command {
            SessionCommand::Spawn {
                id,
                working_directory,
            } => {
                let _ = self.spawn(&id, working_directory).await;
            }
            SessionCommand::Write { id, bytes } => self.write(&id, &bytes).await,
            SessionCommand::SubmitText { id, text } => {
                self.submit_text(&id, text);
            }
            SessionCommand::Resize { id, cols, rows } => self.resize(&id, cols, rows).await,
            SessionCommand::Kill { id } => self.kill(&id).await,
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn resolve_directory(&self, requested: Option<PathBuf>) -> PathBuf {
        let home = dirs::home_dir();
        let dir = requested
            .or_else(|| self.inner.default_directory.clone())
            .or_else(|| home.clone())
            .unwrap_or_else(|| PathBuf::from("/"));
        if dir.is_absolute() {
            dir
        } else {
            home.as_deref().unwrap_or(Path::new("/")).join(dir)
        }
    }

    async fn report_error(&self, id: &SessionId, err: &SessionError) {
        let mut registry = self.inner.registry.lock().await;
        registry
            .get_or_create(id, self.inner.default_geometry)
            .emit(error_event(id, err));
    }
}

fn error_event(id: &SessionId, err: &SessionError) -> SessionEvent {
    SessionEvent::Error {
        id: id.clone(),
        message: err.to_string(),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= LOG_PREVIEW_CHARS {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
        cut.push('…');
        cut
    }
}

/// Writes into one process of a session through the shared registry.
struct SessionInput {
    registry: Arc<Mutex<SessionRegistry>>,
    id: SessionId,
    /// Generation of the process the submission started against.
    generation: u64,
}

#[async_trait]
impl InputTarget for SessionInput {
    async fn write_input(&self, bytes: &[u8]) {
        let mut registry = self.registry.lock().await;
        match registry.get_mut(&self.id) {
            Some(session) if session.generation() == self.generation && session.is_active() => {
                session.write(bytes);
            }
            _ => trace!(session = %self.id, "Dropping injected input for replaced process"),
        }
    }
}
