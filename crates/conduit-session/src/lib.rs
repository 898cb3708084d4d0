//! conduit-session: process sessions behind pseudo-terminals.
//!
//! Spawns one interactive child per logical session, relays its raw byte
//! stream to whichever consumer is bound to that session, forwards consumer
//! input and geometry back, and keeps lifecycle state (running, exited,
//! killed) so a consumer can restart a session in place.
//!
//! # Architecture
//!
//! - [`BinaryLocator`]: finds the target executable on every spawn.
//! - [`EnvPolicy`]: shapes the child's copy of the host environment.
//! - [`pty`]: the [`Launcher`] seam and its `portable-pty` implementation.
//! - [`ProcessSession`] / [`SessionRegistry`]: per-session state and the
//!   map that owns it.
//! - [`TextInjector`]: timed per-character submission for block text.
//! - [`SessionHost`]: the context object tying it all together; one per
//!   host process.

pub mod env;
pub mod host;
pub mod injector;
pub mod locator;
pub mod pty;
pub mod registry;
mod relay;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use env::{EnvPolicy, Environment};
pub use host::{HostSettings, SessionHost};
pub use injector::{Clock, InputTarget, TextInjector, TokioClock};
pub use locator::BinaryLocator;
pub use pty::{LaunchSpec, Launcher, ProcessHandle, PtyLauncher};
pub use registry::SessionRegistry;
pub use session::{ProcessSession, SessionInfo, SessionState};
