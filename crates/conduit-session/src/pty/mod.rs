//! Pseudo-terminal process launching.
//!
//! [`Launcher`] is the seam between session bookkeeping and the OS. The
//! production implementation is [`PtyLauncher`]; tests substitute scripted
//! fakes from [`crate::testing`].

mod spawn;
mod types;

pub use spawn::{PtyLauncher, PTY_READ_CHUNK};
pub use types::{LaunchSpec, Launcher, ProcessControl, ProcessHandle, ProcessWaiter};
