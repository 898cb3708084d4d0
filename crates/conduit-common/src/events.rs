use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::id::SessionId;

/// How a child process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    pub exit_code: u32,
    /// Name of the terminating signal, if the child was killed by one.
    pub signal: Option<String>,
}

impl ExitInfo {
    pub fn code(exit_code: u32) -> Self {
        Self {
            exit_code,
            signal: None,
        }
    }
}

/// Core → consumer notifications, always tagged with the session they
/// belong to so one transport can carry several tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Data { id: SessionId, bytes: Vec<u8> },
    Exited { id: SessionId, exit: ExitInfo },
    Error { id: SessionId, message: String },
}

impl SessionEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            SessionEvent::Data { id, .. }
            | SessionEvent::Exited { id, .. }
            | SessionEvent::Error { id, .. } => id,
        }
    }
}

/// The channel a consumer binds to a session. Unbounded: queuing is left to
/// the consumer's transport, the core keeps no flow-control window.
pub type EventSink = mpsc::UnboundedSender<SessionEvent>;
