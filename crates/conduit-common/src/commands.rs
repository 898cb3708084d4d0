use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::SessionId;

/// Consumer → core requests, independent of how they travel (in-process
/// call or a message on a socket).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionCommand {
    Spawn {
        id: SessionId,
        #[serde(default)]
        working_directory: Option<PathBuf>,
    },
    Write {
        id: SessionId,
        bytes: Vec<u8>,
    },
    /// Whole-line text from a source that does not emit per-key events.
    SubmitText {
        id: SessionId,
        text: String,
    },
    Resize {
        id: SessionId,
        cols: u16,
        rows: u16,
    },
    Kill {
        id: SessionId,
    },
}

impl SessionCommand {
    pub fn session_id(&self) -> &SessionId {
        match self {
            SessionCommand::Spawn { id, .. }
            | SessionCommand::Write { id, .. }
            | SessionCommand::SubmitText { id, .. }
            | SessionCommand::Resize { id, .. }
            | SessionCommand::Kill { id } => id,
        }
    }
}
