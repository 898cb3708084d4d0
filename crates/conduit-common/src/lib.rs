pub mod commands;
pub mod errors;
pub mod events;
pub mod id;
pub mod types;

pub use commands::SessionCommand;
pub use errors::{ConduitError, ConfigError, SessionError};
pub use events::{EventSink, ExitInfo, SessionEvent};
pub use id::{new_id, SessionId};
pub use types::Geometry;

pub type Result<T> = std::result::Result<T, ConduitError>;
