//! Desktop session geometry.

use conduit_common::Geometry;
use serde::{Deserialize, Serialize};

/// Starting size for locally hosted sessions, used until the display
/// surface reports its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub cols: u16,
    pub rows: u16,
}

impl TerminalConfig {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.cols, self.rows)
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        let Geometry { cols, rows } = Geometry::DESKTOP;
        Self { cols, rows }
    }
}
