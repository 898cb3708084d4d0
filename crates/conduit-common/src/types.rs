use serde::{Deserialize, Serialize};

/// Display size of a session in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

impl Geometry {
    /// Starting size for desktop tabs until the surface reports its own.
    pub const DESKTOP: Geometry = Geometry { cols: 120, rows: 40 };

    /// Starting size for network connections.
    pub const NETWORK: Geometry = Geometry { cols: 80, rows: 24 };

    /// Largest dimension accepted from a consumer.
    pub const MAX_DIMENSION: u16 = 500;

    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Whether both dimensions are non-zero and within `MAX_DIMENSION`.
    pub fn is_sane(&self) -> bool {
        self.cols > 0
            && self.rows > 0
            && self.cols <= Self::MAX_DIMENSION
            && self.rows <= Self::MAX_DIMENSION
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::DESKTOP
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}
