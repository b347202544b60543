//! Layout version of persisted chain files.
//!
//! Every chain file records the layout it was written with. A reader refuses
//! a file whose major version differs from its own, since block records may
//! have changed shape; minor bumps only add optional fields.

use std::fmt;

use crate::FORMAT_VERSION;

/// Chain file layout version, stored next to the blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl FormatVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The layout this build writes into chain files.
    pub const fn current() -> Self {
        Self::new(FORMAT_VERSION, 0)
    }

    /// Returns true if a chain file with this layout can be loaded and
    /// appended to by this build.
    pub fn is_compatible(&self) -> bool {
        self.major == FORMAT_VERSION
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
