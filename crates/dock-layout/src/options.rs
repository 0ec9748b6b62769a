//! Options for reading and writing layouts.

use dock_core::Version;
use serde::{Deserialize, Serialize};

/// Options for writing compositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Wire layout to emit. Versions older than [`Version::CURRENT`] drop the
    /// pieces they cannot express (placeholders before 1.0.8, side records
    /// before 1.0.7).
    pub version: Version,
    /// Indent XML output.
    pub pretty: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            version: Version::CURRENT,
            pretty: false,
        }
    }
}

impl WriteOptions {
    /// Create default write options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an older wire layout.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Pretty-print XML output.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

/// Options for reading compositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// Deepest nesting accepted before a read fails with `TooDeep`.
    ///
    /// XML text is also bounded by the parser: every composition level takes
    /// two element levels (`children`, `child`) and [`dock_xml::parse`]
    /// accepts [`dock_xml::MAX_DEPTH`] of them, enough for the default limit
    /// with room for factory payloads.
    pub max_depth: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { max_depth: 512 }
    }
}

impl ReadOptions {
    /// Create default read options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
