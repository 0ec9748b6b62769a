//! Format versions.

use std::fmt;
use std::io::{Read, Write};

use crate::error::{CoreError, Result};
use crate::stream::{DataInput, DataOutput};

/// A three-part format version, compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Base layout: entries without side records or placeholders.
    pub const V1_0_4: Version = Version::new(1, 0, 4);
    /// Side ("adjacent") records follow every entry.
    pub const V1_0_7: Version = Version::new(1, 0, 7);
    /// Placeholders precede every entry; pinned entries carry a presence flag.
    pub const V1_0_8: Version = Version::new(1, 0, 8);
    /// Newest version written and read by this build.
    pub const CURRENT: Version = Version::V1_0_8;

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Fail with `UnsupportedVersion` if this version is newer than [`Version::CURRENT`].
    pub fn check_supported(self) -> Result<Self> {
        if self > Version::CURRENT {
            return Err(CoreError::UnsupportedVersion {
                found: self,
                supported: Version::CURRENT,
            });
        }
        Ok(self)
    }

    /// Write as three big-endian `i32`.
    pub fn write<W: Write + ?Sized>(self, out: &mut W) -> Result<()> {
        for part in [self.major, self.minor, self.patch] {
            let part = i32::try_from(part)
                .map_err(|_| CoreError::InvalidData(format!("version part {} out of range", part)))?;
            out.write_i32(part)?;
        }
        Ok(())
    }

    /// Read a version written by [`Version::write`]. Does not check support.
    pub fn read<R: Read + ?Sized>(input: &mut R) -> Result<Self> {
        let mut parts = [0u32; 3];
        for part in &mut parts {
            let raw = input.read_i32()?;
            *part = u32::try_from(raw)
                .map_err(|_| CoreError::InvalidData(format!("negative version part {}", raw)))?;
        }
        Ok(Version::new(parts[0], parts[1], parts[2]))
    }

    /// Parse the `major.minor.patch` text form.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidData(format!("malformed version '{}'", text));
        let mut parts = text.trim().split('.');
        let mut next = || -> Result<u32> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)
        };
        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
