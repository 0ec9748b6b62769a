//! Placeholder paths.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::CoreError;

/// A dot separated token such as `dock.single.editor`.
///
/// Placeholders name an invisible slot that an element once occupied, so a
/// station can keep the slot open while the element is absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    segments: SmallVec<[String; 4]>,
}

impl Path {
    /// Build a path from individual segments.
    ///
    /// Segments must be non-empty and must not contain `.`.
    pub fn new<I, S>(segments: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: SmallVec<[String; 4]> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(CoreError::InvalidData("empty placeholder path".into()));
        }
        if let Some(bad) = segments.iter().find(|s| s.is_empty() || s.contains('.')) {
            return Err(CoreError::InvalidData(format!(
                "invalid placeholder segment '{}'",
                bad
            )));
        }
        Ok(Self { segments })
    }

    /// Parse the dotted text form.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        Self::new(text.split('.'))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// A new path with `segment` appended.
    pub fn append(&self, segment: impl Into<String>) -> Result<Self, CoreError> {
        Self::new(self.segments.iter().cloned().chain(std::iter::once(segment.into())))
    }

    /// Whether `self` starts with every segment of `prefix`.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}
