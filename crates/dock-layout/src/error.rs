//! Error types for dock-layout.

use dock_core::CoreError;
use dock_xml::XmlError;
use thiserror::Error;

/// Result type for dock-layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Fatal errors of layout conversion, reading and writing.
///
/// A factory that is missing while *reading* is not an error: the payload is
/// kept raw inside the [`LayoutInfo`](crate::LayoutInfo) instead.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Version, property or structural error from the core format.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Truncated or unreadable stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML or missing XML element/attribute.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// No factory can encode a payload, or an element names an unknown factory.
    #[error("missing factory '{id}'")]
    MissingFactory { id: String },

    /// An empty layout cannot be serialized.
    #[error("cannot write an empty layout")]
    EmptyLayout,

    /// A payload handed to a factory is not of the factory's layout type.
    #[error("layout data does not belong to factory '{factory}'")]
    PayloadMismatch { factory: String },

    /// A composition nests deeper than the configured limit.
    #[error("composition nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    /// Structurally invalid layout data.
    #[error("invalid layout data: {0}")]
    InvalidData(String),
}

impl LayoutError {
    pub fn missing_factory(id: impl Into<String>) -> Self {
        Self::MissingFactory { id: id.into() }
    }

    /// Whether this error reports a format version newer than this build supports.
    pub fn is_unsupported_version(&self) -> bool {
        matches!(self, Self::Core(CoreError::UnsupportedVersion { .. }))
    }
}
