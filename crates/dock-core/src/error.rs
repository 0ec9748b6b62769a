//! Error types for dock-core.

use crate::version::Version;
use dock_xml::XmlError;
use thiserror::Error;

/// Result type for dock-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while encoding or decoding core format pieces.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The stream declares a format this build cannot read.
    #[error("unsupported version {found}, newest supported is {supported}")]
    UnsupportedVersion { found: Version, supported: Version },

    /// A location property names a factory that is not registered.
    #[error("no property factory registered for '{0}'")]
    UnknownProperty(String),

    /// Structurally invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Truncated or unreadable stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML.
    #[error(transparent)]
    Xml(#[from] XmlError),
}
