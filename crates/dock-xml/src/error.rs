//! Error types for dock-xml.

use thiserror::Error;

/// Result type for XML operations.
pub type Result<T> = std::result::Result<T, XmlError>;

/// Errors raised while parsing XML text or reading values out of an element tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    /// The text is not well formed.
    #[error("xml parse error at byte {offset}: {message}")]
    Parse {
        /// What went wrong.
        message: String,
        /// Byte offset into the source text.
        offset: usize,
    },

    /// A required child element is absent.
    #[error("missing element <{name}> in <{parent}>")]
    MissingElement { parent: String, name: String },

    /// A required attribute is absent.
    #[error("missing attribute '{name}' on <{element}>")]
    MissingAttribute { element: String, name: String },

    /// An attribute exists but its value has the wrong shape.
    #[error("invalid value '{value}' for attribute '{name}' on <{element}>")]
    InvalidValue {
        element: String,
        name: String,
        value: String,
    },
}

impl XmlError {
    /// Create a parse error at a byte offset.
    pub fn parse_at(message: impl Into<String>, offset: usize) -> Self {
        Self::Parse {
            message: message.into(),
            offset,
        }
    }
}
