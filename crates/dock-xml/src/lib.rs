//! dock-xml: an owned XML element tree for dock layout files.
//!
//! Layout files only need a small slice of XML: nested elements, attributes,
//! text values and comments. This crate keeps that slice in a plain owned tree
//! ([`XElement`]) that factories read from and write into, a `nom` based
//! [`parse`] function, and a writer with optional indentation.
//!
//! ```ignore
//! use dock_xml::XElement;
//!
//! let mut root = XElement::new("layout");
//! root.add_string("factory", "grid");
//! root.add_element("cell").add_int("x", 1);
//!
//! let text = root.to_xml(true);
//! let back = dock_xml::parse(&text)?;
//! assert_eq!(root, back);
//! ```

mod element;
mod error;
mod parser;
mod writer;

pub use element::XElement;
pub use error::{Result, XmlError};
pub use parser::{parse, MAX_DEPTH};
