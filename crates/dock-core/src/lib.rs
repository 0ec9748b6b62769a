//! dock-core: shared building blocks of the dock layout format.
//!
//! - [`Version`]: three-part format versions that gate wire layout changes
//! - [`Path`]: dot separated placeholder tokens
//! - [`DataOutput`] / [`DataInput`]: big-endian stream primitives
//! - [`LocationProperty`]: chains describing where an element sits below a root station
//! - [`PropertyCodec`]: reads and writes property chains as bytes or XML

pub mod error;
pub mod path;
pub mod property;
pub mod stream;
pub mod version;

pub use error::{CoreError, Result};
pub use path::Path;
pub use property::{
    DynProperty, GridProperty, LocationProperty, PropertyCodec, PropertyFactory, PropertyValue,
    ScreenProperty, StackProperty,
};
pub use stream::{DataInput, DataOutput};
pub use version::Version;
