//! Layout persistence and reconciliation for docking window trees.
//!
//! A host exposes its stations and dockables through [`DockTree`]. A
//! [`Situation`] converts that live tree into a [`LayoutComposition`], writes
//! compositions as binary streams or XML, reads them back and rebuilds live
//! elements from them.
//!
//! # Architecture
//!
//! 1. **Factories**: one [`ElementFactory`] per element kind, optional
//!    [`SideFactory`] instances for data stored next to an entry
//! 2. **Registry**: [`FactoryRegistry`] holds the factories together with the
//!    ignore, placeholder and fallback policies
//! 3. **Formats**: layouts whose factory is missing are kept raw and can be
//!    completed later with [`Situation::fill_missing`]
//! 4. **Estimation**: [`LocationEstimator`] derives the location of every
//!    element from the layouts of its ancestors
//! 5. **Identity**: [`IdentityPreservingRegistry`] reuses pinned live elements
//!    instead of building new ones
//!
//! # Example
//!
//! ```ignore
//! use dock_layout::{FactoryRegistry, ReadOptions, Situation, WriteOptions};
//!
//! let mut registry = FactoryRegistry::new();
//! registry.add_factory(StackFactory);
//!
//! let composition = registry.convert_element(&tree, &root)?.unwrap();
//! let bytes = registry.to_bytes(&composition, &WriteOptions::default())?;
//! let back = registry.from_bytes(&bytes, &ReadOptions::default())?;
//! let rebuilt = registry.convert_composition(&mut tree, &back)?;
//! ```

mod composition;
mod data;
mod error;
mod estimate;
mod factory;
mod info;
mod legacy;
mod options;
mod predefined;
mod registry;
mod side;
mod situation;
mod tree;

#[cfg(test)]
mod fixtures;

pub use composition::LayoutComposition;
pub use data::LayoutData;
pub use error::{LayoutError, Result};
pub use estimate::{LocationEstimationMap, LocationEstimator};
pub use factory::{
    BackupFactory, ChildIds, ChildMap, DynElementFactory, DynSideFactory, ElementFactory,
    MissingFactoryFallback, SideFactory,
};
pub use info::{LayoutInfo, LayoutKind, LayoutRecord};
pub use legacy::legacy_alias;
pub use options::{ReadOptions, WriteOptions};
pub use predefined::{IdentityPreservingRegistry, PredefinedLayout, DELEGATE_PREFIX, PREDEFINED};
pub use registry::FactoryRegistry;
pub use side::LocationSideFactory;
pub use situation::{CompositionMap, Situation};
pub use tree::{DockTree, IgnorePredicate, PlaceholderStrategy};

pub use dock_core::{LocationProperty, Path, PropertyCodec, Version};
pub use dock_xml::XElement;
