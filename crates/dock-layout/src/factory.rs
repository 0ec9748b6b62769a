//! Factory plugins.
//!
//! Factories are written against typed layouts ([`ElementFactory::Layout`],
//! [`SideFactory::Layout`]). The registry stores them behind the erased
//! `Dyn*` traits, which are implemented for every typed factory and check the
//! payload type on every call.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use dock_xml::XElement;
use indexmap::IndexMap;

use crate::data::LayoutData;
use crate::error::{LayoutError, Result};
use crate::estimate::LocationEstimationMap;
use crate::info::{LayoutInfo, LayoutRecord};
use crate::tree::DockTree;

/// Converted children of a station, keyed by their position in the composition.
pub type ChildMap<E> = BTreeMap<usize, E>;

/// Positional ids handed out to the converted children of a station.
///
/// Ignored children have no id; ids are dense and start at 0.
pub type ChildIds<E> = IndexMap<E, usize>;

/// Converts between one kind of live element and its layout.
pub trait ElementFactory<T: DockTree>: 'static {
    /// The structured layout of the element kind.
    type Layout: fmt::Debug + PartialEq + 'static;

    /// Unique id, written in front of every payload.
    fn id(&self) -> &str;

    /// Describe `element`. `children` maps each converted child to its id.
    fn layout_of(
        &self,
        tree: &T,
        element: &T::Element,
        children: &ChildIds<T::Element>,
    ) -> Result<Self::Layout>;

    /// Build a new element. `children` is `None` when the stored children are
    /// not to be used; otherwise every entry is detached and may be adopted.
    fn create(
        &self,
        tree: &mut T,
        layout: &Self::Layout,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<Option<T::Element>>;

    /// Reconfigure an existing element.
    fn set_layout(
        &self,
        tree: &mut T,
        element: &T::Element,
        layout: &Self::Layout,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<()>;

    /// Report the locations of the children described by `layout`.
    fn estimate_locations(&self, _layout: &Self::Layout, _map: &mut LocationEstimationMap<'_>) {}

    fn write(&self, layout: &Self::Layout, out: &mut dyn Write) -> Result<()>;

    fn read(&self, input: &mut dyn Read) -> Result<Self::Layout>;

    fn write_xml(&self, layout: &Self::Layout, element: &mut XElement) -> Result<()>;

    fn read_xml(&self, element: &XElement) -> Result<Self::Layout>;
}

/// Object-safe form of [`ElementFactory`].
pub trait DynElementFactory<T: DockTree> {
    fn dyn_id(&self) -> &str;

    fn dyn_layout_of(
        &self,
        tree: &T,
        element: &T::Element,
        children: &ChildIds<T::Element>,
    ) -> Result<Arc<dyn LayoutData>>;

    fn dyn_create(
        &self,
        tree: &mut T,
        layout: &dyn LayoutData,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<Option<T::Element>>;

    fn dyn_set_layout(
        &self,
        tree: &mut T,
        element: &T::Element,
        layout: &dyn LayoutData,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<()>;

    fn dyn_estimate_locations(
        &self,
        layout: &dyn LayoutData,
        map: &mut LocationEstimationMap<'_>,
    ) -> Result<()>;

    fn dyn_write(&self, layout: &dyn LayoutData, out: &mut dyn Write) -> Result<()>;

    fn dyn_read(&self, input: &mut dyn Read) -> Result<Arc<dyn LayoutData>>;

    fn dyn_write_xml(&self, layout: &dyn LayoutData, element: &mut XElement) -> Result<()>;

    fn dyn_read_xml(&self, element: &XElement) -> Result<Arc<dyn LayoutData>>;
}

fn typed<'a, L: 'static>(factory: &str, layout: &'a dyn LayoutData) -> Result<&'a L> {
    layout
        .downcast_ref::<L>()
        .ok_or_else(|| LayoutError::PayloadMismatch {
            factory: factory.to_string(),
        })
}

impl<T: DockTree, F: ElementFactory<T>> DynElementFactory<T> for F {
    fn dyn_id(&self) -> &str {
        ElementFactory::id(self)
    }

    fn dyn_layout_of(
        &self,
        tree: &T,
        element: &T::Element,
        children: &ChildIds<T::Element>,
    ) -> Result<Arc<dyn LayoutData>> {
        Ok(Arc::new(self.layout_of(tree, element, children)?))
    }

    fn dyn_create(
        &self,
        tree: &mut T,
        layout: &dyn LayoutData,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<Option<T::Element>> {
        self.create(tree, typed(ElementFactory::id(self), layout)?, children)
    }

    fn dyn_set_layout(
        &self,
        tree: &mut T,
        element: &T::Element,
        layout: &dyn LayoutData,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<()> {
        self.set_layout(tree, element, typed(ElementFactory::id(self), layout)?, children)
    }

    fn dyn_estimate_locations(
        &self,
        layout: &dyn LayoutData,
        map: &mut LocationEstimationMap<'_>,
    ) -> Result<()> {
        self.estimate_locations(typed(ElementFactory::id(self), layout)?, map);
        Ok(())
    }

    fn dyn_write(&self, layout: &dyn LayoutData, out: &mut dyn Write) -> Result<()> {
        ElementFactory::write(self, typed(ElementFactory::id(self), layout)?, out)
    }

    fn dyn_read(&self, input: &mut dyn Read) -> Result<Arc<dyn LayoutData>> {
        Ok(Arc::new(ElementFactory::read(self, input)?))
    }

    fn dyn_write_xml(&self, layout: &dyn LayoutData, element: &mut XElement) -> Result<()> {
        ElementFactory::write_xml(self, typed(ElementFactory::id(self), layout)?, element)
    }

    fn dyn_read_xml(&self, element: &XElement) -> Result<Arc<dyn LayoutData>> {
        Ok(Arc::new(ElementFactory::read_xml(self, element)?))
    }
}

/// Stores metadata that rides along the main layout of an element.
pub trait SideFactory<T: DockTree>: 'static {
    type Layout: fmt::Debug + PartialEq + 'static;

    fn id(&self) -> &str;

    /// Whether this factory has something to store for `element`.
    fn interested(&self, _tree: &T, _element: &T::Element) -> bool {
        true
    }

    fn layout_of(&self, tree: &T, element: &T::Element) -> Result<Self::Layout>;

    /// Restore the metadata on a freshly converted element.
    fn apply(&self, tree: &mut T, element: &T::Element, layout: &Self::Layout) -> Result<()>;

    fn write(&self, layout: &Self::Layout, out: &mut dyn Write) -> Result<()>;

    fn read(&self, input: &mut dyn Read) -> Result<Self::Layout>;

    fn write_xml(&self, layout: &Self::Layout, element: &mut XElement) -> Result<()>;

    fn read_xml(&self, element: &XElement) -> Result<Self::Layout>;
}

/// Object-safe form of [`SideFactory`].
pub trait DynSideFactory<T: DockTree> {
    fn dyn_id(&self) -> &str;
    fn dyn_interested(&self, tree: &T, element: &T::Element) -> bool;
    fn dyn_layout_of(&self, tree: &T, element: &T::Element) -> Result<Arc<dyn LayoutData>>;
    fn dyn_apply(&self, tree: &mut T, element: &T::Element, layout: &dyn LayoutData) -> Result<()>;
    fn dyn_write(&self, layout: &dyn LayoutData, out: &mut dyn Write) -> Result<()>;
    fn dyn_read(&self, input: &mut dyn Read) -> Result<Arc<dyn LayoutData>>;
    fn dyn_write_xml(&self, layout: &dyn LayoutData, element: &mut XElement) -> Result<()>;
    fn dyn_read_xml(&self, element: &XElement) -> Result<Arc<dyn LayoutData>>;
}

impl<T: DockTree, F: SideFactory<T>> DynSideFactory<T> for F {
    fn dyn_id(&self) -> &str {
        SideFactory::id(self)
    }

    fn dyn_interested(&self, tree: &T, element: &T::Element) -> bool {
        self.interested(tree, element)
    }

    fn dyn_layout_of(&self, tree: &T, element: &T::Element) -> Result<Arc<dyn LayoutData>> {
        Ok(Arc::new(SideFactory::layout_of(self, tree, element)?))
    }

    fn dyn_apply(&self, tree: &mut T, element: &T::Element, layout: &dyn LayoutData) -> Result<()> {
        self.apply(tree, element, typed(SideFactory::id(self), layout)?)
    }

    fn dyn_write(&self, layout: &dyn LayoutData, out: &mut dyn Write) -> Result<()> {
        SideFactory::write(self, typed(SideFactory::id(self), layout)?, out)
    }

    fn dyn_read(&self, input: &mut dyn Read) -> Result<Arc<dyn LayoutData>> {
        Ok(Arc::new(SideFactory::read(self, input)?))
    }

    fn dyn_write_xml(&self, layout: &dyn LayoutData, element: &mut XElement) -> Result<()> {
        SideFactory::write_xml(self, typed(SideFactory::id(self), layout)?, element)
    }

    fn dyn_read_xml(&self, element: &XElement) -> Result<Arc<dyn LayoutData>> {
        Ok(Arc::new(SideFactory::read_xml(self, element)?))
    }
}

/// Builds a stand-in for a pinned element that is no longer available.
pub trait BackupFactory<T: DockTree>: 'static {
    /// Id of the factory whose elements this factory replaces.
    fn id(&self) -> &str;

    /// `delegate` is the stored layout of the missing element; it is empty
    /// when only the element's presence was recorded.
    fn backup(
        &self,
        tree: &mut T,
        key: &str,
        delegate: &LayoutInfo,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<Option<T::Element>>;
}

/// Last chance to decode a payload whose factory is not registered.
///
/// Returning `None` keeps the payload raw.
pub trait MissingFactoryFallback {
    fn read(&self, factory_id: &str, payload: &[u8]) -> Option<LayoutRecord>;

    fn read_xml(&self, _factory_id: &str, _element: &XElement) -> Option<LayoutRecord> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DockableFactory, MemoryDock};

    #[test]
    fn test_erased_factory_rejects_foreign_payload() {
        let factory: Box<dyn DynElementFactory<MemoryDock>> = Box::new(DockableFactory);
        let mut out = Vec::new();
        let err = factory.dyn_write(&42u32, &mut out).unwrap_err();
        assert!(matches!(err, LayoutError::PayloadMismatch { ref factory } if factory == "dockable"));
    }

    #[test]
    fn test_erased_factory_round_trip() {
        let factory: Box<dyn DynElementFactory<MemoryDock>> = Box::new(DockableFactory);
        let mut out = Vec::new();
        factory.dyn_write(&"A".to_string(), &mut out).unwrap();
        let back = factory.dyn_read(&mut out.as_slice()).unwrap();
        assert_eq!(back.downcast_ref::<String>().map(String::as_str), Some("A"));
    }
}
