//! Built-in side factory for host locations.

use std::io::{Read, Write};
use std::sync::Arc;

use dock_core::{LocationProperty, PropertyCodec};
use dock_xml::XElement;

use crate::error::{LayoutError, Result};
use crate::factory::SideFactory;
use crate::tree::DockTree;

/// Records where the host places an element and restores it on load.
///
/// Only elements for which [`DockTree::location`] reports something are
/// recorded.
pub struct LocationSideFactory {
    codec: Arc<PropertyCodec>,
}

impl LocationSideFactory {
    pub const ID: &'static str = "location";

    pub fn new(codec: Arc<PropertyCodec>) -> Self {
        Self { codec }
    }
}

impl<T: DockTree> SideFactory<T> for LocationSideFactory {
    type Layout = LocationProperty;

    fn id(&self) -> &str {
        Self::ID
    }

    fn interested(&self, tree: &T, element: &T::Element) -> bool {
        tree.location(element).is_some()
    }

    fn layout_of(&self, tree: &T, element: &T::Element) -> Result<LocationProperty> {
        tree.location(element)
            .ok_or_else(|| LayoutError::InvalidData(format!("no location for {:?}", element)))
    }

    fn apply(&self, tree: &mut T, element: &T::Element, layout: &LocationProperty) -> Result<()> {
        tree.set_location(element, layout.clone());
        Ok(())
    }

    fn write(&self, layout: &LocationProperty, out: &mut dyn Write) -> Result<()> {
        Ok(self.codec.write(layout, out)?)
    }

    fn read(&self, input: &mut dyn Read) -> Result<LocationProperty> {
        Ok(self.codec.read(input)?)
    }

    fn write_xml(&self, layout: &LocationProperty, element: &mut XElement) -> Result<()> {
        self.codec.write_xml(layout, element);
        Ok(())
    }

    fn read_xml(&self, element: &XElement) -> Result<LocationProperty> {
        Ok(self.codec.read_xml(element)?)
    }
}
