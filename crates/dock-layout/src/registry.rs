//! Registry of the factories used to convert layouts.

use std::sync::Arc;

use dock_core::{DataInput, DataOutput, Path, PropertyCodec};
use dock_xml::XElement;
use indexmap::IndexMap;

use crate::composition::LayoutComposition;
use crate::error::{LayoutError, Result};
use crate::estimate::LocationEstimationMap;
use crate::factory::{
    ChildIds, ChildMap, DynElementFactory, DynSideFactory, ElementFactory, MissingFactoryFallback,
    SideFactory,
};
use crate::info::{LayoutKind, LayoutRecord};
use crate::legacy::legacy_alias;
use crate::tree::{DockTree, IgnorePredicate, PlaceholderStrategy};

/// Element factories, side factories and the policies a [`Situation`]
/// consults while converting.
///
/// [`Situation`]: crate::Situation
pub struct FactoryRegistry<T: DockTree> {
    factories: IndexMap<String, Box<dyn DynElementFactory<T>>>,
    side_factories: IndexMap<String, Box<dyn DynSideFactory<T>>>,
    ignore: Option<Box<dyn IgnorePredicate<T>>>,
    placeholders: Option<Box<dyn PlaceholderStrategy<T>>>,
    missing: Option<Box<dyn MissingFactoryFallback>>,
    properties: Arc<PropertyCodec>,
}

impl<T: DockTree> Default for FactoryRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DockTree> FactoryRegistry<T> {
    /// Create an empty registry using the default property codec.
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
            side_factories: IndexMap::new(),
            ignore: None,
            placeholders: None,
            missing: None,
            properties: Arc::new(PropertyCodec::with_defaults()),
        }
    }

    /// Register an element factory, replacing any factory with the same id.
    pub fn add_factory<F: ElementFactory<T>>(&mut self, factory: F) {
        let id = ElementFactory::id(&factory).to_string();
        self.factories.insert(id, Box::new(factory));
    }

    pub fn remove_factory(&mut self, id: &str) -> bool {
        self.factories.shift_remove(id).is_some()
    }

    /// Register a side factory. Side data is applied in registration order.
    pub fn add_side_factory<F: SideFactory<T>>(&mut self, factory: F) {
        let id = SideFactory::id(&factory).to_string();
        self.side_factories.insert(id, Box::new(factory));
    }

    pub fn remove_side_factory(&mut self, id: &str) -> bool {
        self.side_factories.shift_remove(id).is_some()
    }

    pub fn set_ignore<P: IgnorePredicate<T> + 'static>(&mut self, predicate: P) {
        self.ignore = Some(Box::new(predicate));
    }

    pub fn set_placeholder_strategy<P: PlaceholderStrategy<T> + 'static>(&mut self, strategy: P) {
        self.placeholders = Some(Box::new(strategy));
    }

    pub fn set_missing_fallback<M: MissingFactoryFallback + 'static>(&mut self, fallback: M) {
        self.missing = Some(Box::new(fallback));
    }

    pub fn set_property_codec(&mut self, codec: Arc<PropertyCodec>) {
        self.properties = codec;
    }

    /// Codec for location properties, shared with side factories.
    pub fn property_codec(&self) -> Arc<PropertyCodec> {
        Arc::clone(&self.properties)
    }

    /// The factory registered under exactly `id`.
    pub fn factory(&self, id: &str) -> Option<&dyn DynElementFactory<T>> {
        self.factories.get(id).map(|f| f.as_ref())
    }

    /// Look up `id`, retrying with its legacy alias.
    ///
    /// Returns the id the factory is registered under together with the factory.
    pub fn resolve(&self, id: &str) -> Option<(&str, &dyn DynElementFactory<T>)> {
        let found = self.factories.get_key_value(id).or_else(|| {
            let alias = legacy_alias(id)?;
            let found = self.factories.get_key_value(alias.as_str());
            if found.is_some() {
                tracing::warn!(factory = id, alias = %alias, "reading legacy factory id");
            }
            found
        });
        found.map(|(key, factory)| (key.as_str(), factory.as_ref()))
    }

    pub fn side_factory(&self, id: &str) -> Option<&dyn DynSideFactory<T>> {
        self.side_factories.get(id).map(|f| f.as_ref())
    }

    /// Ids of all element factories, in registration order.
    pub fn factory_ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn side_factory_ids(&self) -> impl Iterator<Item = &str> {
        self.side_factories.keys().map(String::as_str)
    }

    pub(crate) fn ignores_element(&self, tree: &T, element: &T::Element) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|p| p.ignore_element(tree, element))
    }

    pub(crate) fn ignores_children(&self, tree: &T, station: &T::Element) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|p| p.ignore_children(tree, station))
    }

    pub(crate) fn placeholder(&self, tree: &T, element: &T::Element) -> Option<Path> {
        self.placeholders.as_ref()?.placeholder(tree, element)
    }

    /// Drop placeholders the strategy no longer accepts.
    pub(crate) fn valid_placeholder(&self, placeholder: Option<Path>) -> Option<Path> {
        let placeholder = placeholder?;
        match &self.placeholders {
            Some(strategy) if !strategy.is_valid(&placeholder) => {
                tracing::debug!(%placeholder, "dropping invalid placeholder");
                None
            }
            _ => Some(placeholder),
        }
    }

    pub(crate) fn element_layout(
        &self,
        tree: &T,
        element: &T::Element,
        children: &ChildIds<T::Element>,
    ) -> Result<LayoutRecord> {
        let id = tree.factory_id(element);
        let (id, factory) = self
            .resolve(&id)
            .ok_or_else(|| LayoutError::missing_factory(id.as_str()))?;
        Ok(LayoutRecord::from_arc(id, factory.dyn_layout_of(tree, element, children)?))
    }

    pub(crate) fn build_element(
        &self,
        tree: &mut T,
        record: &LayoutRecord,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<Option<T::Element>> {
        match self.factory(record.factory_id()) {
            Some(factory) => factory.dyn_create(tree, record.data(), children),
            None => {
                tracing::warn!(factory = record.factory_id(), "no factory to create element");
                Ok(None)
            }
        }
    }

    pub(crate) fn side_layouts(&self, tree: &T, element: &T::Element) -> Result<Vec<LayoutRecord>> {
        let mut records = Vec::new();
        for (id, factory) in &self.side_factories {
            if factory.dyn_interested(tree, element) {
                records.push(LayoutRecord::from_arc(
                    id.as_str(),
                    factory.dyn_layout_of(tree, element)?,
                ));
            }
        }
        Ok(records)
    }

    pub(crate) fn apply_side_data(
        &self,
        tree: &mut T,
        element: &T::Element,
        composition: &LayoutComposition,
    ) -> Result<()> {
        for (id, factory) in &self.side_factories {
            if let Some(record) = composition.side(id) {
                factory.dyn_apply(tree, element, record.data())?;
            }
        }
        Ok(())
    }

    pub(crate) fn encode_bytes(&self, record: &LayoutRecord) -> Result<Vec<u8>> {
        let factory = self
            .factory(record.factory_id())
            .ok_or_else(|| LayoutError::missing_factory(record.factory_id()))?;
        let mut payload = Vec::new();
        factory.dyn_write(record.data(), &mut payload)?;
        Ok(payload)
    }

    /// Decode a payload stored under `wire_id`: the factory first, then the
    /// fallback, else the entry is kept raw.
    pub(crate) fn decode_bytes(&self, wire_id: &str, payload: &[u8]) -> Result<LayoutKind> {
        if let Some((id, factory)) = self.resolve(wire_id) {
            let data = factory.dyn_read(&mut &payload[..])?;
            return Ok(LayoutKind::Record(LayoutRecord::from_arc(id, data)));
        }
        if let Some(record) = self.missing.as_ref().and_then(|m| m.read(wire_id, payload)) {
            return Ok(LayoutKind::Record(record));
        }
        tracing::debug!(factory = wire_id, "keeping payload of unknown factory raw");
        Ok(LayoutKind::Bytes(join_entry(wire_id, payload)?.into()))
    }

    pub(crate) fn encode_xml(&self, record: &LayoutRecord, element: &mut XElement) -> Result<()> {
        let factory = self
            .factory(record.factory_id())
            .ok_or_else(|| LayoutError::missing_factory(record.factory_id()))?;
        factory.dyn_write_xml(record.data(), element)
    }

    /// XML counterpart of [`FactoryRegistry::decode_bytes`]; a raw result
    /// keeps a copy of `element`.
    pub(crate) fn decode_xml(&self, wire_id: &str, element: &XElement) -> Result<LayoutKind> {
        if let Some((id, factory)) = self.resolve(wire_id) {
            let data = factory.dyn_read_xml(element)?;
            return Ok(LayoutKind::Record(LayoutRecord::from_arc(id, data)));
        }
        if let Some(record) = self.missing.as_ref().and_then(|m| m.read_xml(wire_id, element)) {
            return Ok(LayoutKind::Record(record));
        }
        tracing::debug!(factory = wire_id, "keeping xml of unknown factory raw");
        Ok(LayoutKind::Xml(Arc::new(element.clone())))
    }

    pub(crate) fn estimate_record(
        &self,
        record: &LayoutRecord,
        map: &mut LocationEstimationMap<'_>,
    ) -> Result<()> {
        match self.factory(record.factory_id()) {
            Some(factory) => factory.dyn_estimate_locations(record.data(), map),
            None => Ok(()),
        }
    }
}

/// A complete binary entry: `[factory_id:utf][len:i32][payload]`.
pub(crate) fn join_entry(factory_id: &str, payload: &[u8]) -> Result<Vec<u8>> {
    let mut entry = Vec::with_capacity(payload.len() + factory_id.len() + 6);
    entry.write_utf(factory_id)?;
    entry.write_block(payload)?;
    Ok(entry)
}

/// Split an entry produced by [`join_entry`].
pub(crate) fn split_entry(entry: &[u8]) -> Result<(String, Vec<u8>)> {
    let mut input = entry;
    let id = input.read_utf()?;
    let payload = input.read_block()?;
    Ok((id, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DockableFactory, GridFactory, MemoryDock};

    #[test]
    fn test_resolve_legacy_alias() {
        let mut registry = FactoryRegistry::<MemoryDock>::new();
        registry.add_factory(GridFactory::with_id("split dock"));

        let (id, _) = registry.resolve("secure split dock").unwrap();
        assert_eq!(id, "split dock");
        assert!(registry.resolve("secure grid").is_none());
        assert!(registry.factory("secure split dock").is_none());
    }

    #[test]
    fn test_unknown_payload_kept_raw() {
        let registry = FactoryRegistry::<MemoryDock>::new();
        let kind = registry.decode_bytes("dockable", &[0, 1, b'A']).unwrap();
        let entry = match kind {
            LayoutKind::Bytes(entry) => entry,
            other => panic!("expected raw bytes, got {:?}", other),
        };
        assert_eq!(split_entry(&entry).unwrap(), ("dockable".to_string(), vec![0, 1, b'A']));
    }

    #[test]
    fn test_fallback_decodes_unknown_payload() {
        struct Fallback;
        impl MissingFactoryFallback for Fallback {
            fn read(&self, factory_id: &str, payload: &[u8]) -> Option<LayoutRecord> {
                Some(LayoutRecord::new(factory_id, payload.len()))
            }
        }

        let mut registry = FactoryRegistry::<MemoryDock>::new();
        registry.set_missing_fallback(Fallback);
        let kind = registry.decode_bytes("custom", &[7, 7, 7]).unwrap();
        assert_eq!(kind, LayoutKind::Record(LayoutRecord::new("custom", 3usize)));
    }

    #[test]
    fn test_fallback_decodes_unknown_xml() {
        struct Fallback;
        impl MissingFactoryFallback for Fallback {
            fn read(&self, _: &str, _: &[u8]) -> Option<LayoutRecord> {
                None
            }

            fn read_xml(&self, factory_id: &str, element: &XElement) -> Option<LayoutRecord> {
                let name = element.attribute("name")?;
                Some(LayoutRecord::new(factory_id, name.to_string()))
            }
        }

        let mut registry = FactoryRegistry::<MemoryDock>::new();
        let mut element = XElement::new("layout");
        element.add_string("factory", "custom").add_string("name", "A");
        assert!(matches!(registry.decode_xml("custom", &element).unwrap(), LayoutKind::Xml(_)));

        registry.set_missing_fallback(Fallback);
        let kind = registry.decode_xml("custom", &element).unwrap();
        assert_eq!(kind, LayoutKind::Record(LayoutRecord::new("custom", "A".to_string())));

        let unnamed = XElement::new("layout");
        let kind = registry.decode_xml("custom", &unnamed).unwrap();
        assert_eq!(kind, LayoutKind::Xml(Arc::new(unnamed)));
    }

    #[test]
    fn test_known_payload_decoded() {
        let mut registry = FactoryRegistry::<MemoryDock>::new();
        registry.add_factory(DockableFactory);
        let kind = registry.decode_bytes("dockable", &[0, 1, b'A']).unwrap();
        assert_eq!(kind, LayoutKind::Record(LayoutRecord::new("dockable", "A".to_string())));
    }

    #[test]
    fn test_encode_requires_factory() {
        let registry = FactoryRegistry::<MemoryDock>::new();
        let err = registry
            .encode_bytes(&LayoutRecord::new("dockable", "A".to_string()))
            .unwrap_err();
        assert!(matches!(err, LayoutError::MissingFactory { ref id } if id == "dockable"));
    }
}
