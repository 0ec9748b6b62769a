//! Encoding of location property chains.

use std::io::{Read, Write};

use dock_xml::{XElement, XmlError};
use indexmap::IndexMap;

use super::builtin::{GridPropertyFactory, ScreenPropertyFactory, StackPropertyFactory};
use super::{DynProperty, LocationProperty, PropertyValue};
use crate::error::{CoreError, Result};
use crate::stream::{DataInput, DataOutput};
use crate::version::Version;

/// Reads one property kind back from its encoded form.
pub trait PropertyFactory: 'static {
    /// The kind produced by this factory.
    type Property: PropertyValue;

    /// Id written in front of every value of this kind.
    fn id(&self) -> &str;

    fn read(&self, input: &mut dyn Read) -> Result<Self::Property>;

    fn read_xml(&self, element: &XElement) -> Result<Self::Property>;
}

trait ErasedPropertyFactory {
    fn read(&self, input: &mut dyn Read) -> Result<Box<dyn DynProperty>>;
    fn read_xml(&self, element: &XElement) -> Result<Box<dyn DynProperty>>;
}

impl<F: PropertyFactory> ErasedPropertyFactory for F {
    fn read(&self, input: &mut dyn Read) -> Result<Box<dyn DynProperty>> {
        Ok(Box::new(PropertyFactory::read(self, input)?))
    }

    fn read_xml(&self, element: &XElement) -> Result<Box<dyn DynProperty>> {
        Ok(Box::new(PropertyFactory::read_xml(self, element)?))
    }
}

/// Registry of property factories that encodes and decodes whole chains.
///
/// Binary form: `[version][count:i32]` followed by `[factory_id][len:i32][payload]`
/// per hop. XML form: one `<property factory="...">` child per hop. Hops are
/// always written outermost first.
///
/// Chains longer than [`PropertyCodec::max_depth`] are rejected on read.
pub struct PropertyCodec {
    factories: IndexMap<String, Box<dyn ErasedPropertyFactory>>,
    max_depth: usize,
}

impl Default for PropertyCodec {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PropertyCodec {
    /// Station nesting rarely exceeds a handful of levels.
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    /// Create a codec without any factories.
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }

    /// Create a codec that knows the built-in stack, grid and screen kinds.
    pub fn with_defaults() -> Self {
        let mut codec = Self::new();
        codec.register(StackPropertyFactory);
        codec.register(GridPropertyFactory);
        codec.register(ScreenPropertyFactory);
        codec
    }

    /// Register a factory, replacing any factory with the same id.
    pub fn register<F: PropertyFactory>(&mut self, factory: F) {
        self.factories.insert(factory.id().to_string(), Box::new(factory));
    }

    /// Accept chains of at most `max_depth` links.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn check_depth(&self, count: usize) -> Result<()> {
        if count > self.max_depth {
            tracing::warn!(links = count, limit = self.max_depth, "rejecting property chain");
            return Err(CoreError::InvalidData(format!(
                "property chain of {} links exceeds the limit of {}",
                count, self.max_depth
            )));
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Ids of all registered factories, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    fn factory(&self, id: &str) -> Result<&dyn ErasedPropertyFactory> {
        self.factories.get(id).map(|f| f.as_ref()).ok_or_else(|| {
            tracing::warn!(property = id, "no property factory registered");
            CoreError::UnknownProperty(id.to_string())
        })
    }

    /// Write a chain in binary form.
    pub fn write<W: Write + ?Sized>(&self, property: &LocationProperty, out: &mut W) -> Result<()> {
        Version::CURRENT.write(out)?;
        out.write_len(property.depth())?;
        for link in property.iter() {
            let mut payload = Vec::new();
            link.dyn_value().dyn_write(&mut payload)?;
            out.write_utf(link.factory_id())?;
            out.write_block(&payload)?;
        }
        Ok(())
    }

    /// Read a chain written by [`PropertyCodec::write`].
    pub fn read<R: Read + ?Sized>(&self, input: &mut R) -> Result<LocationProperty> {
        Version::read(input)?.check_supported()?;
        let count = input.read_len()?;
        self.check_depth(count)?;
        let mut links = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let id = input.read_utf()?;
            let payload = input.read_block()?;
            let factory = self.factory(&id)?;
            links.push(factory.read(&mut payload.as_slice())?);
        }
        chain(links).ok_or_else(|| CoreError::InvalidData("empty property chain".into()))
    }

    /// Append one `<property>` child per hop to `element`.
    pub fn write_xml(&self, property: &LocationProperty, element: &mut XElement) {
        for link in property.iter() {
            let child = element.add_element("property");
            child.add_string("factory", link.factory_id());
            link.dyn_value().dyn_write_xml(child);
        }
    }

    /// Read the `<property>` children of `element` as one chain.
    pub fn read_xml(&self, element: &XElement) -> Result<LocationProperty> {
        self.check_depth(element.elements("property").count())?;
        let mut links = Vec::new();
        for child in element.elements("property") {
            let factory = self.factory(child.require_string("factory")?)?;
            links.push(factory.read_xml(child)?);
        }
        chain(links).ok_or_else(|| {
            XmlError::MissingElement {
                parent: element.name().to_string(),
                name: "property".into(),
            }
            .into()
        })
    }
}

/// Link erased values into a chain, first value outermost.
fn chain(links: Vec<Box<dyn DynProperty>>) -> Option<LocationProperty> {
    links.into_iter().rev().fold(None, |successor, value| {
        Some(LocationProperty::from_dyn(value).with_successor(successor))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{GridProperty, ScreenProperty, StackProperty};

    fn sample() -> LocationProperty {
        LocationProperty::new(ScreenProperty::new(10, 20, 300, 200))
            .with_successor(Some(
                LocationProperty::new(GridProperty::new(1, 0))
                    .with_successor(Some(LocationProperty::new(StackProperty::new(3)))),
            ))
    }

    #[test]
    fn test_binary_chain() {
        let codec = PropertyCodec::with_defaults();
        let mut out = Vec::new();
        codec.write(&sample(), &mut out).unwrap();
        assert_eq!(codec.read(&mut out.as_slice()).unwrap(), sample());
    }

    #[test]
    fn test_binary_outermost_first() {
        let codec = PropertyCodec::with_defaults();
        let mut out = Vec::new();
        codec.write(&sample(), &mut out).unwrap();

        let mut input = out.as_slice();
        Version::read(&mut input).unwrap();
        assert_eq!(input.read_len().unwrap(), 3);
        assert_eq!(input.read_utf().unwrap(), "screen");
    }

    #[test]
    fn test_xml_chain() {
        let codec = PropertyCodec::with_defaults();
        let mut element = XElement::new("location");
        codec.write_xml(&sample(), &mut element);

        let factories: Vec<_> = element
            .elements("property")
            .map(|p| p.attribute("factory").unwrap().to_string())
            .collect();
        assert_eq!(factories, vec!["screen", "grid", "stack"]);
        assert_eq!(codec.read_xml(&element).unwrap(), sample());
    }

    #[test]
    fn test_unknown_factory_is_error() {
        let mut codec = PropertyCodec::new();
        codec.register(GridPropertyFactory);

        let mut out = Vec::new();
        PropertyCodec::with_defaults()
            .write(&sample(), &mut out)
            .unwrap();
        let err = codec.read(&mut out.as_slice()).unwrap_err();
        assert!(matches!(err, CoreError::UnknownProperty(ref id) if id == "screen"));
    }

    #[test]
    fn test_future_version_is_error() {
        let mut out = Vec::new();
        Version::new(2, 0, 0).write(&mut out).unwrap();
        out.write_len(1).unwrap();
        let err = PropertyCodec::with_defaults()
            .read(&mut out.as_slice())
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_overlong_chain_rejected() {
        let codec = PropertyCodec::with_defaults().with_max_depth(2);
        let mut out = Vec::new();
        Version::CURRENT.write(&mut out).unwrap();
        out.write_len(300_000).unwrap();
        let err = codec.read(&mut out.as_slice()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidData(_)));

        let mut element = XElement::new("location");
        PropertyCodec::with_defaults().write_xml(&sample(), &mut element);
        let err = codec.read_xml(&element).unwrap_err();
        assert!(matches!(err, CoreError::InvalidData(_)));
    }

    #[test]
    fn test_chain_at_limit_accepted() {
        let codec = PropertyCodec::with_defaults().with_max_depth(3);
        let mut out = Vec::new();
        codec.write(&sample(), &mut out).unwrap();
        assert_eq!(codec.read(&mut out.as_slice()).unwrap(), sample());
    }

    #[test]
    fn test_empty_xml_is_error() {
        let err = PropertyCodec::with_defaults()
            .read_xml(&XElement::new("location"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Xml(XmlError::MissingElement { .. })));
    }
}
