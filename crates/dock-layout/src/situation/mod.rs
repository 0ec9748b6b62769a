//! Conversion between live trees, compositions and their stored forms.
//!
//! [`Situation`] bundles every operation of the engine. Implementors only
//! supply a [`FactoryRegistry`]; the remaining required-looking methods are
//! hooks with default implementations that specialised situations (such as
//! [`IdentityPreservingRegistry`](crate::IdentityPreservingRegistry)) override
//! to intercept single payload kinds.

mod binary;
mod convert;
mod xml;

use std::io::{Read, Write};

use dock_core::{LocationProperty, Version};
use dock_xml::XElement;
use indexmap::IndexMap;

use crate::composition::LayoutComposition;
use crate::error::Result;
use crate::estimate::{LocationEstimationMap, LocationEstimator};
use crate::factory::{ChildIds, ChildMap};
use crate::info::{LayoutKind, LayoutRecord};
use crate::options::{ReadOptions, WriteOptions};
use crate::registry::FactoryRegistry;
use crate::tree::DockTree;

/// Named root compositions, persisted together.
pub type CompositionMap = IndexMap<String, LayoutComposition>;

/// The converter between live element trees and compositions.
pub trait Situation<T: DockTree> {
    /// Factories and policies used by every operation.
    fn registry(&self) -> &FactoryRegistry<T>;

    /// Describe one live element. Fails if no factory knows the element.
    fn element_layout(
        &self,
        tree: &T,
        element: &T::Element,
        children: &ChildIds<T::Element>,
    ) -> Result<LayoutRecord> {
        self.registry().element_layout(tree, element, children)
    }

    /// Build a live element from a decoded layout.
    fn build_element(
        &self,
        tree: &mut T,
        record: &LayoutRecord,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<Option<T::Element>> {
        self.registry().build_element(tree, record, children)
    }

    /// Encode a decoded layout for a binary stream of `version`.
    fn encode_payload(&self, record: &LayoutRecord, _version: Version) -> Result<Vec<u8>> {
        self.registry().encode_bytes(record)
    }

    /// Decode a binary payload stored under `factory_id`.
    fn decode_payload(&self, factory_id: &str, payload: &[u8]) -> Result<LayoutKind> {
        self.registry().decode_bytes(factory_id, payload)
    }

    /// Encode a decoded layout into its `<layout>` element.
    fn encode_payload_xml(
        &self,
        record: &LayoutRecord,
        _version: Version,
        element: &mut XElement,
    ) -> Result<()> {
        self.registry().encode_xml(record, element)
    }

    /// Decode a `<layout>` element stored under `factory_id`.
    fn decode_payload_xml(&self, factory_id: &str, element: &XElement) -> Result<LayoutKind> {
        self.registry().decode_xml(factory_id, element)
    }

    /// Complete a decoded layout that may itself contain raw parts.
    fn fill_record(&self, record: LayoutRecord) -> Result<LayoutRecord> {
        Ok(record)
    }

    /// Let the factory of `record` report child locations.
    fn estimate_record(&self, record: &LayoutRecord, map: &mut LocationEstimationMap<'_>) -> Result<()> {
        self.registry().estimate_record(record, map)
    }

    /// Convert a live element and its subtree.
    ///
    /// Returns `None` when the element is ignored. Stations whose children
    /// are ignored produce a composition without children and with
    /// `ignore_children` set.
    fn convert_element(&self, tree: &T, element: &T::Element) -> Result<Option<LayoutComposition>> {
        convert::to_composition(self, tree, element)
    }

    /// Rebuild live elements from a composition.
    ///
    /// Subtrees whose layout is still raw or empty are skipped. Children that
    /// are attached elsewhere are detached before being handed to their new
    /// parent.
    fn convert_composition(
        &self,
        tree: &mut T,
        composition: &LayoutComposition,
    ) -> Result<Option<T::Element>> {
        convert::to_element(self, tree, composition)
    }

    /// Retry decoding every raw layout with the factories registered now.
    fn fill_missing(&self, composition: &LayoutComposition) -> Result<LayoutComposition> {
        convert::fill_missing(self, composition)
    }

    fn write_composition<W: Write>(
        &self,
        composition: &LayoutComposition,
        out: &mut W,
        options: &WriteOptions,
    ) -> Result<()> {
        binary::write_composition(self, composition, out, options)
    }

    fn read_composition<R: Read>(&self, input: &mut R, options: &ReadOptions) -> Result<LayoutComposition> {
        binary::read_composition(self, input, options)
    }

    fn write_compositions<W: Write>(
        &self,
        compositions: &CompositionMap,
        out: &mut W,
        options: &WriteOptions,
    ) -> Result<()> {
        binary::write_compositions(self, compositions, out, options)
    }

    fn read_compositions<R: Read>(&self, input: &mut R, options: &ReadOptions) -> Result<CompositionMap> {
        binary::read_compositions(self, input, options)
    }

    /// Append the `layout`, `adjacent` and `children` elements of `composition` to `element`.
    fn write_composition_xml(
        &self,
        composition: &LayoutComposition,
        element: &mut XElement,
        options: &WriteOptions,
    ) -> Result<()> {
        xml::write_composition(self, composition, element, options)
    }

    fn read_composition_xml(&self, element: &XElement, options: &ReadOptions) -> Result<LayoutComposition> {
        xml::read_composition(self, element, options)
    }

    /// Write one `<element key="...">` child per root and a `version` attribute.
    fn write_compositions_xml(
        &self,
        compositions: &CompositionMap,
        element: &mut XElement,
        options: &WriteOptions,
    ) -> Result<()> {
        xml::write_compositions(self, compositions, element, options)
    }

    fn read_compositions_xml(&self, element: &XElement, options: &ReadOptions) -> Result<CompositionMap> {
        xml::read_compositions(self, element, options)
    }

    /// Write `composition` into a new buffer.
    fn to_bytes(&self, composition: &LayoutComposition, options: &WriteOptions) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_composition(composition, &mut out, options)?;
        Ok(out)
    }

    fn from_bytes(&self, bytes: &[u8], options: &ReadOptions) -> Result<LayoutComposition> {
        self.read_composition(&mut &bytes[..], options)
    }

    /// Run a full estimation pass over `composition`.
    ///
    /// With `location` the root counts as moved there; without it only
    /// locations reported by factories propagate.
    fn estimate(
        &self,
        composition: &LayoutComposition,
        location: Option<LocationProperty>,
    ) -> Result<LocationEstimator> {
        let mut estimator = LocationEstimator::new(composition);
        match location {
            Some(location) => estimator.set_root_location(location),
            None => estimator.prepare(),
        }
        estimator.run(|info, map| match info.record() {
            Some(record) => self.estimate_record(record, map),
            None => Ok(()),
        })?;
        Ok(estimator)
    }

    /// [`Situation::estimate`], returning the composition with every
    /// estimated location stored in its layout info.
    fn estimate_locations(
        &self,
        composition: &LayoutComposition,
        location: Option<LocationProperty>,
    ) -> Result<LayoutComposition> {
        Ok(self.estimate(composition, location)?.into_composition())
    }
}

impl<T: DockTree> Situation<T> for FactoryRegistry<T> {
    fn registry(&self) -> &FactoryRegistry<T> {
        self
    }
}
