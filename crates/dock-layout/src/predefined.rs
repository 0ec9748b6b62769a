//! Pinned elements that keep their identity across a save and reload.
//!
//! A pinned element is written under the reserved [`PREDEFINED`] factory
//! with its key and, unless suppressed, the layout produced by its own
//! factory. That inner layout is stored under the factory id prefixed with
//! [`DELEGATE_PREFIX`].
//!
//! Binary payload:
//!
//! ```text
//! version key:utf
//! present:bool                       ; since 1.0.8, absent means present
//! delegate_id:utf [len:i32 payload]  ; payload only when present
//! ```
//!
//! XML payload:
//!
//! ```xml
//! <replacement id="key" layout="true"/>
//! <delegate factory="delegate_grid">...</delegate>
//! ```

use dock_core::{DataInput, DataOutput, LocationProperty, Version};
use dock_xml::XElement;
use indexmap::IndexMap;

use crate::composition::LayoutComposition;
use crate::error::{LayoutError, Result};
use crate::estimate::LocationEstimationMap;
use crate::factory::{BackupFactory, ChildIds, ChildMap};
use crate::info::{LayoutInfo, LayoutKind, LayoutRecord};
use crate::legacy::legacy_alias;
use crate::registry::{split_entry, FactoryRegistry};
use crate::situation::Situation;
use crate::tree::DockTree;

/// Factory id of pinned elements.
pub const PREDEFINED: &str = "predefined";

/// Prefix of the inner factory id stored inside a pinned entry.
pub const DELEGATE_PREFIX: &str = "delegate_";

/// Layout of a pinned element.
#[derive(Debug, Clone, PartialEq)]
pub struct PredefinedLayout {
    pub key: String,
    /// Id of the element's own factory, without [`DELEGATE_PREFIX`].
    pub factory_id: String,
    /// The layout of the element's own factory; empty when it was not stored.
    pub delegate: LayoutInfo,
}

type LayoutFilter<T> = Box<dyn Fn(&T, &<T as DockTree>::Element) -> bool>;

/// A situation that writes pinned elements by key and hands the same
/// elements back when reading.
///
/// Elements whose key is no longer pinned at read time are rebuilt by the
/// [`BackupFactory`] registered for their own factory id.
pub struct IdentityPreservingRegistry<T: DockTree> {
    base: FactoryRegistry<T>,
    pinned: IndexMap<String, T::Element>,
    backups: IndexMap<String, Box<dyn BackupFactory<T>>>,
    layout_filter: Option<LayoutFilter<T>>,
}

impl<T: DockTree + 'static> IdentityPreservingRegistry<T> {
    pub fn new(base: FactoryRegistry<T>) -> Self {
        Self {
            base,
            pinned: IndexMap::new(),
            backups: IndexMap::new(),
            layout_filter: None,
        }
    }

    pub fn base(&self) -> &FactoryRegistry<T> {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut FactoryRegistry<T> {
        &mut self.base
    }

    /// Pin `element` under `key`, replacing any element pinned under it.
    pub fn pin(&mut self, key: impl Into<String>, element: T::Element) -> Option<T::Element> {
        self.pinned.insert(key.into(), element)
    }

    pub fn unpin(&mut self, key: &str) -> Option<T::Element> {
        self.pinned.shift_remove(key)
    }

    pub fn pinned(&self, key: &str) -> Option<&T::Element> {
        self.pinned.get(key)
    }

    /// The key `element` is pinned under.
    pub fn key_for(&self, element: &T::Element) -> Option<&str> {
        self.pinned
            .iter()
            .find(|(_, pinned)| *pinned == element)
            .map(|(key, _)| key.as_str())
    }

    /// Register a backup factory for the elements of factory `factory.id()`.
    pub fn add_backup_factory<B: BackupFactory<T>>(&mut self, factory: B) {
        self.backups.insert(factory.id().to_string(), Box::new(factory));
    }

    /// Decide per pinned element whether its own layout is stored.
    ///
    /// Elements rejected by the filter are stored by key only; their
    /// position is kept but their configuration is not.
    pub fn set_layout_filter<F>(&mut self, filter: F)
    where
        F: Fn(&T, &T::Element) -> bool + 'static,
    {
        self.layout_filter = Some(Box::new(filter));
    }

    pub fn should_layout(&self, tree: &T, element: &T::Element) -> bool {
        self.layout_filter.as_ref().map_or(true, |filter| filter(tree, element))
    }

    /// The key of a composition written for a pinned element.
    pub fn key_of<'a>(&self, composition: &'a LayoutComposition) -> Option<&'a str> {
        key_of_info(composition.info())
    }

    /// Estimate `composition` and collect the location of every pinned key
    /// that received one.
    pub fn estimate_locations_by_key(
        &self,
        composition: &LayoutComposition,
        location: Option<LocationProperty>,
    ) -> Result<IndexMap<String, LocationProperty>> {
        let estimator = self.estimate(composition, location)?;
        let mut locations = IndexMap::new();
        estimator.for_each_estimated(|_, info, location| {
            if let Some(key) = key_of_info(info) {
                locations.insert(key.to_string(), location.clone());
            }
        });
        Ok(locations)
    }

    fn build_pinned(
        &self,
        tree: &mut T,
        layout: &PredefinedLayout,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<Option<T::Element>> {
        if let Some(element) = self.pinned.get(&layout.key) {
            if let Some(delegate) = layout.delegate.record() {
                match self.base.factory(delegate.factory_id()) {
                    Some(factory) => factory.dyn_set_layout(tree, element, delegate.data(), children)?,
                    None => tracing::warn!(
                        key = %layout.key,
                        factory = delegate.factory_id(),
                        "cannot refresh pinned element"
                    ),
                }
            }
            return Ok(Some(element.clone()));
        }

        match self.backups.get(&layout.factory_id) {
            Some(backup) => backup.backup(tree, &layout.key, &layout.delegate, children),
            None => {
                tracing::warn!(
                    key = %layout.key,
                    factory = %layout.factory_id,
                    "pinned element missing and no backup factory registered"
                );
                Ok(None)
            }
        }
    }

    /// The inner entry as `(factory_id, payload)`; `None` when not stored.
    fn delegate_entry(&self, delegate: &LayoutInfo) -> Result<Option<(String, Vec<u8>)>> {
        let record = match delegate.kind() {
            LayoutKind::Empty => return Ok(None),
            LayoutKind::Bytes(entry) => return split_entry(entry).map(Some),
            LayoutKind::Record(record) => record.clone(),
            LayoutKind::Xml(element) => {
                let id = element.require_string("factory")?;
                match self.base.decode_xml(id, element)? {
                    LayoutKind::Record(record) => record,
                    _ => return Err(LayoutError::missing_factory(id)),
                }
            }
        };
        let payload = self.base.encode_bytes(&record)?;
        Ok(Some((record.factory_id().to_string(), payload)))
    }

    fn encode_predefined(&self, layout: &PredefinedLayout, version: Version) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        version.write(&mut out)?;
        out.write_utf(&layout.key)?;
        match self.delegate_entry(&layout.delegate)? {
            Some((id, payload)) => {
                if version >= Version::V1_0_8 {
                    out.write_bool(true)?;
                }
                out.write_utf(&delegate_id(&id))?;
                out.write_block(&payload)?;
            }
            None if version >= Version::V1_0_8 => {
                out.write_bool(false)?;
                out.write_utf(&delegate_id(&layout.factory_id))?;
            }
            None => return Err(absent_delegate(layout, version)),
        }
        Ok(out)
    }

    fn decode_predefined(&self, payload: &[u8]) -> Result<PredefinedLayout> {
        let mut input = payload;
        let version = Version::read(&mut input)?.check_supported()?;
        let key = input.read_utf()?;
        let present = version < Version::V1_0_8 || input.read_bool()?;
        let factory_id = delegate_target(&input.read_utf()?);
        let delegate = if present {
            let block = input.read_block()?;
            LayoutInfo::new(self.base.decode_bytes(&factory_id, &block)?)
        } else {
            LayoutInfo::empty()
        };
        Ok(PredefinedLayout {
            key,
            factory_id,
            delegate,
        })
    }

    fn encode_predefined_xml(
        &self,
        layout: &PredefinedLayout,
        version: Version,
        element: &mut XElement,
    ) -> Result<()> {
        let replacement = element.add_element("replacement");
        replacement.add_string("id", layout.key.as_str());
        if version >= Version::V1_0_8 {
            replacement.add_bool("layout", !layout.delegate.is_empty());
        } else if layout.delegate.is_empty() {
            return Err(absent_delegate(layout, version));
        }

        let record = match layout.delegate.kind() {
            LayoutKind::Empty => None,
            LayoutKind::Record(record) => Some(record.clone()),
            LayoutKind::Xml(raw) => {
                let mut delegate = XElement::clone(raw);
                let id = delegate_id(raw.require_string("factory")?);
                delegate.set_name("delegate");
                delegate.add_string("factory", id);
                element.push(delegate);
                return Ok(());
            }
            LayoutKind::Bytes(entry) => {
                let (id, payload) = split_entry(entry)?;
                match self.base.decode_bytes(&id, &payload)? {
                    LayoutKind::Record(record) => Some(record),
                    _ => return Err(LayoutError::missing_factory(id)),
                }
            }
        };

        let mut delegate = XElement::new("delegate");
        match record {
            Some(record) => {
                delegate.add_string("factory", delegate_id(record.factory_id()));
                self.base.encode_xml(&record, &mut delegate)?;
            }
            None => {
                delegate.add_string("factory", delegate_id(&layout.factory_id));
            }
        }
        element.push(delegate);
        Ok(())
    }

    fn decode_predefined_xml(&self, element: &XElement) -> Result<PredefinedLayout> {
        let replacement = element.require_element("replacement")?;
        let key = replacement.require_string("id")?.to_string();
        let present = match replacement.attribute("layout") {
            Some(_) => replacement.require_bool("layout")?,
            None => true,
        };

        let stored = element.require_element("delegate")?;
        let factory_id = delegate_target(stored.require_string("factory")?);
        let delegate = if present {
            let mut inner = stored.clone();
            inner.set_name("layout");
            inner.add_string("factory", factory_id.as_str());
            LayoutInfo::new(self.base.decode_xml(&factory_id, &inner)?)
        } else {
            LayoutInfo::empty()
        };
        Ok(PredefinedLayout {
            key,
            factory_id,
            delegate,
        })
    }

    /// Decode a raw delegate with the factories registered now.
    fn refill(&self, delegate: &LayoutInfo) -> Result<LayoutInfo> {
        let kind = match delegate.kind() {
            LayoutKind::Bytes(entry) => {
                let (id, payload) = split_entry(entry)?;
                self.base.decode_bytes(&id, &payload)?
            }
            LayoutKind::Xml(element) => self
                .base
                .decode_xml(element.require_string("factory")?, element)?,
            _ => return Ok(delegate.clone()),
        };
        Ok(delegate.clone().with_kind(kind))
    }
}

impl<T: DockTree + 'static> Situation<T> for IdentityPreservingRegistry<T> {
    fn registry(&self) -> &FactoryRegistry<T> {
        &self.base
    }

    fn element_layout(
        &self,
        tree: &T,
        element: &T::Element,
        children: &ChildIds<T::Element>,
    ) -> Result<LayoutRecord> {
        let Some(key) = self.key_for(element) else {
            return self.base.element_layout(tree, element, children);
        };
        let delegate = if self.should_layout(tree, element) {
            LayoutInfo::from_record(self.base.element_layout(tree, element, children)?)
        } else {
            LayoutInfo::empty()
        };
        let factory_id = match delegate.record() {
            Some(record) => record.factory_id().to_string(),
            None => tree.factory_id(element),
        };
        Ok(LayoutRecord::new(
            PREDEFINED,
            PredefinedLayout {
                key: key.to_string(),
                factory_id,
                delegate,
            },
        ))
    }

    fn build_element(
        &self,
        tree: &mut T,
        record: &LayoutRecord,
        children: Option<&ChildMap<T::Element>>,
    ) -> Result<Option<T::Element>> {
        match predefined(record)? {
            Some(layout) => self.build_pinned(tree, layout, children),
            None => self.base.build_element(tree, record, children),
        }
    }

    fn encode_payload(&self, record: &LayoutRecord, version: Version) -> Result<Vec<u8>> {
        match predefined(record)? {
            Some(layout) => self.encode_predefined(layout, version),
            None => self.base.encode_bytes(record),
        }
    }

    fn decode_payload(&self, factory_id: &str, payload: &[u8]) -> Result<LayoutKind> {
        if factory_id != PREDEFINED {
            return self.base.decode_bytes(factory_id, payload);
        }
        let layout = self.decode_predefined(payload)?;
        Ok(LayoutKind::Record(LayoutRecord::new(PREDEFINED, layout)))
    }

    fn encode_payload_xml(
        &self,
        record: &LayoutRecord,
        version: Version,
        element: &mut XElement,
    ) -> Result<()> {
        match predefined(record)? {
            Some(layout) => self.encode_predefined_xml(layout, version, element),
            None => self.base.encode_xml(record, element),
        }
    }

    fn decode_payload_xml(&self, factory_id: &str, element: &XElement) -> Result<LayoutKind> {
        if factory_id != PREDEFINED {
            return self.base.decode_xml(factory_id, element);
        }
        let layout = self.decode_predefined_xml(element)?;
        Ok(LayoutKind::Record(LayoutRecord::new(PREDEFINED, layout)))
    }

    fn fill_record(&self, record: LayoutRecord) -> Result<LayoutRecord> {
        let Some(layout) = predefined(&record)? else {
            return Ok(record);
        };
        if !layout.delegate.is_raw() {
            return Ok(record);
        }
        let delegate = self.refill(&layout.delegate)?;
        Ok(LayoutRecord::new(
            PREDEFINED,
            PredefinedLayout {
                delegate,
                ..layout.clone()
            },
        ))
    }

    fn estimate_record(&self, record: &LayoutRecord, map: &mut LocationEstimationMap<'_>) -> Result<()> {
        match predefined(record)? {
            Some(layout) => match layout.delegate.record() {
                Some(delegate) => self.base.estimate_record(delegate, map),
                None => Ok(()),
            },
            None => self.base.estimate_record(record, map),
        }
    }
}

/// The pinned layout inside `record`, if `record` belongs to [`PREDEFINED`].
fn predefined(record: &LayoutRecord) -> Result<Option<&PredefinedLayout>> {
    if record.factory_id() != PREDEFINED {
        return Ok(None);
    }
    record
        .downcast::<PredefinedLayout>()
        .map(Some)
        .ok_or_else(|| LayoutError::PayloadMismatch {
            factory: PREDEFINED.to_string(),
        })
}

/// Before 1.0.8 a pinned entry always carries its delegate.
fn absent_delegate(layout: &PredefinedLayout, version: Version) -> LayoutError {
    LayoutError::InvalidData(format!(
        "pinned element '{}' has no layout, which version {} cannot express",
        layout.key, version
    ))
}

fn key_of_info(info: &LayoutInfo) -> Option<&str> {
    let record = info.record()?;
    if record.factory_id() != PREDEFINED {
        return None;
    }
    record
        .downcast::<PredefinedLayout>()
        .map(|layout| layout.key.as_str())
}

fn delegate_id(factory_id: &str) -> String {
    format!("{}{}", DELEGATE_PREFIX, factory_id)
}

/// The inner factory id of a stored delegate id.
fn delegate_target(wire_id: &str) -> String {
    let id = legacy_alias(wire_id).unwrap_or_else(|| wire_id.to_string());
    id.strip_prefix(DELEGATE_PREFIX).map(str::to_string).unwrap_or(id)
}
