//! Layout data of a single element.

use std::sync::Arc;

use dock_core::{DataInput, LocationProperty, Path};
use dock_xml::XElement;

use crate::data::LayoutData;

/// A structured payload tagged with the id of the factory that understands it.
#[derive(Debug, Clone)]
pub struct LayoutRecord {
    factory_id: String,
    data: Arc<dyn LayoutData>,
}

impl LayoutRecord {
    pub fn new<L: LayoutData>(factory_id: impl Into<String>, data: L) -> Self {
        Self::from_arc(factory_id, Arc::new(data))
    }

    pub fn from_arc(factory_id: impl Into<String>, data: Arc<dyn LayoutData>) -> Self {
        Self {
            factory_id: factory_id.into(),
            data,
        }
    }

    pub fn factory_id(&self) -> &str {
        &self.factory_id
    }

    pub fn data(&self) -> &dyn LayoutData {
        self.data.as_ref()
    }

    /// The payload as `L`, if it is one.
    pub fn downcast<L: 'static>(&self) -> Option<&L> {
        self.data().downcast_ref()
    }
}

impl PartialEq for LayoutRecord {
    fn eq(&self, other: &Self) -> bool {
        self.factory_id == other.factory_id && self.data.eq_data(other.data.as_ref())
    }
}

/// The representation an element's layout currently has.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LayoutKind {
    /// No layout at all.
    #[default]
    Empty,
    /// A complete binary entry (`factory_id`, length, payload) whose factory
    /// was unknown when it was read.
    Bytes(Arc<[u8]>),
    /// A `<layout factory="...">` element whose factory was unknown when it was read.
    Xml(Arc<XElement>),
    /// A decoded payload.
    Record(LayoutRecord),
}

/// Layout data of one element: exactly one [`LayoutKind`] plus an optional
/// placeholder and an optional location.
///
/// `LayoutInfo` is a value; every `with_*` method returns a new info.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutInfo {
    kind: LayoutKind,
    placeholder: Option<Path>,
    location: Option<LocationProperty>,
}

impl LayoutInfo {
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            kind,
            placeholder: None,
            location: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_record(record: LayoutRecord) -> Self {
        Self::new(LayoutKind::Record(record))
    }

    pub fn from_bytes(entry: impl Into<Arc<[u8]>>) -> Self {
        Self::new(LayoutKind::Bytes(entry.into()))
    }

    pub fn from_xml(element: XElement) -> Self {
        Self::new(LayoutKind::Xml(Arc::new(element)))
    }

    pub fn kind(&self) -> &LayoutKind {
        &self.kind
    }

    pub fn record(&self) -> Option<&LayoutRecord> {
        match &self.kind {
            LayoutKind::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            LayoutKind::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn xml(&self) -> Option<&XElement> {
        match &self.kind {
            LayoutKind::Xml(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, LayoutKind::Empty)
    }

    /// Whether the payload is still waiting for its factory.
    pub fn is_raw(&self) -> bool {
        matches!(self.kind, LayoutKind::Bytes(_) | LayoutKind::Xml(_))
    }

    /// The factory id of any non-empty representation.
    pub fn factory_id(&self) -> Option<String> {
        match &self.kind {
            LayoutKind::Empty => None,
            LayoutKind::Record(record) => Some(record.factory_id().to_string()),
            LayoutKind::Xml(element) => element.attribute("factory").map(str::to_string),
            LayoutKind::Bytes(bytes) => (&mut &bytes[..]).read_utf().ok(),
        }
    }

    pub fn placeholder(&self) -> Option<&Path> {
        self.placeholder.as_ref()
    }

    pub fn location(&self) -> Option<&LocationProperty> {
        self.location.as_ref()
    }

    /// Same layout with a different representation.
    pub fn with_kind(self, kind: LayoutKind) -> Self {
        Self { kind, ..self }
    }

    pub fn with_placeholder(self, placeholder: Option<Path>) -> Self {
        Self {
            placeholder,
            ..self
        }
    }

    pub fn with_location(self, location: Option<LocationProperty>) -> Self {
        Self { location, ..self }
    }
}
