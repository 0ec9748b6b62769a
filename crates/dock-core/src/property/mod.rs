//! Location properties.
//!
//! A [`LocationProperty`] is one hop of a path from a root station down to an
//! element: "tab 2 of this stack", "cell (1, 0) of this grid", "this rectangle
//! on screen". Hops are chained through `successor`, outermost first.

mod builtin;
mod codec;

use std::any::Any;
use std::fmt;
use std::io::Write;

use dock_xml::XElement;

use crate::error::Result;

pub use builtin::{
    GridProperty, GridPropertyFactory, ScreenProperty, ScreenPropertyFactory, StackProperty,
    StackPropertyFactory,
};
pub use codec::{PropertyCodec, PropertyFactory};

/// The value of a single hop, implemented by every property kind.
pub trait PropertyValue: fmt::Debug + Clone + PartialEq + 'static {
    /// Id of the [`PropertyFactory`] able to read this value back.
    fn factory_id(&self) -> &str;

    /// Encode the value alone (never its successor).
    fn write(&self, out: &mut dyn Write) -> Result<()>;

    /// Encode the value into `element` (never its successor).
    fn write_xml(&self, element: &mut XElement);
}

/// Object-safe view of a [`PropertyValue`], used inside chains.
pub trait DynProperty: fmt::Debug {
    fn dyn_factory_id(&self) -> &str;
    fn dyn_write(&self, out: &mut dyn Write) -> Result<()>;
    fn dyn_write_xml(&self, element: &mut XElement);
    fn dyn_clone(&self) -> Box<dyn DynProperty>;
    fn dyn_eq(&self, other: &dyn DynProperty) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<P: PropertyValue> DynProperty for P {
    fn dyn_factory_id(&self) -> &str {
        self.factory_id()
    }

    fn dyn_write(&self, out: &mut dyn Write) -> Result<()> {
        self.write(out)
    }

    fn dyn_write_xml(&self, element: &mut XElement) {
        self.write_xml(element)
    }

    fn dyn_clone(&self) -> Box<dyn DynProperty> {
        Box::new(self.clone())
    }

    fn dyn_eq(&self, other: &dyn DynProperty) -> bool {
        other.as_any().downcast_ref::<P>() == Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A chain of location hops.
///
/// Cloning copies the entire chain; two chains never share links. Clone,
/// comparison and drop walk the chain iteratively, so chain length is not
/// bounded by the stack.
pub struct LocationProperty {
    value: Box<dyn DynProperty>,
    successor: Option<Box<LocationProperty>>,
}

impl LocationProperty {
    /// A single hop without successor.
    pub fn new<P: PropertyValue>(value: P) -> Self {
        Self::from_dyn(Box::new(value))
    }

    /// A single hop from an already erased value.
    pub fn from_dyn(value: Box<dyn DynProperty>) -> Self {
        Self {
            value,
            successor: None,
        }
    }

    /// Id of the factory that reads this hop.
    pub fn factory_id(&self) -> &str {
        self.value.dyn_factory_id()
    }

    /// The value of this hop if it is a `P`.
    pub fn value<P: PropertyValue>(&self) -> Option<&P> {
        self.value.as_any().downcast_ref()
    }

    pub fn dyn_value(&self) -> &dyn DynProperty {
        self.value.as_ref()
    }

    /// Next hop, one level deeper.
    pub fn successor(&self) -> Option<&LocationProperty> {
        self.successor.as_deref()
    }

    pub fn set_successor(&mut self, successor: Option<LocationProperty>) {
        self.successor = successor.map(Box::new);
    }

    /// Replace the successor, consuming `self`.
    pub fn with_successor(mut self, successor: Option<LocationProperty>) -> Self {
        self.set_successor(successor);
        self
    }

    /// Attach `tail` after the last hop of this chain.
    pub fn append(&mut self, tail: LocationProperty) {
        if let Some(next) = self.successor.as_mut() {
            next.append(tail);
        } else {
            self.successor = Some(Box::new(tail));
        }
    }

    /// Number of hops in the chain.
    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    /// All hops, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = &LocationProperty> {
        std::iter::successors(Some(self), |link| link.successor())
    }

    /// Compare this hop alone, ignoring both successors.
    pub fn eq_no_successor(&self, other: &LocationProperty) -> bool {
        self.value.dyn_eq(other.value.as_ref())
    }
}

impl Clone for LocationProperty {
    fn clone(&self) -> Self {
        let tail: Vec<_> = self.iter().skip(1).collect();
        let successor = tail.into_iter().rev().fold(None, |successor, link| {
            Some(Self::from_dyn(link.value.dyn_clone()).with_successor(successor))
        });
        Self::from_dyn(self.value.dyn_clone()).with_successor(successor)
    }
}

impl PartialEq for LocationProperty {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.iter();
        let mut right = other.iter();
        loop {
            match (left.next(), right.next()) {
                (Some(a), Some(b)) if a.eq_no_successor(b) => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl Drop for LocationProperty {
    fn drop(&mut self) {
        let mut next = self.successor.take();
        while let Some(mut link) = next {
            next = link.successor.take();
        }
    }
}

impl fmt::Debug for LocationProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|link| &link.value)).finish()
    }
}

impl fmt::Display for LocationProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, link) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{:?}", link.value)?;
        }
        Ok(())
    }
}
