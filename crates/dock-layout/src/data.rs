//! Type-erased layout payloads.

use std::any::Any;
use std::fmt;

/// Object-safe view of a factory's layout value.
///
/// Implemented for every `Debug + PartialEq + 'static` type, so factories
/// simply pick a plain struct as their layout.
pub trait LayoutData: fmt::Debug + 'static {
    fn as_any(&self) -> &dyn Any;

    /// Value equality across erased payloads; `false` when the types differ.
    fn eq_data(&self, other: &dyn LayoutData) -> bool;
}

impl<L: fmt::Debug + PartialEq + 'static> LayoutData for L {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_data(&self, other: &dyn LayoutData) -> bool {
        other.as_any().downcast_ref::<L>() == Some(self)
    }
}

impl dyn LayoutData {
    /// The payload as `L`, if it is one.
    pub fn downcast_ref<L: 'static>(&self) -> Option<&L> {
        self.as_any().downcast_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Cell(i32);

    #[test]
    fn test_eq_across_types() {
        let a: Box<dyn LayoutData> = Box::new(Cell(1));
        let b: Box<dyn LayoutData> = Box::new(Cell(1));
        let c: Box<dyn LayoutData> = Box::new(1i32);

        assert!(a.eq_data(b.as_ref()));
        assert!(!a.eq_data(c.as_ref()));
        assert_eq!(a.downcast_ref::<Cell>(), Some(&Cell(1)));
        assert!(c.downcast_ref::<Cell>().is_none());
    }
}
