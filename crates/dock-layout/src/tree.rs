//! The live element tree, as seen by the engine.
//!
//! The engine never owns live elements. A host exposes its stations and
//! dockables through [`DockTree`] and refers to them by cheap handles; two
//! handles compare equal exactly when they denote the same element.

use std::fmt;
use std::hash::Hash;

use dock_core::{LocationProperty, Path};

/// Read and detach access to a host's element tree.
pub trait DockTree {
    /// Handle of one live element.
    type Element: Clone + Eq + Hash + fmt::Debug;

    /// Id of the factory responsible for `element`.
    fn factory_id(&self, element: &Self::Element) -> String;

    /// Whether `element` is a station that can hold children.
    fn is_station(&self, element: &Self::Element) -> bool;

    /// Current children of a station, in station order. Empty for non-stations.
    fn children(&self, station: &Self::Element) -> Vec<Self::Element>;

    /// The station currently holding `element`.
    fn parent(&self, element: &Self::Element) -> Option<Self::Element>;

    /// Remove `element` from its parent. No-op for root elements.
    fn detach(&mut self, element: &Self::Element);

    /// Where the host currently places `element`, if it tracks that.
    fn location(&self, _element: &Self::Element) -> Option<LocationProperty> {
        None
    }

    /// Restore a location previously reported by [`DockTree::location`].
    fn set_location(&mut self, _element: &Self::Element, _location: LocationProperty) {}
}

/// Excludes elements, or the children of stations, from conversion.
pub trait IgnorePredicate<T: DockTree> {
    fn ignore_element(&self, tree: &T, element: &T::Element) -> bool;

    fn ignore_children(&self, _tree: &T, _station: &T::Element) -> bool {
        false
    }
}

impl<T, F> IgnorePredicate<T> for F
where
    T: DockTree,
    F: Fn(&T, &T::Element) -> bool,
{
    fn ignore_element(&self, tree: &T, element: &T::Element) -> bool {
        self(tree, element)
    }
}

/// Maps live elements to placeholder tokens.
pub trait PlaceholderStrategy<T: DockTree> {
    fn placeholder(&self, tree: &T, element: &T::Element) -> Option<Path>;

    /// Whether a placeholder read from a file is still meaningful.
    fn is_valid(&self, _placeholder: &Path) -> bool {
        true
    }
}

impl<T, F> PlaceholderStrategy<T> for F
where
    T: DockTree,
    F: Fn(&T, &T::Element) -> Option<Path>,
{
    fn placeholder(&self, tree: &T, element: &T::Element) -> Option<Path> {
        self(tree, element)
    }
}
