//! Location estimation.
//!
//! The estimator works on a private copy of a composition tree. A pass
//! starts with [`LocationEstimator::prepare`], which remembers the location
//! of every node. Factories then report child locations through a
//! [`LocationEstimationMap`] and [`LocationEstimationMap::finish`] decides,
//! per child, whether the reported location is kept, whether the parent's
//! location is inherited, or whether the child is given up on.
//!
//! A node that was given up on is `invalid` and is never touched again.
//! Whether a location changed is tracked by a flag set on every report, not
//! by comparing values: reporting an equal location still counts as a change.

use dock_core::LocationProperty;

use crate::composition::LayoutComposition;
use crate::error::Result;
use crate::info::{LayoutInfo, LayoutRecord};

#[derive(Debug)]
struct Node {
    info: LayoutInfo,
    side_data: Vec<LayoutRecord>,
    ignore_children: bool,
    location: Option<LocationProperty>,
    old: Option<LocationProperty>,
    changed: bool,
    finished: bool,
    invalid: bool,
    children: Vec<Node>,
}

impl Node {
    fn new(composition: &LayoutComposition) -> Self {
        Self {
            info: composition.info().clone(),
            side_data: composition.side_data().to_vec(),
            ignore_children: composition.ignore_children(),
            location: composition.info().location().cloned(),
            old: None,
            changed: false,
            finished: false,
            invalid: false,
            children: composition.children().iter().map(Node::new).collect(),
        }
    }

    fn prepare(&mut self) {
        if self.invalid {
            return;
        }
        self.old = self.location.clone();
        self.changed = false;
        self.finished = false;
        for child in &mut self.children {
            child.prepare();
        }
    }

    /// Keep a reported location, chaining the location it replaces.
    fn keep(&mut self) {
        if let (Some(location), Some(old)) = (self.location.as_mut(), self.old.as_ref()) {
            location.set_successor(Some(old.clone()));
        }
        self.finished = true;
    }

    fn node(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    fn into_composition(self) -> LayoutComposition {
        let info = self.info.with_location(self.location);
        let children = self.children.into_iter().map(Node::into_composition).collect();
        LayoutComposition::new(info, self.side_data, children, self.ignore_children)
    }

    fn visit<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&LayoutInfo, &mut LocationEstimationMap<'_>) -> Result<()>,
    {
        if self.invalid {
            return Ok(());
        }
        let info = self.info.clone();
        let mut map = LocationEstimationMap { node: &mut *self };
        f(&info, &mut map)?;
        map.finish();
        for child in &mut self.children {
            child.visit(f)?;
        }
        Ok(())
    }

    fn collect<'a>(
        &'a self,
        path: &mut Vec<usize>,
        f: &mut dyn FnMut(&[usize], &'a LayoutInfo, &'a LocationProperty),
    ) {
        if self.invalid {
            return;
        }
        if self.changed {
            if let Some(location) = &self.location {
                f(path.as_slice(), &self.info, location);
            }
        }
        for (index, child) in self.children.iter().enumerate() {
            path.push(index);
            child.collect(path, f);
            path.pop();
        }
    }
}

/// Estimates the locations of all nodes below one root composition.
#[derive(Debug)]
pub struct LocationEstimator {
    root: Node,
}

impl LocationEstimator {
    pub fn new(composition: &LayoutComposition) -> Self {
        Self {
            root: Node::new(composition),
        }
    }

    /// Snapshot the current location of every node that is not invalid.
    pub fn prepare(&mut self) {
        self.root.prepare();
    }

    /// Start a pass in which the root moved to `location`.
    pub fn set_root_location(&mut self, location: LocationProperty) {
        self.prepare();
        self.root.location = Some(location);
        self.root.changed = true;
    }

    /// Map over the root's children, for callers driving a pass by hand.
    pub fn root_map(&mut self) -> LocationEstimationMap<'_> {
        LocationEstimationMap {
            node: &mut self.root,
        }
    }

    /// Visit every node that is still valid, parents before children.
    ///
    /// `f` receives the node's layout and a map over its children; the map is
    /// finished after `f` returns.
    pub fn run<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&LayoutInfo, &mut LocationEstimationMap<'_>) -> Result<()>,
    {
        self.root.visit(&mut f)
    }

    /// Every node whose location was estimated in this pass, by child path.
    pub fn for_each_estimated<'a>(
        &'a self,
        mut f: impl FnMut(&[usize], &'a LayoutInfo, &'a LocationProperty),
    ) {
        self.root.collect(&mut Vec::new(), &mut f);
    }

    /// Whether the node at `path`, or one of its ancestors, was given up on.
    /// `None` when `path` does not name a node.
    pub fn is_invalid(&self, path: &[usize]) -> Option<bool> {
        let mut node = &self.root;
        let mut invalid = node.invalid;
        for &index in path {
            node = node.children.get(index)?;
            invalid |= node.invalid;
        }
        Some(invalid)
    }

    pub fn location(&self, path: &[usize]) -> Option<&LocationProperty> {
        self.root.node(path)?.location.as_ref()
    }

    /// The composition with every node's current location stored in its info.
    pub fn into_composition(self) -> LayoutComposition {
        self.root.into_composition()
    }
}

/// View of one node and its children during an estimation pass.
#[derive(Debug)]
pub struct LocationEstimationMap<'a> {
    node: &'a mut Node,
}

impl<'a> LocationEstimationMap<'a> {
    pub fn root(&self) -> &LayoutInfo {
        &self.node.info
    }

    pub fn root_location(&self) -> Option<&LocationProperty> {
        self.node.location.as_ref()
    }

    pub fn child_count(&self) -> usize {
        self.node.children.len()
    }

    pub fn child(&self, index: usize) -> Option<&LayoutInfo> {
        self.node.children.get(index).map(|c| &c.info)
    }

    pub fn child_location(&self, index: usize) -> Option<&LocationProperty> {
        self.node.children.get(index)?.location.as_ref()
    }

    pub fn sub_child_count(&self, index: usize) -> usize {
        self.node.children.get(index).map_or(0, |c| c.children.len())
    }

    pub fn sub_child(&self, index: usize, sub_index: usize) -> Option<&LayoutInfo> {
        let child = self.node.children.get(index)?;
        child.children.get(sub_index).map(|c| &c.info)
    }

    /// Report where child `index` sits. Ignored for unknown or invalid children.
    pub fn set_location(&mut self, index: usize, location: LocationProperty) {
        if let Some(child) = self.node.children.get_mut(index) {
            report(child, location);
        }
    }

    /// Report where grandchild `sub_index` of child `index` sits.
    pub fn set_sub_location(&mut self, index: usize, sub_index: usize, location: LocationProperty) {
        if let Some(sub) = self
            .node
            .children
            .get_mut(index)
            .and_then(|c| c.children.get_mut(sub_index))
        {
            report(sub, location);
        }
    }

    /// Map over the children of child `index`.
    pub fn sub_map(&mut self, index: usize) -> Option<LocationEstimationMap<'_>> {
        let node = self.node.children.get_mut(index)?;
        (!node.invalid).then(|| LocationEstimationMap { node })
    }

    /// Settle every child that is neither finished nor invalid.
    pub fn finish(&mut self) {
        let parent_location = self
            .node
            .changed
            .then(|| self.node.location.clone())
            .flatten();

        for child in &mut self.node.children {
            if child.invalid || child.finished {
                continue;
            }
            if child.changed {
                child.keep();
            } else if let Some(parent) = &parent_location {
                child.location = Some(parent.clone().with_successor(child.old.clone()));
                child.changed = true;
                child.finished = true;
            } else {
                child.invalid = true;
            }

            for sub in &mut child.children {
                if sub.changed && !sub.finished && !sub.invalid {
                    sub.keep();
                }
            }
        }
    }
}

fn report(node: &mut Node, location: LocationProperty) {
    if node.invalid {
        return;
    }
    node.location = Some(location);
    node.changed = true;
    node.finished = false;
}
