//! The tree form of a layout.

use crate::info::{LayoutInfo, LayoutRecord};

/// One node of a stored layout tree.
///
/// Compositions are values: they are built once and never mutated. When
/// `ignore_children` is set the children are kept for estimation and
/// diagnostics but are not used to rebuild live elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutComposition {
    info: LayoutInfo,
    side_data: Vec<LayoutRecord>,
    children: Vec<LayoutComposition>,
    ignore_children: bool,
}

impl LayoutComposition {
    pub fn new(
        info: LayoutInfo,
        side_data: Vec<LayoutRecord>,
        children: Vec<LayoutComposition>,
        ignore_children: bool,
    ) -> Self {
        Self {
            info,
            side_data,
            children,
            ignore_children,
        }
    }

    /// A node without side data and children.
    pub fn leaf(info: LayoutInfo) -> Self {
        Self::new(info, Vec::new(), Vec::new(), false)
    }

    pub fn info(&self) -> &LayoutInfo {
        &self.info
    }

    pub fn side_data(&self) -> &[LayoutRecord] {
        &self.side_data
    }

    /// The side record written by `factory_id`, if any.
    pub fn side(&self, factory_id: &str) -> Option<&LayoutRecord> {
        self.side_data.iter().find(|r| r.factory_id() == factory_id)
    }

    pub fn children(&self) -> &[LayoutComposition] {
        &self.children
    }

    pub fn ignore_children(&self) -> bool {
        self.ignore_children
    }

    /// Descend by child indices; the empty path is `self`.
    pub fn child(&self, path: &[usize]) -> Option<&LayoutComposition> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Number of nodes in this subtree, `self` included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    pub fn with_info(self, info: LayoutInfo) -> Self {
        Self { info, ..self }
    }

    pub fn with_side_data(self, side_data: Vec<LayoutRecord>) -> Self {
        Self { side_data, ..self }
    }

    pub fn with_children(self, children: Vec<LayoutComposition>) -> Self {
        Self { children, ..self }
    }
}
