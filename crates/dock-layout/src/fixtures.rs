//! In-memory element tree and factories shared by the unit tests.

use std::io::{Read, Write};

use dock_core::{DataInput, DataOutput, GridProperty, LocationProperty, StackProperty};
use dock_xml::XElement;

use crate::error::Result;
use crate::estimate::LocationEstimationMap;
use crate::factory::{ChildIds, ChildMap, ElementFactory, SideFactory};
use crate::registry::FactoryRegistry;
use crate::tree::DockTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node {
    factory: String,
    name: String,
    station: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    cell: Option<(i32, i32)>,
    location: Option<LocationProperty>,
    tag: Option<String>,
}

/// Arena of stations and dockables.
#[derive(Debug, Default)]
pub struct MemoryDock {
    nodes: Vec<Node>,
}

impl MemoryDock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, factory: &str, name: &str, station: bool) -> NodeId {
        self.nodes.push(Node {
            factory: factory.to_string(),
            name: name.to_string(),
            station,
            parent: None,
            children: Vec::new(),
            cell: None,
            location: None,
            tag: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn add_dockable(&mut self, name: &str) -> NodeId {
        self.push("dockable", name, false)
    }

    pub fn add_station(&mut self, factory: &str, name: &str) -> NodeId {
        self.push(factory, name, true)
    }

    /// Append `child` to `parent`, moving it away from any previous parent.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.detach(&child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].cell = None;
        self.nodes[parent.0].children.push(child);
    }

    pub fn attach_at(&mut self, parent: NodeId, child: NodeId, x: i32, y: i32) {
        self.attach(parent, child);
        self.nodes[child.0].cell = Some((x, y));
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn rename(&mut self, id: NodeId, name: &str) {
        self.nodes[id.0].name = name.to_string();
    }

    pub fn cell(&self, id: NodeId) -> Option<(i32, i32)> {
        self.nodes[id.0].cell
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].tag.as_deref()
    }

    /// `grid S[A@0,0, B@1,0]` for stations, `A` for dockables.
    pub fn describe(&self, id: NodeId) -> String {
        let node = &self.nodes[id.0];
        let mut text = if node.station {
            let children: Vec<_> = node.children.iter().map(|c| self.describe(*c)).collect();
            format!("{} {}[{}]", node.factory, node.name, children.join(", "))
        } else {
            node.name.clone()
        };
        if let Some((x, y)) = node.cell {
            text.push_str(&format!("@{},{}", x, y));
        }
        text
    }
}

impl DockTree for MemoryDock {
    type Element = NodeId;

    fn factory_id(&self, element: &NodeId) -> String {
        self.nodes[element.0].factory.clone()
    }

    fn is_station(&self, element: &NodeId) -> bool {
        self.nodes[element.0].station
    }

    fn children(&self, station: &NodeId) -> Vec<NodeId> {
        self.nodes[station.0].children.clone()
    }

    fn parent(&self, element: &NodeId) -> Option<NodeId> {
        self.nodes[element.0].parent
    }

    fn detach(&mut self, element: &NodeId) {
        if let Some(parent) = self.nodes[element.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| c != element);
        }
    }

    fn location(&self, element: &NodeId) -> Option<LocationProperty> {
        self.nodes[element.0].location.clone()
    }

    fn set_location(&mut self, element: &NodeId, location: LocationProperty) {
        self.nodes[element.0].location = Some(location);
    }
}

/// `root` stack holding dockable `X` and grid `S`, which holds `A` at (0, 0)
/// and `B` at (1, 0).
pub fn sample_tree() -> (MemoryDock, NodeId) {
    let mut tree = MemoryDock::new();
    let root = tree.add_station("stack", "root");
    let x = tree.add_dockable("X");
    tree.attach(root, x);

    let grid = tree.add_station("grid", "S");
    tree.attach(root, grid);
    let a = tree.add_dockable("A");
    tree.attach_at(grid, a, 0, 0);
    let b = tree.add_dockable("B");
    tree.attach_at(grid, b, 1, 0);
    (tree, root)
}

/// Registry with the dockable, stack and grid factories.
pub fn registry() -> FactoryRegistry<MemoryDock> {
    let mut registry = FactoryRegistry::new();
    registry.add_factory(DockableFactory);
    registry.add_factory(StackFactory);
    registry.add_factory(GridFactory::new());
    registry
}

pub struct DockableFactory;

impl ElementFactory<MemoryDock> for DockableFactory {
    type Layout = String;

    fn id(&self) -> &str {
        "dockable"
    }

    fn layout_of(&self, tree: &MemoryDock, element: &NodeId, _: &ChildIds<NodeId>) -> Result<String> {
        Ok(tree.name(*element).to_string())
    }

    fn create(&self, tree: &mut MemoryDock, layout: &String, _: Option<&ChildMap<NodeId>>) -> Result<Option<NodeId>> {
        Ok(Some(tree.add_dockable(layout)))
    }

    fn set_layout(
        &self,
        tree: &mut MemoryDock,
        element: &NodeId,
        layout: &String,
        _: Option<&ChildMap<NodeId>>,
    ) -> Result<()> {
        tree.rename(*element, layout);
        Ok(())
    }

    fn write(&self, layout: &String, out: &mut dyn Write) -> Result<()> {
        out.write_utf(layout)?;
        Ok(())
    }

    fn read(&self, input: &mut dyn Read) -> Result<String> {
        Ok(input.read_utf()?)
    }

    fn write_xml(&self, layout: &String, element: &mut XElement) -> Result<()> {
        element.add_element("name").set_value(layout.as_str());
        Ok(())
    }

    fn read_xml(&self, element: &XElement) -> Result<String> {
        Ok(element.require_element("name")?.value().to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackLayout {
    pub name: String,
    /// Child ids in tab order.
    pub order: Vec<usize>,
}

pub struct StackFactory;

impl ElementFactory<MemoryDock> for StackFactory {
    type Layout = StackLayout;

    fn id(&self) -> &str {
        "stack"
    }

    fn layout_of(&self, tree: &MemoryDock, element: &NodeId, children: &ChildIds<NodeId>) -> Result<StackLayout> {
        let order = tree
            .children(element)
            .iter()
            .filter_map(|child| children.get(child).copied())
            .collect();
        Ok(StackLayout {
            name: tree.name(*element).to_string(),
            order,
        })
    }

    fn create(
        &self,
        tree: &mut MemoryDock,
        layout: &StackLayout,
        children: Option<&ChildMap<NodeId>>,
    ) -> Result<Option<NodeId>> {
        let station = tree.add_station("stack", &layout.name);
        self.set_layout(tree, &station, layout, children)?;
        Ok(Some(station))
    }

    fn set_layout(
        &self,
        tree: &mut MemoryDock,
        element: &NodeId,
        layout: &StackLayout,
        children: Option<&ChildMap<NodeId>>,
    ) -> Result<()> {
        tree.rename(*element, &layout.name);
        if let Some(children) = children {
            for id in &layout.order {
                if let Some(child) = children.get(id) {
                    tree.attach(*element, *child);
                }
            }
        }
        Ok(())
    }

    fn estimate_locations(&self, layout: &StackLayout, map: &mut LocationEstimationMap<'_>) {
        for (index, id) in layout.order.iter().enumerate() {
            map.set_location(*id, LocationProperty::new(StackProperty::new(index as u32)));
        }
    }

    fn write(&self, layout: &StackLayout, out: &mut dyn Write) -> Result<()> {
        out.write_utf(&layout.name)?;
        out.write_len(layout.order.len())?;
        for id in &layout.order {
            out.write_len(*id)?;
        }
        Ok(())
    }

    fn read(&self, input: &mut dyn Read) -> Result<StackLayout> {
        let name = input.read_utf()?;
        let count = input.read_len()?;
        let order = (0..count).map(|_| input.read_len()).collect::<std::io::Result<_>>()?;
        Ok(StackLayout { name, order })
    }

    fn write_xml(&self, layout: &StackLayout, element: &mut XElement) -> Result<()> {
        element.add_string("name", layout.name.as_str());
        for id in &layout.order {
            element.add_element("item").add_int("id", *id as i64);
        }
        Ok(())
    }

    fn read_xml(&self, element: &XElement) -> Result<StackLayout> {
        let order = element
            .elements("item")
            .map(|item| Ok(item.require_int("id")? as usize))
            .collect::<Result<_>>()?;
        Ok(StackLayout {
            name: element.require_string("name")?.to_string(),
            order,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub name: String,
    /// `(child id, x, y)`.
    pub cells: Vec<(usize, i32, i32)>,
}

pub struct GridFactory {
    id: String,
}

impl GridFactory {
    pub fn new() -> Self {
        Self::with_id("grid")
    }

    pub fn with_id(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

impl ElementFactory<MemoryDock> for GridFactory {
    type Layout = GridLayout;

    fn id(&self) -> &str {
        &self.id
    }

    fn layout_of(&self, tree: &MemoryDock, element: &NodeId, children: &ChildIds<NodeId>) -> Result<GridLayout> {
        let cells = tree
            .children(element)
            .iter()
            .filter_map(|child| {
                let id = *children.get(child)?;
                let (x, y) = tree.cell(*child).unwrap_or((0, 0));
                Some((id, x, y))
            })
            .collect();
        Ok(GridLayout {
            name: tree.name(*element).to_string(),
            cells,
        })
    }

    fn create(
        &self,
        tree: &mut MemoryDock,
        layout: &GridLayout,
        children: Option<&ChildMap<NodeId>>,
    ) -> Result<Option<NodeId>> {
        let station = tree.add_station(&self.id, &layout.name);
        self.set_layout(tree, &station, layout, children)?;
        Ok(Some(station))
    }

    fn set_layout(
        &self,
        tree: &mut MemoryDock,
        element: &NodeId,
        layout: &GridLayout,
        children: Option<&ChildMap<NodeId>>,
    ) -> Result<()> {
        tree.rename(*element, &layout.name);
        if let Some(children) = children {
            for (id, x, y) in &layout.cells {
                if let Some(child) = children.get(id) {
                    tree.attach_at(*element, *child, *x, *y);
                }
            }
        }
        Ok(())
    }

    fn estimate_locations(&self, layout: &GridLayout, map: &mut LocationEstimationMap<'_>) {
        for (id, x, y) in &layout.cells {
            map.set_location(*id, LocationProperty::new(GridProperty::new(*x, *y)));
        }
    }

    fn write(&self, layout: &GridLayout, out: &mut dyn Write) -> Result<()> {
        out.write_utf(&layout.name)?;
        out.write_len(layout.cells.len())?;
        for (id, x, y) in &layout.cells {
            out.write_len(*id)?;
            out.write_i32(*x)?;
            out.write_i32(*y)?;
        }
        Ok(())
    }

    fn read(&self, input: &mut dyn Read) -> Result<GridLayout> {
        let name = input.read_utf()?;
        let count = input.read_len()?;
        let mut cells = Vec::with_capacity(count);
        for _ in 0..count {
            cells.push((input.read_len()?, input.read_i32()?, input.read_i32()?));
        }
        Ok(GridLayout { name, cells })
    }

    fn write_xml(&self, layout: &GridLayout, element: &mut XElement) -> Result<()> {
        element.add_string("name", layout.name.as_str());
        for (id, x, y) in &layout.cells {
            element
                .add_element("cell")
                .add_int("id", *id as i64)
                .add_int("x", i64::from(*x))
                .add_int("y", i64::from(*y));
        }
        Ok(())
    }

    fn read_xml(&self, element: &XElement) -> Result<GridLayout> {
        let mut cells = Vec::new();
        for cell in element.elements("cell") {
            cells.push((
                cell.require_int("id")? as usize,
                cell.require_int("x")? as i32,
                cell.require_int("y")? as i32,
            ));
        }
        Ok(GridLayout {
            name: element.require_string("name")?.to_string(),
            cells,
        })
    }
}

/// Side factory storing the element's name as a tag.
pub struct TagSideFactory;

impl SideFactory<MemoryDock> for TagSideFactory {
    type Layout = String;

    fn id(&self) -> &str {
        "tag"
    }

    fn layout_of(&self, tree: &MemoryDock, element: &NodeId) -> Result<String> {
        Ok(tree.name(*element).to_string())
    }

    fn apply(&self, tree: &mut MemoryDock, element: &NodeId, layout: &String) -> Result<()> {
        tree.nodes[element.0].tag = Some(layout.clone());
        Ok(())
    }

    fn write(&self, layout: &String, out: &mut dyn Write) -> Result<()> {
        out.write_utf(layout)?;
        Ok(())
    }

    fn read(&self, input: &mut dyn Read) -> Result<String> {
        Ok(input.read_utf()?)
    }

    fn write_xml(&self, layout: &String, element: &mut XElement) -> Result<()> {
        element.add_string("tag", layout.as_str());
        Ok(())
    }

    fn read_xml(&self, element: &XElement) -> Result<String> {
        Ok(element.require_string("tag")?.to_string())
    }
}
