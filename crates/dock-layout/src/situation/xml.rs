//! XML format.
//!
//! ```xml
//! <layout factory="grid" placeholder="dock.single.S">...</layout>
//! <adjacent>
//!   <layout factory="location">...</layout>
//! </adjacent>
//! <children ignore="false">
//!   <child>...</child>
//! </children>
//! ```
//!
//! Readers take an already parsed tree. Text parsed with [`dock_xml::parse`]
//! is limited to [`dock_xml::MAX_DEPTH`] element levels, two per composition
//! level plus the payload of the deepest layout.

use dock_core::{Path, Version};
use dock_xml::XElement;

use super::{CompositionMap, Situation};
use crate::composition::LayoutComposition;
use crate::error::{LayoutError, Result};
use crate::info::{LayoutInfo, LayoutKind, LayoutRecord};
use crate::options::{ReadOptions, WriteOptions};
use crate::registry::split_entry;
use crate::tree::DockTree;

pub(super) fn write_composition<T, S>(
    situation: &S,
    composition: &LayoutComposition,
    element: &mut XElement,
    options: &WriteOptions,
) -> Result<()>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let version = options.version.check_supported()?;
    write_entry(situation, composition, element, version)
}

pub(super) fn write_compositions<T, S>(
    situation: &S,
    compositions: &CompositionMap,
    element: &mut XElement,
    options: &WriteOptions,
) -> Result<()>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let version = options.version.check_supported()?;
    tracing::debug!(%version, roots = compositions.len(), "writing composition map");
    element.add_string("version", version.to_string());
    for (key, composition) in compositions {
        let child = element.add_element("element");
        child.add_string("key", key.as_str());
        write_entry(situation, composition, child, version)?;
    }
    Ok(())
}

pub(super) fn read_composition<T, S>(
    situation: &S,
    element: &XElement,
    options: &ReadOptions,
) -> Result<LayoutComposition>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    check_version(element)?;
    read_entry(situation, element, options, 0)
}

pub(super) fn read_compositions<T, S>(
    situation: &S,
    element: &XElement,
    options: &ReadOptions,
) -> Result<CompositionMap>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    check_version(element)?;
    let mut compositions = CompositionMap::new();
    for child in element.elements("element") {
        let key = child.require_string("key")?.to_string();
        compositions.insert(key, read_entry(situation, child, options, 0)?);
    }
    Ok(compositions)
}

/// The `version` attribute is optional; when present it must be supported.
fn check_version(element: &XElement) -> Result<()> {
    if let Some(text) = element.attribute("version") {
        Version::parse(text)?.check_supported()?;
    }
    Ok(())
}

fn write_entry<T, S>(
    situation: &S,
    composition: &LayoutComposition,
    element: &mut XElement,
    version: Version,
) -> Result<()>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let info = composition.info();
    let mut layout = layout_element(situation, info, version)?;
    if version >= Version::V1_0_8 {
        if let Some(placeholder) = info.placeholder() {
            layout.add_string("placeholder", placeholder.to_string());
        }
    }
    element.push(layout);

    if version >= Version::V1_0_7 && !composition.side_data().is_empty() {
        let adjacent = element.add_element("adjacent");
        for record in composition.side_data() {
            let factory = situation
                .registry()
                .side_factory(record.factory_id())
                .ok_or_else(|| LayoutError::missing_factory(record.factory_id()))?;
            let side = adjacent.add_element("layout");
            side.add_string("factory", record.factory_id());
            factory.dyn_write_xml(record.data(), side)?;
        }
    }

    let children = element.add_element("children");
    children.add_bool("ignore", composition.ignore_children());
    for child in composition.children() {
        write_entry(situation, child, children.add_element("child"), version)?;
    }
    Ok(())
}

fn layout_element<T, S>(situation: &S, info: &LayoutInfo, version: Version) -> Result<XElement>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    match info.kind() {
        LayoutKind::Empty => Err(LayoutError::EmptyLayout),
        LayoutKind::Xml(raw) => {
            let mut layout = XElement::clone(raw);
            layout.remove_attribute("placeholder");
            Ok(layout)
        }
        LayoutKind::Record(record) => record_element(situation, record, version),
        LayoutKind::Bytes(entry) => {
            let (id, payload) = split_entry(entry)?;
            match situation.decode_payload(&id, &payload)? {
                LayoutKind::Record(record) => record_element(situation, &record, version),
                _ => Err(LayoutError::missing_factory(id)),
            }
        }
    }
}

fn record_element<T, S>(situation: &S, record: &LayoutRecord, version: Version) -> Result<XElement>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let mut layout = XElement::new("layout");
    layout.add_string("factory", record.factory_id());
    situation.encode_payload_xml(record, version, &mut layout)?;
    Ok(layout)
}

fn read_entry<T, S>(
    situation: &S,
    element: &XElement,
    options: &ReadOptions,
    depth: usize,
) -> Result<LayoutComposition>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    if depth > options.max_depth {
        return Err(LayoutError::TooDeep {
            limit: options.max_depth,
        });
    }
    let registry = situation.registry();

    let layout = element.require_element("layout")?;
    let factory_id = layout.require_string("factory")?;
    let placeholder = layout.attribute("placeholder").map(Path::parse).transpose()?;
    let kind = situation.decode_payload_xml(factory_id, layout)?;

    let mut side_data = Vec::new();
    if let Some(adjacent) = element.element("adjacent") {
        for side in adjacent.elements("layout") {
            let id = side.require_string("factory")?;
            match registry.side_factory(id) {
                Some(factory) => side_data.push(LayoutRecord::from_arc(id, factory.dyn_read_xml(side)?)),
                None => tracing::warn!(factory = id, "dropping side data of unknown factory"),
            }
        }
    }

    let (ignore_children, children) = match element.element("children") {
        Some(children) => {
            let ignore = match children.attribute("ignore") {
                Some(_) => children.require_bool("ignore")?,
                None => false,
            };
            let list = children
                .elements("child")
                .map(|child| read_entry(situation, child, options, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            (ignore, list)
        }
        None => (false, Vec::new()),
    };

    let info = LayoutInfo::new(kind).with_placeholder(registry.valid_placeholder(placeholder));
    Ok(LayoutComposition::new(info, side_data, children, ignore_children))
}

#[cfg(test)]
mod tests {
    use dock_core::{Path, Version};
    use dock_xml::XElement;

    use crate::fixtures::{registry, sample_tree, MemoryDock, TagSideFactory};
    use crate::{
        CompositionMap, LayoutComposition, LayoutError, LayoutInfo, LayoutRecord, ReadOptions,
        Situation, WriteOptions,
    };

    fn written(composition: &LayoutComposition, options: &WriteOptions) -> XElement {
        let mut root = XElement::new("root");
        registry()
            .write_composition_xml(composition, &mut root, options)
            .unwrap();
        // Through text, so the parser is exercised as well.
        dock_xml::parse(&root.to_xml(options.pretty)).unwrap()
    }

    #[test]
    fn test_round_trip_rebuilds_tree() {
        let (tree, root) = sample_tree();
        let registry = registry();
        let composition = registry.convert_element(&tree, &root).unwrap().unwrap();

        let element = written(&composition, &WriteOptions::new().pretty());
        let back = registry
            .read_composition_xml(&element, &ReadOptions::default())
            .unwrap();
        assert_eq!(back, composition);

        let mut rebuilt_tree = MemoryDock::new();
        let rebuilt = registry
            .convert_composition(&mut rebuilt_tree, &back)
            .unwrap()
            .unwrap();
        assert_eq!(rebuilt_tree.describe(rebuilt), tree.describe(root));
    }

    #[test]
    fn test_element_shape() {
        let composition = LayoutComposition::leaf(
            LayoutInfo::from_record(LayoutRecord::new("dockable", "A".to_string()))
                .with_placeholder(Some(Path::parse("dock.single.A").unwrap())),
        );
        let element = written(&composition, &WriteOptions::default());

        let layout = element.require_element("layout").unwrap();
        assert_eq!(layout.attribute("factory"), Some("dockable"));
        assert_eq!(layout.attribute("placeholder"), Some("dock.single.A"));
        assert_eq!(
            element.require_element("children").unwrap().attribute("ignore"),
            Some("false")
        );
        assert!(element.element("adjacent").is_none());
    }

    #[test]
    fn test_missing_factory_keeps_raw_xml() {
        let (tree, root) = sample_tree();
        let composition = registry().convert_element(&tree, &root).unwrap().unwrap();
        let element = written(&composition, &WriteOptions::default());

        let mut partial = registry();
        partial.remove_factory("dockable");
        let back = partial
            .read_composition_xml(&element, &ReadOptions::default())
            .unwrap();
        let first = &back.children()[0];
        assert!(first.info().xml().is_some());
        assert_eq!(first.info().factory_id().as_deref(), Some("dockable"));

        // Raw XML is written back unchanged, but cannot become bytes.
        let mut again = XElement::new("root");
        partial
            .write_composition_xml(&back, &mut again, &WriteOptions::default())
            .unwrap();
        assert_eq!(again, element);
        let err = partial.to_bytes(&back, &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, LayoutError::MissingFactory { ref id } if id == "dockable"));

        // Once the factory is back, the raw parts decode to the original layout.
        assert_eq!(registry().fill_missing(&back).unwrap(), composition);
    }

    #[test]
    fn test_side_data_in_adjacent() {
        let (tree, root) = sample_tree();
        let mut registry = registry();
        registry.add_side_factory(TagSideFactory);
        let composition = registry.convert_element(&tree, &root).unwrap().unwrap();

        let mut element = XElement::new("root");
        registry
            .write_composition_xml(&composition, &mut element, &WriteOptions::default())
            .unwrap();
        let adjacent = element.require_element("adjacent").unwrap();
        assert_eq!(adjacent.elements("layout").count(), 1);
        assert_eq!(
            registry
                .read_composition_xml(&element, &ReadOptions::default())
                .unwrap(),
            composition
        );
    }

    #[test]
    fn test_compositions_map_versioned() {
        let (tree, root) = sample_tree();
        let registry = registry();
        let composition = registry.convert_element(&tree, &root).unwrap().unwrap();
        let mut roots = CompositionMap::new();
        roots.insert("center".to_string(), composition);

        let mut element = XElement::new("layouts");
        registry
            .write_compositions_xml(&roots, &mut element, &WriteOptions::default())
            .unwrap();
        assert_eq!(element.attribute("version"), Some("1.0.8"));
        assert_eq!(
            registry
                .read_compositions_xml(&element, &ReadOptions::default())
                .unwrap(),
            roots
        );

        element.add_string("version", Version::new(1, 2, 0).to_string());
        let err = registry
            .read_compositions_xml(&element, &ReadOptions::default())
            .unwrap_err();
        assert!(err.is_unsupported_version());
    }

    fn nested_stacks(levels: usize) -> LayoutComposition {
        let mut tree = MemoryDock::new();
        let root = tree.add_station("stack", "s0");
        let mut parent = root;
        for level in 1..levels {
            let station = tree.add_station("stack", &format!("s{}", level));
            tree.attach(parent, station);
            parent = station;
        }
        let leaf = tree.add_dockable("leaf");
        tree.attach(parent, leaf);
        registry().convert_element(&tree, &root).unwrap().unwrap()
    }

    #[test]
    fn test_text_reaches_read_depth_limit() {
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let limit = ReadOptions::default().max_depth;
                let registry = registry();

                let deepest = nested_stacks(limit);
                let element = written(&deepest, &WriteOptions::default());
                let back = registry
                    .read_composition_xml(&element, &ReadOptions::default())
                    .unwrap();
                assert_eq!(back.node_count(), limit + 1);

                let too_deep = nested_stacks(limit + 1);
                let element = written(&too_deep, &WriteOptions::default());
                let err = registry
                    .read_composition_xml(&element, &ReadOptions::default())
                    .unwrap_err();
                assert!(matches!(err, LayoutError::TooDeep { .. }));
            })
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_missing_layout_element() {
        let err = registry()
            .read_composition_xml(&XElement::new("root"), &ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err, LayoutError::Xml(dock_xml::XmlError::MissingElement { .. })));
    }
}
