use dock_xml::XElement;

use super::Situation;
use crate::composition::LayoutComposition;
use crate::error::Result;
use crate::factory::{ChildIds, ChildMap};
use crate::info::{LayoutInfo, LayoutKind};
use crate::registry::split_entry;
use crate::tree::DockTree;

pub(super) fn to_composition<T, S>(
    situation: &S,
    tree: &T,
    element: &T::Element,
) -> Result<Option<LayoutComposition>>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let registry = situation.registry();
    if registry.ignores_element(tree, element) {
        return Ok(None);
    }

    let ignore_children = tree.is_station(element) && registry.ignores_children(tree, element);
    let mut ids = ChildIds::new();
    let mut children = Vec::new();
    if !ignore_children {
        for child in tree.children(element) {
            if let Some(composition) = to_composition(situation, tree, &child)? {
                ids.insert(child, children.len());
                children.push(composition);
            }
        }
    }

    let record = situation.element_layout(tree, element, &ids)?;
    tracing::trace!(factory = record.factory_id(), children = children.len(), "converted element");
    let info = LayoutInfo::from_record(record).with_placeholder(registry.placeholder(tree, element));
    let side_data = registry.side_layouts(tree, element)?;
    Ok(Some(LayoutComposition::new(info, side_data, children, ignore_children)))
}

pub(super) fn to_element<T, S>(
    situation: &S,
    tree: &mut T,
    composition: &LayoutComposition,
) -> Result<Option<T::Element>>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let Some(record) = composition.info().record() else {
        tracing::debug!(
            factory = ?composition.info().factory_id(),
            "skipping subtree without decoded layout"
        );
        return Ok(None);
    };

    let mut children = ChildMap::new();
    for (index, child) in composition.children().iter().enumerate() {
        let Some(element) = to_element(situation, tree, child)? else {
            continue;
        };
        if composition.ignore_children() {
            continue;
        }
        if tree.parent(&element).is_some() {
            tree.detach(&element);
        }
        children.insert(index, element);
    }

    let children = (!composition.ignore_children()).then_some(&children);
    let element = situation.build_element(tree, record, children)?;
    if let Some(element) = &element {
        situation
            .registry()
            .apply_side_data(tree, element, composition)?;
    }
    Ok(element)
}

pub(super) fn fill_missing<T, S>(situation: &S, composition: &LayoutComposition) -> Result<LayoutComposition>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let info = fill_info(situation, composition.info())?;
    let children = composition
        .children()
        .iter()
        .map(|child| fill_missing(situation, child))
        .collect::<Result<Vec<_>>>()?;
    Ok(composition.clone().with_info(info).with_children(children))
}

/// Decode the raw kinds of `info` where a factory is now available.
pub(crate) fn fill_info<T, S>(situation: &S, info: &LayoutInfo) -> Result<LayoutInfo>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let kind = match info.kind() {
        LayoutKind::Bytes(entry) => {
            let (id, payload) = split_entry(entry)?;
            situation.decode_payload(&id, &payload)?
        }
        LayoutKind::Xml(element) => decode_raw_xml(situation, element)?,
        other => other.clone(),
    };
    let kind = match kind {
        LayoutKind::Record(record) => LayoutKind::Record(situation.fill_record(record)?),
        other => other,
    };
    Ok(info.clone().with_kind(kind))
}

pub(crate) fn decode_raw_xml<T, S>(situation: &S, element: &XElement) -> Result<LayoutKind>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let id = element.require_string("factory")?;
    situation.decode_payload_xml(id, element)
}
