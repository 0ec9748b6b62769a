//! Binary stream format.
//!
//! ```text
//! stream  = version entry
//! map     = version count:i32 { key:utf entry }
//! entry   = [placeholder]         ; since 1.0.8: present:bool [path:utf]
//!           factory_id:utf len:i32 payload
//!           [sides]               ; since 1.0.7: count:i32 { factory_id:utf len:i32 payload }
//!           ignore_children:bool
//!           count:i32 { entry }
//! ```

use std::io::{Read, Write};

use dock_core::{DataInput, DataOutput, Path, Version};

use super::{CompositionMap, Situation};
use crate::composition::LayoutComposition;
use crate::error::{LayoutError, Result};
use crate::info::{LayoutInfo, LayoutKind, LayoutRecord};
use crate::options::{ReadOptions, WriteOptions};
use crate::tree::DockTree;

pub(super) fn write_composition<T, S>(
    situation: &S,
    composition: &LayoutComposition,
    out: &mut dyn Write,
    options: &WriteOptions,
) -> Result<()>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let version = options.version.check_supported()?;
    version.write(out)?;
    write_entry(situation, composition, out, version)
}

pub(super) fn write_compositions<T, S>(
    situation: &S,
    compositions: &CompositionMap,
    out: &mut dyn Write,
    options: &WriteOptions,
) -> Result<()>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let version = options.version.check_supported()?;
    tracing::debug!(%version, roots = compositions.len(), "writing composition map");
    version.write(out)?;
    out.write_len(compositions.len())?;
    for (key, composition) in compositions {
        out.write_utf(key)?;
        write_entry(situation, composition, out, version)?;
    }
    Ok(())
}

pub(super) fn read_composition<T, S>(
    situation: &S,
    input: &mut dyn Read,
    options: &ReadOptions,
) -> Result<LayoutComposition>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let version = Version::read(input)?.check_supported()?;
    tracing::debug!(%version, "reading layout stream");
    read_entry(situation, input, version, options, 0)
}

pub(super) fn read_compositions<T, S>(
    situation: &S,
    input: &mut dyn Read,
    options: &ReadOptions,
) -> Result<CompositionMap>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let version = Version::read(input)?.check_supported()?;
    let count = input.read_len()?;
    tracing::debug!(%version, roots = count, "reading composition map");
    let mut compositions = CompositionMap::with_capacity(count.min(64));
    for _ in 0..count {
        let key = input.read_utf()?;
        let composition = read_entry(situation, input, version, options, 0)?;
        compositions.insert(key, composition);
    }
    Ok(compositions)
}

fn write_entry<T, S>(
    situation: &S,
    composition: &LayoutComposition,
    out: &mut dyn Write,
    version: Version,
) -> Result<()>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let info = composition.info();
    if version >= Version::V1_0_8 {
        match info.placeholder() {
            Some(placeholder) => {
                out.write_bool(true)?;
                out.write_utf(&placeholder.to_string())?;
            }
            None => out.write_bool(false)?,
        }
    }

    write_layout(situation, info, out, version)?;

    if version >= Version::V1_0_7 {
        out.write_len(composition.side_data().len())?;
        for record in composition.side_data() {
            let factory = situation
                .registry()
                .side_factory(record.factory_id())
                .ok_or_else(|| LayoutError::missing_factory(record.factory_id()))?;
            let mut payload = Vec::new();
            factory.dyn_write(record.data(), &mut payload)?;
            out.write_utf(record.factory_id())?;
            out.write_block(&payload)?;
        }
    }

    out.write_bool(composition.ignore_children())?;
    out.write_len(composition.children().len())?;
    for child in composition.children() {
        write_entry(situation, child, out, version)?;
    }
    Ok(())
}

fn write_layout<T, S>(situation: &S, info: &LayoutInfo, out: &mut dyn Write, version: Version) -> Result<()>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    match info.kind() {
        LayoutKind::Empty => Err(LayoutError::EmptyLayout),
        LayoutKind::Bytes(entry) => {
            out.write_all(entry)?;
            Ok(())
        }
        LayoutKind::Record(record) => write_record(situation, record, out, version),
        LayoutKind::Xml(element) => match super::convert::decode_raw_xml(situation, element)? {
            LayoutKind::Record(record) => write_record(situation, &record, out, version),
            _ => Err(LayoutError::missing_factory(
                element.attribute("factory").unwrap_or_default(),
            )),
        },
    }
}

fn write_record<T, S>(
    situation: &S,
    record: &LayoutRecord,
    out: &mut dyn Write,
    version: Version,
) -> Result<()>
where
    T: DockTree,
    S: Situation<T> + ?Sized,
{
    let payload = situation.encode_payload(record, version)?;
    out.write_utf(record.factory_id())?;
    out.write_block(&payload)?;
    Ok(())
}

fn read_entry<T, S>(
    situation: &S,
    input: &mut dyn Read,
    version: Version,
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

    let placeholder = if version >= Version::V1_0_8 && input.read_bool()? {
        Some(Path::parse(&input.read_utf()?)?)
    } else {
        None
    };

    let factory_id = input.read_utf()?;
    let payload = input.read_block()?;
    let kind = situation.decode_payload(&factory_id, &payload)?;

    let mut side_data = Vec::new();
    if version >= Version::V1_0_7 {
        let count = input.read_len()?;
        for _ in 0..count {
            let id = input.read_utf()?;
            let payload = input.read_block()?;
            match registry.side_factory(&id) {
                Some(factory) => {
                    let data = factory.dyn_read(&mut payload.as_slice())?;
                    side_data.push(LayoutRecord::from_arc(id, data));
                }
                None => tracing::warn!(factory = %id, "dropping side data of unknown factory"),
            }
        }
    }

    let ignore_children = input.read_bool()?;
    let count = input.read_len()?;
    let mut children = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        children.push(read_entry(situation, input, version, options, depth + 1)?);
    }

    let info = LayoutInfo::new(kind).with_placeholder(registry.valid_placeholder(placeholder));
    Ok(LayoutComposition::new(info, side_data, children, ignore_children))
}
