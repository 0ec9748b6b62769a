//! Built-in property kinds for the common station shapes.

use std::io::{Read, Write};

use dock_xml::XElement;

use super::codec::PropertyFactory;
use super::PropertyValue;
use crate::error::{CoreError, Result};
use crate::path::Path;
use crate::stream::{DataInput, DataOutput};

/// Position of a tab inside a stack station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackProperty {
    pub index: u32,
    /// Placeholder of the slot, kept so a missing tab can reclaim its index.
    pub placeholder: Option<Path>,
}

impl StackProperty {
    pub const ID: &'static str = "stack";

    pub fn new(index: u32) -> Self {
        Self {
            index,
            placeholder: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: Path) -> Self {
        self.placeholder = Some(placeholder);
        self
    }
}

impl PropertyValue for StackProperty {
    fn factory_id(&self) -> &str {
        Self::ID
    }

    fn write(&self, out: &mut dyn Write) -> Result<()> {
        out.write_i32(to_i32(self.index)?)?;
        match &self.placeholder {
            Some(placeholder) => {
                out.write_bool(true)?;
                out.write_utf(&placeholder.to_string())?;
            }
            None => out.write_bool(false)?,
        }
        Ok(())
    }

    fn write_xml(&self, element: &mut XElement) {
        element.add_int("index", i64::from(self.index));
        if let Some(placeholder) = &self.placeholder {
            element.add_string("placeholder", placeholder.to_string());
        }
    }
}

/// Reads [`StackProperty`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackPropertyFactory;

impl PropertyFactory for StackPropertyFactory {
    type Property = StackProperty;

    fn id(&self) -> &str {
        StackProperty::ID
    }

    fn read(&self, input: &mut dyn Read) -> Result<StackProperty> {
        let index = to_u32(input.read_i32()?)?;
        let placeholder = if input.read_bool()? {
            Some(Path::parse(&input.read_utf()?)?)
        } else {
            None
        };
        Ok(StackProperty { index, placeholder })
    }

    fn read_xml(&self, element: &XElement) -> Result<StackProperty> {
        let index = to_u32(xml_i32(element, "index")?)?;
        let placeholder = element.attribute("placeholder").map(Path::parse).transpose()?;
        Ok(StackProperty { index, placeholder })
    }
}

/// A cell of a grid station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridProperty {
    pub x: i32,
    pub y: i32,
}

impl GridProperty {
    pub const ID: &'static str = "grid";

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl PropertyValue for GridProperty {
    fn factory_id(&self) -> &str {
        Self::ID
    }

    fn write(&self, out: &mut dyn Write) -> Result<()> {
        out.write_i32(self.x)?;
        out.write_i32(self.y)?;
        Ok(())
    }

    fn write_xml(&self, element: &mut XElement) {
        element
            .add_int("x", i64::from(self.x))
            .add_int("y", i64::from(self.y));
    }
}

/// Reads [`GridProperty`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridPropertyFactory;

impl PropertyFactory for GridPropertyFactory {
    type Property = GridProperty;

    fn id(&self) -> &str {
        GridProperty::ID
    }

    fn read(&self, input: &mut dyn Read) -> Result<GridProperty> {
        Ok(GridProperty::new(input.read_i32()?, input.read_i32()?))
    }

    fn read_xml(&self, element: &XElement) -> Result<GridProperty> {
        Ok(GridProperty::new(xml_i32(element, "x")?, xml_i32(element, "y")?))
    }
}

/// A free floating rectangle on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenProperty {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub fullscreen: bool,
}

impl ScreenProperty {
    pub const ID: &'static str = "screen";

    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fullscreen: false,
        }
    }
}

impl PropertyValue for ScreenProperty {
    fn factory_id(&self) -> &str {
        Self::ID
    }

    fn write(&self, out: &mut dyn Write) -> Result<()> {
        for value in [self.x, self.y, self.width, self.height] {
            out.write_i32(value)?;
        }
        out.write_bool(self.fullscreen)?;
        Ok(())
    }

    fn write_xml(&self, element: &mut XElement) {
        element
            .add_int("x", i64::from(self.x))
            .add_int("y", i64::from(self.y))
            .add_int("width", i64::from(self.width))
            .add_int("height", i64::from(self.height))
            .add_bool("fullscreen", self.fullscreen);
    }
}

/// Reads [`ScreenProperty`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenPropertyFactory;

impl PropertyFactory for ScreenPropertyFactory {
    type Property = ScreenProperty;

    fn id(&self) -> &str {
        ScreenProperty::ID
    }

    fn read(&self, input: &mut dyn Read) -> Result<ScreenProperty> {
        let x = input.read_i32()?;
        let y = input.read_i32()?;
        let width = input.read_i32()?;
        let height = input.read_i32()?;
        let fullscreen = input.read_bool()?;
        Ok(ScreenProperty {
            x,
            y,
            width,
            height,
            fullscreen,
        })
    }

    fn read_xml(&self, element: &XElement) -> Result<ScreenProperty> {
        Ok(ScreenProperty {
            x: xml_i32(element, "x")?,
            y: xml_i32(element, "y")?,
            width: xml_i32(element, "width")?,
            height: xml_i32(element, "height")?,
            fullscreen: element.require_bool("fullscreen")?,
        })
    }
}

fn xml_i32(element: &XElement, name: &str) -> Result<i32> {
    let value = element.require_int(name)?;
    i32::try_from(value)
        .map_err(|_| CoreError::InvalidData(format!("attribute '{}' out of range: {}", name, value)))
}

fn to_i32(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| CoreError::InvalidData(format!("index {} out of range", value)))
}

fn to_u32(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| CoreError::InvalidData(format!("negative index {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_placeholder_binary() {
        let value = StackProperty::new(4).with_placeholder(Path::parse("dock.single.A").unwrap());
        let mut out = Vec::new();
        value.write(&mut out).unwrap();
        let back = StackPropertyFactory.read(&mut out.as_slice()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_screen_xml() {
        let value = ScreenProperty::new(-5, 10, 640, 480);
        let mut element = XElement::new("property");
        value.write_xml(&mut element);
        assert_eq!(element.attribute("width"), Some("640"));
        assert_eq!(ScreenPropertyFactory.read_xml(&element).unwrap(), value);
    }

    #[test]
    fn test_negative_stack_index_rejected() {
        let mut element = XElement::new("property");
        element.add_int("index", -1);
        assert!(StackPropertyFactory.read_xml(&element).is_err());
    }

    #[test]
    fn test_grid_missing_attribute() {
        let mut element = XElement::new("property");
        element.add_int("x", 1);
        let err = GridPropertyFactory.read_xml(&element).unwrap_err();
        assert!(matches!(err, CoreError::Xml(_)));
    }
}
