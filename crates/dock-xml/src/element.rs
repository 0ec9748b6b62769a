//! The owned element tree.

use crate::error::{Result, XmlError};

/// An XML element with attributes, a text value and child elements.
///
/// Attributes keep their insertion order so that written files are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XElement {
    name: String,
    attributes: Vec<(String, String)>,
    value: String,
    children: Vec<XElement>,
}

impl XElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename this element.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// All attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Look up an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a string attribute, replacing an existing one with the same name.
    pub fn add_string(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Set an integer attribute.
    pub fn add_int(&mut self, name: impl Into<String>, value: i64) -> &mut Self {
        self.add_string(name, value.to_string())
    }

    /// Set a boolean attribute.
    pub fn add_bool(&mut self, name: impl Into<String>, value: bool) -> &mut Self {
        self.add_string(name, if value { "true" } else { "false" })
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Text content.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the text content.
    pub fn set_value(&mut self, value: impl Into<String>) -> &mut Self {
        self.value = value.into();
        self
    }

    /// Append a new child element and return it for further building.
    pub fn add_element(&mut self, name: impl Into<String>) -> &mut XElement {
        self.children.push(XElement::new(name));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Append an existing element as the last child.
    pub fn push(&mut self, child: XElement) {
        self.children.push(child);
    }

    /// All children in document order.
    pub fn children(&self) -> &[XElement] {
        &self.children
    }

    /// First child with the given name.
    pub fn element(&self, name: &str) -> Option<&XElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name.
    pub fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First child with the given name, or a `MissingElement` error.
    pub fn require_element(&self, name: &str) -> Result<&XElement> {
        self.element(name).ok_or_else(|| XmlError::MissingElement {
            parent: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// A string attribute, or a `MissingAttribute` error.
    pub fn require_string(&self, name: &str) -> Result<&str> {
        self.attribute(name).ok_or_else(|| XmlError::MissingAttribute {
            element: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// An integer attribute.
    pub fn require_int(&self, name: &str) -> Result<i64> {
        let raw = self.require_string(name)?;
        raw.trim().parse().map_err(|_| self.invalid(name, raw))
    }

    /// A boolean attribute (`true` or `false`).
    pub fn require_bool(&self, name: &str) -> Result<bool> {
        match self.require_string(name)? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(self.invalid(name, other)),
        }
    }

    fn invalid(&self, name: &str, value: &str) -> XmlError {
        XmlError::InvalidValue {
            element: self.name.clone(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_replace() {
        let mut element = XElement::new("layout");
        element.add_string("factory", "grid").add_int("count", 3);
        element.add_string("factory", "stack");

        assert_eq!(element.attribute("factory"), Some("stack"));
        assert_eq!(element.attributes().count(), 2);
        assert_eq!(element.require_int("count").unwrap(), 3);
    }

    #[test]
    fn test_missing_element_names_parent() {
        let element = XElement::new("children");
        let err = element.require_element("child").unwrap_err();
        assert_eq!(
            err,
            XmlError::MissingElement {
                parent: "children".into(),
                name: "child".into()
            }
        );
    }

    #[test]
    fn test_require_bool() {
        let mut element = XElement::new("children");
        element.add_bool("ignore", true);
        assert!(element.require_bool("ignore").unwrap());

        element.add_string("ignore", "maybe");
        assert!(matches!(
            element.require_bool("ignore"),
            Err(XmlError::InvalidValue { .. })
        ));
        assert!(matches!(
            element.require_bool("other"),
            Err(XmlError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_add_element_builds_nested() {
        let mut root = XElement::new("root");
        root.add_element("a").add_element("b").set_value("deep");
        root.add_element("a");

        assert_eq!(root.elements("a").count(), 2);
        let b = root.element("a").and_then(|a| a.element("b")).unwrap();
        assert_eq!(b.value(), "deep");
    }
}
