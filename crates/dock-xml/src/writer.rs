//! XML writer.

use std::fmt::{self, Write as FmtWrite};

use crate::element::XElement;

const INDENT: &str = "  ";

impl XElement {
    /// Serialize this element and its subtree.
    ///
    /// With `pretty` every element starts on its own indented line. Leaf
    /// values are always written inline so they survive a parse unchanged.
    pub fn to_xml(&self, pretty: bool) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = write_element(&mut out, self, 0, pretty);
        out
    }

    /// Serialize with a leading XML declaration.
    pub fn to_document(&self, pretty: bool) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        if pretty {
            out.push('\n');
        }
        out.push_str(&self.to_xml(pretty));
        out
    }
}

impl fmt::Display for XElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_element(f, self, 0, f.alternate())
    }
}

fn write_element<W: FmtWrite>(out: &mut W, element: &XElement, depth: usize, pretty: bool) -> fmt::Result {
    if pretty {
        for _ in 0..depth {
            out.write_str(INDENT)?;
        }
    }

    write!(out, "<{}", element.name())?;
    for (key, value) in element.attributes() {
        write!(out, " {}=\"", key)?;
        escape(out, value)?;
        out.write_char('"')?;
    }

    if element.children().is_empty() && element.value().is_empty() {
        out.write_str("/>")?;
    } else {
        out.write_char('>')?;
        escape(out, element.value())?;
        if !element.children().is_empty() {
            if pretty {
                out.write_char('\n')?;
            }
            for child in element.children() {
                write_element(out, child, depth + 1, pretty)?;
            }
            if pretty {
                for _ in 0..depth {
                    out.write_str(INDENT)?;
                }
            }
        }
        write!(out, "</{}>", element.name())?;
    }

    if pretty {
        out.write_char('\n')?;
    }
    Ok(())
}

fn escape<W: FmtWrite>(out: &mut W, text: &str) -> fmt::Result {
    for c in text.chars() {
        match c {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' => out.write_str("&quot;")?,
            '\'' => out.write_str("&apos;")?,
            _ => out.write_char(c)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use proptest::prelude::*;

    fn sample() -> XElement {
        let mut root = XElement::new("layout");
        root.add_string("factory", "grid");
        let cell = root.add_element("cell");
        cell.add_int("x", 0).add_int("y", 1);
        root.add_element("name").set_value("A & B");
        root
    }

    #[test]
    fn test_compact_output() {
        assert_eq!(
            sample().to_xml(false),
            "<layout factory=\"grid\"><cell x=\"0\" y=\"1\"/><name>A &amp; B</name></layout>"
        );
    }

    #[test]
    fn test_pretty_output() {
        let expected = "<layout factory=\"grid\">\n  <cell x=\"0\" y=\"1\"/>\n  <name>A &amp; B</name>\n</layout>\n";
        assert_eq!(sample().to_xml(true), expected);
    }

    #[test]
    fn test_pretty_reparses_equal() {
        let root = sample();
        assert_eq!(parse(&root.to_document(true)).unwrap(), root);
    }

    proptest! {
        #[test]
        fn escaped_text_survives(attr in "\\PC*", value in "\\PC+") {
            let mut root = XElement::new("a");
            root.add_string("v", attr.clone());
            root.add_element("b").set_value(value.clone());

            let back = parse(&root.to_xml(false)).unwrap();
            prop_assert_eq!(back.attribute("v"), Some(attr.as_str()));
            prop_assert_eq!(back.element("b").unwrap().value(), value.as_str());
        }
    }
}
