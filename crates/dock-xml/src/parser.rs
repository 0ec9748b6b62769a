//! XML parser.
//!
//! Tokens (names, attributes, text runs) are recognized with `nom`
//! combinators; element nesting is driven by a small recursive parser that
//! tracks offsets for error messages.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    sequence::{delimited, tuple},
    IResult,
};

use crate::element::XElement;
use crate::error::{Result, XmlError};

/// Deepest element nesting the parser accepts, counted below the root.
///
/// Covers 512 nested layout entries at two element levels each, plus room
/// for factory payloads.
pub const MAX_DEPTH: usize = 1280;

/// Parse a complete document and return its root element.
///
/// The XML declaration, comments and processing instructions around the root
/// are skipped. Text of elements that also have child elements is trimmed;
/// text of leaf elements is kept verbatim.
pub fn parse(input: &str) -> Result<XElement> {
    let parser = Parser { source: input };
    let rest = parser.skip_misc(input)?;
    let (rest, root) = parser.element(rest, 0)?;
    let rest = parser.skip_misc(rest)?;
    if !rest.is_empty() {
        return Err(parser.fail(rest, "unexpected content after the root element"));
    }
    Ok(root)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn name(input: &str) -> IResult<&str, &str> {
    take_while1(is_name_char)(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))(input)
}

/// ` key = "value"`, including the leading whitespace.
fn attribute(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, (_, key, _, _, _, value)) =
        tuple((multispace1, name, multispace0, char('='), multispace0, quoted))(input)?;
    Ok((input, (key, value)))
}

fn text(input: &str) -> IResult<&str, &str> {
    take_while1(|c| c != '<')(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    delimited(tag("<!--"), take_until("-->"), tag("-->"))(input)
}

fn processing_instruction(input: &str) -> IResult<&str, &str> {
    delimited(tag("<?"), take_until("?>"), tag("?>"))(input)
}

fn cdata(input: &str) -> IResult<&str, &str> {
    delimited(tag("<![CDATA["), take_until("]]>"), tag("]]>"))(input)
}

struct Parser<'a> {
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn offset(&self, rest: &str) -> usize {
        self.source.len() - rest.len()
    }

    fn fail(&self, rest: &str, message: impl Into<String>) -> XmlError {
        XmlError::parse_at(message, self.offset(rest))
    }

    /// Skip whitespace, comments, processing instructions and doctype lines.
    fn skip_misc(&self, mut input: &'a str) -> Result<&'a str> {
        loop {
            input = input.trim_start();
            if input.starts_with("<?") {
                let (rest, _) = processing_instruction(input)
                    .map_err(|_| self.fail(input, "unterminated processing instruction"))?;
                input = rest;
            } else if input.starts_with("<!--") {
                let (rest, _) =
                    comment(input).map_err(|_| self.fail(input, "unterminated comment"))?;
                input = rest;
            } else if input.starts_with("<!") {
                let end = input
                    .find('>')
                    .ok_or_else(|| self.fail(input, "unterminated declaration"))?;
                input = &input[end + 1..];
            } else {
                return Ok(input);
            }
        }
    }

    fn element(&self, input: &'a str, depth: usize) -> Result<(&'a str, XElement)> {
        if depth > MAX_DEPTH {
            return Err(self.fail(input, "elements nested too deeply"));
        }

        let after_open = input
            .strip_prefix('<')
            .ok_or_else(|| self.fail(input, "expected '<'"))?;
        let (mut rest, tag_name) =
            name(after_open).map_err(|_| self.fail(after_open, "expected element name"))?;
        let mut element = XElement::new(tag_name);

        while let Ok((next, (key, value))) = attribute(rest) {
            let value = unescape(value).map_err(|message| self.fail(rest, message))?;
            element.add_string(key, value);
            rest = next;
        }
        rest = rest.trim_start();

        if let Some(next) = rest.strip_prefix("/>") {
            return Ok((next, element));
        }
        rest = rest
            .strip_prefix('>')
            .ok_or_else(|| self.fail(rest, format!("expected '>' to close <{}>", tag_name)))?;

        let mut value = String::new();
        loop {
            if let Some(after) = rest.strip_prefix("</") {
                let (after, close) =
                    name(after).map_err(|_| self.fail(after, "expected closing tag name"))?;
                if close != tag_name {
                    return Err(self.fail(
                        after,
                        format!("closing tag </{}> does not match <{}>", close, tag_name),
                    ));
                }
                let after = after.trim_start();
                let after = after
                    .strip_prefix('>')
                    .ok_or_else(|| self.fail(after, "expected '>'"))?;

                if element.children().is_empty() {
                    element.set_value(value);
                } else {
                    element.set_value(value.trim());
                }
                return Ok((after, element));
            } else if rest.starts_with("<!--") {
                let (next, _) = comment(rest).map_err(|_| self.fail(rest, "unterminated comment"))?;
                rest = next;
            } else if rest.starts_with("<![CDATA[") {
                let (next, raw) = cdata(rest).map_err(|_| self.fail(rest, "unterminated CDATA"))?;
                value.push_str(raw);
                rest = next;
            } else if rest.starts_with("<?") {
                let (next, _) = processing_instruction(rest)
                    .map_err(|_| self.fail(rest, "unterminated processing instruction"))?;
                rest = next;
            } else if rest.starts_with('<') {
                let (next, child) = self.element(rest, depth + 1)?;
                element.push(child);
                rest = next;
            } else if rest.is_empty() {
                return Err(self.fail(rest, format!("unexpected end of input inside <{}>", tag_name)));
            } else {
                let (next, chunk) = text(rest).map_err(|_| self.fail(rest, "expected text"))?;
                value.push_str(&unescape(chunk).map_err(|message| self.fail(rest, message))?);
                rest = next;
            }
        }
    }
}

/// Decode the predefined entities and numeric character references.
fn unescape(raw: &str) -> std::result::Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find(';')
            .ok_or_else(|| format!("unterminated entity in '{}'", raw))?;
        let entity = &after[..end];
        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| format!("unknown entity '&{};'", entity))?
            }
        };
        out.push(decoded);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
