//! Minimal element tree built from quick-xml events

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::infrastructure::xml::error::{CodecError, CodecResult};

#[derive(Debug, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the named child, empty if the child is missing.
    pub fn child_text(&self, name: &str) -> &str {
        self.child(name).map(|c| c.text.as_str()).unwrap_or_default()
    }
}

fn parse_error(reader: &Reader<&[u8]>, message: impl ToString) -> CodecError {
    CodecError::Parse {
        position: reader.buffer_position() as u64,
        message: message.to_string(),
    }
}

fn open(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> CodecResult<Element> {
    let mut element = Element {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        ..Element::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(reader, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| parse_error(reader, e))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Parses `text` into its document element.
pub(crate) fn parse(text: &str) -> CodecResult<Element> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut document: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| parse_error(&reader, e))?;
        match event {
            Event::Start(start) => {
                let element = open(&reader, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open(&reader, &start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if document.is_none() => document = Some(element),
                    None => return Err(parse_error(&reader, "more than one document element")),
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(parse_error(&reader, "unexpected closing tag"));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if document.is_none() => document = Some(element),
                    None => return Err(parse_error(&reader, "more than one document element")),
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| parse_error(&reader, e))?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None => return Err(parse_error(&reader, "text outside document element")),
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            // declaration, comments, processing instructions, doctype
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(parse_error(&reader, "unexpected end of document"));
    }
    document.ok_or_else(|| parse_error(&reader, "empty document"))
}
