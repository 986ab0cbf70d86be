// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Minimal owned XML element tree
//!
//! XMLA responses are small enough to materialize. Elements and attributes
//! are stored by local name; namespace prefixes are dropped because SOAP
//! providers disagree on which prefixes they emit.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{XmlaError, XmlaResult};

/// An XML element with its attributes, children and text content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    /// Create an element with the given local name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder method: add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder method: add a child element
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Builder method: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Parse a complete document and return its root element
    pub fn parse(bytes: &[u8]) -> XmlaResult<XmlElement> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => {
                    stack.push(Self::from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let mut element = stack.pop().ok_or_else(|| {
                        XmlaError::MalformedResponse("unbalanced end tag".to_string())
                    })?;
                    if !element.children.is_empty() && element.text.trim().is_empty() {
                        element.text.clear();
                    }
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        let raw = data.into_inner();
                        current.text.push_str(&String::from_utf8_lossy(&raw));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(XmlaError::MalformedResponse(format!(
                "unexpected end of document inside <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }
        root.ok_or_else(|| XmlaError::MalformedResponse("document has no root element".to_string()))
    }

    fn from_start(start: &BytesStart<'_>) -> XmlaResult<XmlElement> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlaError::MalformedResponse(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(XmlElement {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn attach(
        stack: &mut [XmlElement],
        root: &mut Option<XmlElement>,
        element: XmlElement,
    ) -> XmlaResult<()> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if root.is_none() => *root = Some(element),
            None => {
                return Err(XmlaError::MalformedResponse(
                    "document has more than one root element".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// Local name of this element
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text content of this element
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Value of the attribute with the given local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All child elements, in document order
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// First child element with the given local name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the first child element with the given local name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(XmlElement::text)
    }

    /// Child elements with the given local name, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a path of child names from this element
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter()
            .try_fold(self, |element, name| element.child(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_prefixes() {
        let xml = br#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="urn:x"><SOAP-ENV:Body><a x:k="v">text</a></SOAP-ENV:Body></SOAP-ENV:Envelope>"#;
        let root = XmlElement::parse(xml).unwrap();
        assert_eq!(root.name(), "Envelope");
        let a = root.find(&["Body", "a"]).unwrap();
        assert_eq!(a.text(), "text");
        assert_eq!(a.attribute("k"), Some("v"));
    }

    #[test]
    fn test_parse_unescapes_text() {
        let root = XmlElement::parse(b"<r><v>a &amp; b &lt;c&gt;</v></r>").unwrap();
        assert_eq!(root.child_text("v"), Some("a & b <c>"));
    }

    #[test]
    fn test_parse_drops_whitespace_between_children() {
        let root = XmlElement::parse(b"<r>\n  <a/>\n  <b> x </b>\n</r>").unwrap();
        assert_eq!(root.text(), "");
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.child_text("b"), Some(" x "));
    }

    #[test]
    fn test_parse_rejects_truncated_document() {
        let err = XmlElement::parse(b"<r><a>").unwrap_err();
        assert!(matches!(err, XmlaError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_rejects_empty_document() {
        assert!(XmlElement::parse(b"").is_err());
    }

    #[test]
    fn test_children_named() {
        let root = XmlElement::parse(b"<r><row/><x/><row/></r>").unwrap();
        assert_eq!(root.children_named("row").count(), 2);
    }
}
