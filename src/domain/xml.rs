//! Minimal lossless XML element tree.
//!
//! Page documents are read into this tree, edited through
//! [`crate::domain::PageDocument`], and written back. Elements, attributes
//! (in their original order), text, comments and CDATA are preserved; the
//! XML declaration is always rewritten as UTF-8 and whitespace-only text
//! between elements is replaced by the writer's own indentation.

use crate::core::errors::{DewarpError, DewarpResult};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// A child of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
    CData(String),
}

/// An element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Qualified name as written in the source (e.g. `pc:Page`).
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Name without namespace prefix.
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    /// Namespace prefix of this element, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn find_child(&self, local_name: &str) -> Option<&XmlElement> {
        self.child_elements()
            .find(|el| el.local_name() == local_name)
    }

    pub fn find_child_mut(&mut self, local_name: &str) -> Option<&mut XmlElement> {
        self.child_elements_mut()
            .find(|el| el.local_name() == local_name)
    }

    /// All child elements with the given local name, in document order.
    pub fn children_named<'a>(
        &'a self,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.child_elements()
            .filter(move |el| el.local_name() == local_name)
    }

    /// Concatenated text content of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) | XmlNode::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Qualified name for a new child, reusing this element's prefix.
    pub fn sibling_name(&self, local_name: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix}:{local_name}"),
            None => local_name.to_string(),
        }
    }
}

/// A parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    /// Parses a UTF-8 XML document.
    pub fn parse(bytes: &[u8]) -> DewarpResult<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => stack.push(element_from_start(&e)?),
                Event::Empty(e) => {
                    let element = element_from_start(&e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| DewarpError::xml("unbalanced end tag"))?;
                    drop_layout_whitespace(&mut element);
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(e) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(e.unescape()?.into_owned()));
                    }
                }
                Event::CData(e) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&e).into_owned();
                        parent.children.push(XmlNode::CData(text));
                    }
                }
                Event::Comment(e) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&e).into_owned();
                        parent.children.push(XmlNode::Comment(text));
                    }
                }
                Event::Eof => break,
                // Declaration, processing instructions and doctype are regenerated or dropped.
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(DewarpError::xml(format!(
                "unexpected end of document inside <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }

        root.map(Self::new)
            .ok_or_else(|| DewarpError::xml("document has no root element"))
    }

    /// Serializes the document with two-space indentation.
    pub fn to_bytes(&self) -> DewarpResult<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, &self.root)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }
}

fn local(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn element_from_start(start: &BytesStart<'_>) -> DewarpResult<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Removes indentation between child nodes.
///
/// Whitespace-only text is content when it is all the element holds
/// (`<Unicode> </Unicode>`), and layout as soon as the element has other
/// children.
fn drop_layout_whitespace(element: &mut XmlElement) {
    let has_markup = element
        .children
        .iter()
        .any(|child| !matches!(child, XmlNode::Text(_)));
    if has_markup {
        element
            .children
            .retain(|child| !matches!(child, XmlNode::Text(text) if text.trim().is_empty()));
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> DewarpResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(DewarpError::xml("document has more than one root element")),
    }
    Ok(())
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &XmlElement,
) -> Result<(), quick_xml::Error> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(el) => write_element(writer, el)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            XmlNode::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
            }
            XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<pc:PcGts xmlns:pc="http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15" pcGtsId="p1">
  <!-- produced upstream -->
  <pc:Page imageFilename="OCR-D-IMG/p1.png" imageWidth="100" imageHeight="50">
    <pc:TextRegion id="r1">
      <pc:Coords points="0,0 10,0 10,10 0,10"/>
      <pc:TextEquiv><pc:Unicode>a &amp; b</pc:Unicode></pc:TextEquiv>
    </pc:TextRegion>
  </pc:Page>
</pc:PcGts>
"#;

    #[test]
    fn test_parse_structure() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.root.local_name(), "PcGts");
        assert_eq!(doc.root.prefix(), Some("pc"));
        assert_eq!(doc.root.attribute("pcGtsId"), Some("p1"));

        let page = doc.root.find_child("Page").unwrap();
        assert_eq!(page.attribute("imageWidth"), Some("100"));
        let region = page.find_child("TextRegion").unwrap();
        let unicode = region
            .find_child("TextEquiv")
            .and_then(|t| t.find_child("Unicode"))
            .unwrap();
        assert_eq!(unicode.text(), "a & b");
        assert!(
            doc.root
                .children
                .iter()
                .any(|n| matches!(n, XmlNode::Comment(c) if c.contains("upstream")))
        );
    }

    #[test]
    fn test_write_then_parse_preserves_tree() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let bytes = doc.to_bytes().unwrap();
        let reparsed = XmlDocument::parse(&bytes).unwrap();
        assert_eq!(doc, reparsed);
        // Serialization is stable.
        assert_eq!(bytes, reparsed.to_bytes().unwrap());
    }

    #[test]
    fn test_whitespace_only_text_is_content() {
        let xml = "<pc:TextEquiv xmlns:pc=\"urn:x\">\n  <pc:Unicode> </pc:Unicode>\n  <pc:Plain>\t</pc:Plain>\n</pc:TextEquiv>";
        let doc = XmlDocument::parse(xml.as_bytes()).unwrap();
        assert_eq!(doc.root.child_elements().count(), 2);
        assert!(
            doc.root
                .children
                .iter()
                .all(|n| matches!(n, XmlNode::Element(_)))
        );
        assert_eq!(doc.root.find_child("Unicode").unwrap().text(), " ");
        assert_eq!(doc.root.find_child("Plain").unwrap().text(), "\t");

        let bytes = doc.to_bytes().unwrap();
        let written = String::from_utf8(bytes.clone()).unwrap();
        assert!(written.contains("<pc:Unicode> </pc:Unicode>"));
        assert_eq!(XmlDocument::parse(&bytes).unwrap(), doc);
    }

    #[test]
    fn test_set_attribute_keeps_order() {
        let mut el = XmlElement::new("Label")
            .with_attribute("type", "a")
            .with_attribute("value", "1");
        el.set_attribute("type", "b");
        assert_eq!(
            el.attributes,
            vec![
                ("type".to_string(), "b".to_string()),
                ("value".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(XmlDocument::parse(b"<a><b></a>").is_err());
        assert!(XmlDocument::parse(b"").is_err());
        assert!(XmlDocument::parse(b"<a/><b/>").is_err());
    }
}
