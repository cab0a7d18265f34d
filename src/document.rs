//! Minimal element tree over `quick-xml` events.
//!
//! Context documents are small, so they are parsed eagerly into [`Element`]s
//! and queried by child name, the way the loader walks `<bean>`, `<value>`
//! and `<include>` declarations.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("malformed xml: {0}")]
    Syntax(String),

    #[error("unclosed element <{0}>")]
    Unclosed(String),

    #[error("document has no root element")]
    Empty,

    #[error("unexpected content after root element")]
    TrailingContent,
}

/// An XML element with its attributes, child elements and text content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    /// Parses a document and returns its root element.
    pub fn parse(source: &str) -> Result<Element, DocumentError> {
        let mut reader = Reader::from_str(source);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DocumentError::Syntax(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(DocumentError::TrailingContent);
                    }
                    stack.push(Element::from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = Element::from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DocumentError::Syntax("unexpected closing tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| DocumentError::Syntax(e.to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.text.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => return Err(DocumentError::TrailingContent),
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(DocumentError::Unclosed(open.name));
        }
        root.ok_or(DocumentError::Empty)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Element, DocumentError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| DocumentError::Syntax(e.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| DocumentError::Syntax(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            attributes,
            ..Element::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attribute value, if the attribute is present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the attribute value, or `""` when it is absent.
    pub fn attr(&self, name: &str) -> &str {
        self.attribute(name).unwrap_or("")
    }

    /// Concatenated text content of this element (not of its children).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Child elements named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(DocumentError::TrailingContent),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let root = Element::parse(
            r#"<?xml version="1.0"?>
            <beans>
                <variable name="host" value="localhost"/>
                <bean name="list" impl="array">
                    <value key="a"> one </value>
                    <value>two &amp; three</value>
                </bean>
            </beans>"#,
        )
        .unwrap();

        assert_eq!(root.name(), "beans");
        assert_eq!(root.children().len(), 2);
        let bean = root.child("bean").unwrap();
        assert_eq!(bean.attr("impl"), "array");
        let values: Vec<&str> = bean.children_named("value").map(|v| v.text()).collect();
        assert_eq!(values, vec![" one ", "two & three"]);
    }

    #[test]
    fn test_missing_attribute_is_empty() {
        let root = Element::parse(r#"<beans><bean name="x"/></beans>"#).unwrap();
        let bean = root.child("bean").unwrap();

        assert_eq!(bean.attribute("type"), None);
        assert_eq!(bean.attr("type"), "");
    }

    #[test]
    fn test_mismatched_tags_are_rejected() {
        let result = Element::parse("<beans><bean></beans>");
        assert!(matches!(result, Err(DocumentError::Syntax(_))));
    }

    #[test]
    fn test_unclosed_root_is_rejected() {
        let result = Element::parse("<beans><bean/>");
        assert!(matches!(
            result,
            Err(DocumentError::Unclosed(_)) | Err(DocumentError::Syntax(_))
        ));
    }

    #[test]
    fn test_empty_document_is_rejected() {
        assert!(matches!(Element::parse("   "), Err(DocumentError::Empty)));
    }
}
