//! Namespace-aware XML document model.
//!
//! Signature verification needs operations an event stream cannot offer
//! directly: locating an element by namespace and local name, removing the
//! `ds:Signature` subtree, and canonicalizing what remains with the
//! namespace context its ancestors declared. This module builds a small
//! tree on top of quick-xml's pull parser to support exactly that. Each
//! element captures its full in-scope namespace map at parse time, so a
//! subtree can later be canonicalized in isolation.
//!
//! quick-xml never resolves external entities, so parsing untrusted IdP
//! responses here is not subject to XXE.

pub mod c14n;

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// In-scope namespace bindings: prefix (None for the default namespace)
/// mapped to namespace URI.
pub type NsMap = BTreeMap<Option<String>, String>;

/// Error raised while parsing an XML document.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct XmlError(pub(crate) String);

/// A node in the document tree.
#[derive(Debug, Clone)]
pub enum XmlNode {
    /// An element with attributes and children.
    Element(XmlElement),
    /// Character data, already entity-decoded. Whitespace-only text is
    /// preserved: it is part of the signed byte stream.
    Text(String),
}

/// An attribute with an optional namespace prefix.
#[derive(Debug, Clone)]
pub struct XmlAttribute {
    /// Namespace prefix, if the attribute name was prefixed.
    pub prefix: Option<String>,
    /// Local attribute name.
    pub local: String,
    /// Entity-decoded attribute value.
    pub value: String,
}

/// An element with its attributes, namespace context, and children.
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// Namespace prefix of the element name, if any.
    pub prefix: Option<String>,
    /// Local element name.
    pub local: String,
    /// Regular attributes, in document order. Namespace declarations are
    /// kept separately in `ns_decls`.
    pub attributes: Vec<XmlAttribute>,
    /// Namespace declarations made on this element, in document order.
    pub ns_decls: Vec<(Option<String>, String)>,
    /// Every namespace binding in scope at this element, including those
    /// inherited from ancestors.
    pub scope: NsMap,
    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Resolves this element's namespace URI, or "" when unbound.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.scope.get(&self.prefix).map_or("", String::as_str)
    }

    /// Returns true if this element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.local == local && self.namespace() == ns
    }

    /// First child element matching namespace and local name.
    #[must_use]
    pub fn child(&self, ns: &str, local: &str) -> Option<&XmlElement> {
        self.child_elements().find(|el| el.is(ns, local))
    }

    /// All child elements matching namespace and local name, in order.
    pub fn children_named<'a>(
        &'a self,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> {
        self.child_elements().filter(move |el| el.is(ns, local))
    }

    /// All child elements in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// Walks a path of (namespace, local name) steps from this element.
    #[must_use]
    pub fn descendant(&self, path: &[(&str, &str)]) -> Option<&XmlElement> {
        let mut current = self;
        for (ns, local) in path {
            current = current.child(ns, local)?;
        }
        Some(current)
    }

    /// Unprefixed attribute value by local name.
    #[must_use]
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.prefix.is_none() && a.local == local)
            .map(|a| a.value.as_str())
    }

    /// Concatenated text content of this element and its descendants.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Removes the first child element matching namespace and local name.
    /// Returns true if a child was removed.
    pub fn remove_child(&mut self, ns: &str, local: &str) -> bool {
        let position = self.children.iter().position(|node| match node {
            XmlNode::Element(el) => el.is(ns, local),
            XmlNode::Text(_) => false,
        });
        match position {
            Some(index) => {
                self.children.remove(index);
                true
            }
            None => false,
        }
    }
}

fn collect_text(el: &XmlElement, out: &mut String) {
    for node in &el.children {
        match node {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(child) => collect_text(child, out),
        }
    }
}

/// Parses an XML document and returns its root element.
pub fn parse(xml: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError(format!("XML parse error: {e}")))?;
        match event {
            Event::Start(start) => {
                let parent_scope = stack.last().map(|el| el.scope.clone()).unwrap_or_default();
                let element = open_element(start.name().as_ref(), start.attributes(), parent_scope)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let parent_scope = stack.last().map(|el| el.scope.clone()).unwrap_or_default();
                let element = open_element(start.name().as_ref(), start.attributes(), parent_scope)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let decoded = text
                    .unescape()
                    .map_err(|e| XmlError(format!("bad character data: {e}")))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(decoded.into_owned()));
                }
            }
            Event::CData(cdata) => {
                let raw = String::from_utf8(cdata.into_inner().into_owned())
                    .map_err(|e| XmlError(format!("CDATA is not UTF-8: {e}")))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(raw));
                }
            }
            // Comments are excluded by the canonicalization in use, so they
            // are dropped at parse time.
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(XmlError("unclosed element at end of document".into()));
    }
    root.ok_or_else(|| XmlError("document has no root element".into()))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError("multiple root elements".into())),
    }
}

fn open_element(
    qname: &[u8],
    attributes: quick_xml::events::attributes::Attributes<'_>,
    parent_scope: NsMap,
) -> Result<XmlElement, XmlError> {
    let (prefix, local) = split_qname(qname)?;
    let mut element = XmlElement {
        prefix,
        local,
        attributes: Vec::new(),
        ns_decls: Vec::new(),
        scope: parent_scope,
        children: Vec::new(),
    };

    for attribute in attributes {
        let attribute = attribute.map_err(|e| XmlError(format!("bad attribute: {e}")))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| XmlError(format!("attribute name is not UTF-8: {e}")))?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlError(format!("bad attribute value: {e}")))?
            .into_owned();

        if key == "xmlns" {
            element.ns_decls.push((None, value));
        } else if let Some(declared_prefix) = key.strip_prefix("xmlns:") {
            element.ns_decls.push((Some(declared_prefix.to_string()), value));
        } else {
            let (prefix, local) = split_qname(key.as_bytes())?;
            element.attributes.push(XmlAttribute { prefix, local, value });
        }
    }

    for (prefix, uri) in &element.ns_decls {
        element.scope.insert(prefix.clone(), uri.clone());
    }
    Ok(element)
}

fn split_qname(qname: &[u8]) -> Result<(Option<String>, String), XmlError> {
    let name = std::str::from_utf8(qname)
        .map_err(|e| XmlError(format!("name is not UTF-8: {e}")))?;
    match name.split_once(':') {
        Some((prefix, local)) => Ok((Some(prefix.to_string()), local.to_string())),
        None => Ok((None, name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" "#,
        r#"xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_r1">"#,
        r#"<saml:Issuer>https://idp.example.org</saml:Issuer>"#,
        r#"<saml:Assertion ID="_a1"><saml:Subject>"#,
        r#"<saml:NameID>user@example.org</saml:NameID>"#,
        r#"</saml:Subject></saml:Assertion>"#,
        r#"</samlp:Response>"#
    );

    const SAMLP: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
    const SAML: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

    #[test]
    fn parse_resolves_namespaces() {
        let root = parse(SAMPLE).unwrap();
        assert!(root.is(SAMLP, "Response"));
        assert_eq!(root.attr("ID"), Some("_r1"));

        let assertion = root.child(SAML, "Assertion").unwrap();
        // The assertion inherits the saml binding declared on the root.
        assert_eq!(assertion.namespace(), SAML);
        let name_id = assertion
            .descendant(&[(SAML, "Subject"), (SAML, "NameID")])
            .unwrap();
        assert_eq!(name_id.text(), "user@example.org");
    }

    #[test]
    fn parse_preserves_whitespace_text() {
        let root = parse("<a> x <b/> y </a>").unwrap();
        assert_eq!(root.text(), " x  y ");
    }

    #[test]
    fn parse_decodes_entities() {
        let root = parse(r#"<a v="a&amp;b">x &lt; y</a>"#).unwrap();
        assert_eq!(root.attr("v"), Some("a&b"));
        assert_eq!(root.text(), "x < y");
    }

    #[test]
    fn remove_child_by_name() {
        let mut root = parse(SAMPLE).unwrap();
        assert!(root.remove_child(SAML, "Assertion"));
        assert!(root.child(SAML, "Assertion").is_none());
        assert!(!root.remove_child(SAML, "Assertion"));
    }

    #[test]
    fn default_namespace_applies_to_unprefixed_elements() {
        let root = parse(r#"<a xmlns="urn:x"><b/></a>"#).unwrap();
        assert!(root.is("urn:x", "a"));
        assert!(root.child("urn:x", "b").is_some());
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("no xml here").is_err());
    }
}
