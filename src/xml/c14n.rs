//! Exclusive XML canonicalization (without comments).
//!
//! Implements the subset of Exclusive C14N (`http://www.w3.org/2001/10/xml-exc-c14n#`)
//! that signed SAML documents exercise: namespace declarations are emitted
//! on the element where they become visibly utilized, attributes are sorted
//! into canonical order, empty-element tags are expanded, and text is
//! re-escaped with the canonical entity set. Because every element carries
//! its full in-scope namespace map, a subtree extracted from a larger
//! document canonicalizes with the bindings its ancestors declared -- which
//! is exactly what verifying an enveloped signature over an `Assertion` or
//! a `SignedInfo` requires.
//!
//! Comments never appear in the output; the parser already drops them.

use std::collections::BTreeSet;

use super::{NsMap, XmlAttribute, XmlElement, XmlNode};

/// Canonicalizes an element subtree into its exclusive C14N byte form.
#[must_use]
pub fn canonicalize(element: &XmlElement) -> String {
    let mut out = String::new();
    write_element(element, &NsMap::new(), &mut out);
    out
}

fn write_element(element: &XmlElement, rendered: &NsMap, out: &mut String) {
    out.push('<');
    push_qname(element.prefix.as_deref(), &element.local, out);

    // Visibly utilized prefixes: the element's own prefix plus every
    // attribute prefix. Unprefixed attributes are in no namespace and do
    // not utilize the default namespace.
    let mut visible: BTreeSet<Option<&str>> = BTreeSet::new();
    visible.insert(element.prefix.as_deref());
    for attribute in &element.attributes {
        if let Some(prefix) = attribute.prefix.as_deref() {
            visible.insert(Some(prefix));
        }
    }

    // BTreeSet iterates None (the default namespace) first, then prefixes
    // alphabetically, which is already canonical namespace-node order.
    let mut emitted: Vec<(Option<String>, String)> = Vec::new();
    for prefix in visible {
        let key = prefix.map(str::to_string);
        let uri = element.scope.get(&key).cloned().unwrap_or_default();
        let already = rendered.get(&key).map_or("", String::as_str);
        if uri == already {
            continue;
        }
        match &key {
            None => {
                out.push_str(" xmlns=\"");
                push_escaped_attr(&uri, out);
                out.push('"');
            }
            Some(prefix) => {
                // A prefixed name with no binding is malformed input; there
                // is nothing meaningful to emit for it.
                if uri.is_empty() {
                    continue;
                }
                out.push_str(" xmlns:");
                out.push_str(prefix);
                out.push_str("=\"");
                push_escaped_attr(&uri, out);
                out.push('"');
            }
        }
        emitted.push((key, uri));
    }

    // Attributes sort by (namespace URI, local name); attributes in no
    // namespace order first because their URI is empty.
    let mut attributes: Vec<&XmlAttribute> = element.attributes.iter().collect();
    attributes.sort_by(|a, b| {
        let a_key = (attribute_namespace(element, a), a.local.as_str());
        let b_key = (attribute_namespace(element, b), b.local.as_str());
        a_key.cmp(&b_key)
    });
    for attribute in attributes {
        out.push(' ');
        push_qname(attribute.prefix.as_deref(), &attribute.local, out);
        out.push_str("=\"");
        push_escaped_attr(&attribute.value, out);
        out.push('"');
    }
    out.push('>');

    let child_rendered = if emitted.is_empty() {
        rendered.clone()
    } else {
        let mut next = rendered.clone();
        next.extend(emitted);
        next
    };
    for child in &element.children {
        match child {
            XmlNode::Text(text) => push_escaped_text(text, out),
            XmlNode::Element(child) => write_element(child, &child_rendered, out),
        }
    }

    out.push_str("</");
    push_qname(element.prefix.as_deref(), &element.local, out);
    out.push('>');
}

fn attribute_namespace<'a>(element: &'a XmlElement, attribute: &XmlAttribute) -> &'a str {
    match &attribute.prefix {
        Some(prefix) => element
            .scope
            .get(&Some(prefix.clone()))
            .map_or("", String::as_str),
        None => "",
    }
}

fn push_qname(prefix: Option<&str>, local: &str, out: &mut String) {
    if let Some(prefix) = prefix {
        out.push_str(prefix);
        out.push(':');
    }
    out.push_str(local);
}

fn push_escaped_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
}

fn push_escaped_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    #[test]
    fn expands_empty_elements_and_drops_superfluous_whitespace_in_tags() {
        let root = parse("<a><b/></a>").unwrap();
        assert_eq!(canonicalize(&root), "<a><b></b></a>");
    }

    #[test]
    fn sorts_attributes_canonically() {
        let root = parse(r#"<a zeta="1" alpha="2" mid="3"/>"#).unwrap();
        assert_eq!(
            canonicalize(&root),
            r#"<a alpha="2" mid="3" zeta="1"></a>"#
        );
    }

    #[test]
    fn unprefixed_attributes_sort_before_prefixed() {
        let root = parse(r#"<a xmlns:x="urn:x" x:a="1" b="2"/>"#).unwrap();
        assert_eq!(
            canonicalize(&root),
            r#"<a xmlns:x="urn:x" b="2" x:a="1"></a>"#
        );
    }

    #[test]
    fn inherited_namespace_is_rendered_on_extracted_subtree() {
        let doc = parse(
            r##"<ds:Signature xmlns:ds="urn:ds"><ds:SignedInfo><ds:Reference URI="#x"></ds:Reference></ds:SignedInfo></ds:Signature>"##,
        )
        .unwrap();
        let signed_info = doc.child("urn:ds", "SignedInfo").unwrap();
        assert_eq!(
            canonicalize(signed_info),
            r##"<ds:SignedInfo xmlns:ds="urn:ds"><ds:Reference URI="#x"></ds:Reference></ds:SignedInfo>"##
        );
    }

    #[test]
    fn namespace_not_rerendered_when_ancestor_already_emitted_it() {
        let doc = parse(r#"<s:a xmlns:s="urn:s"><s:b><s:c/></s:b></s:a>"#).unwrap();
        assert_eq!(
            canonicalize(&doc),
            r#"<s:a xmlns:s="urn:s"><s:b><s:c></s:c></s:b></s:a>"#
        );
    }

    #[test]
    fn unused_namespace_declarations_are_omitted() {
        // Exclusive C14N drops declarations that are not visibly utilized.
        let doc = parse(r#"<a xmlns:unused="urn:u"><b/></a>"#).unwrap();
        assert_eq!(canonicalize(&doc), "<a><b></b></a>");
    }

    #[test]
    fn default_namespace_is_rendered_when_utilized() {
        let doc = parse(r#"<a xmlns="urn:d"><b/></a>"#).unwrap();
        assert_eq!(
            canonicalize(&doc),
            r#"<a xmlns="urn:d"><b></b></a>"#
        );
    }

    #[test]
    fn escapes_text_and_attributes() {
        let doc = parse("<a v=\"x&amp;y&quot;z\">1 &lt; 2 &amp; 3 > 4</a>").unwrap();
        assert_eq!(
            canonicalize(&doc),
            "<a v=\"x&amp;y&quot;z\">1 &lt; 2 &amp; 3 &gt; 4</a>"
        );
    }

    #[test]
    fn whitespace_between_elements_is_preserved() {
        let doc = parse("<a>\n  <b/>\n</a>").unwrap();
        assert_eq!(canonicalize(&doc), "<a>\n  <b></b>\n</a>");
    }

    #[test]
    fn canonicalization_is_stable() {
        let xml = r#"<s:a xmlns:s="urn:s" q="2" p="1"><s:b>t</s:b></s:a>"#;
        let first = canonicalize(&parse(xml).unwrap());
        let second = canonicalize(&parse(&first).unwrap());
        assert_eq!(first, second);
    }
}
