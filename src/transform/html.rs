//! HTML/XHTML manipulation for the repair pass, built on html5ever.
//!
//! The parser is deliberately tolerant: machine-translated books carry
//! everything from strict XHTML 1.1 to tag soup, and a parse must never
//! lose content. Serialization round-trips what the parser keeps.

use std::cell::RefCell;
use std::default::Default;
use std::rc::Rc;

use html5ever::parse_document;
use html5ever::serialize::{SerializeOpts, serialize};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{Attribute, ParseOpts, QualName, namespace_url, ns};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

use super::{MARKER_ID, OVERRIDE_CSS};
use crate::error::Result;
use crate::transform::css::rewrite_style_declaration;
use crate::util::strip_bom;

/// Rewrite one content document: fix every inline `style` attribute and
/// inject the override style block into `<head>`.
///
/// Injection is idempotent: a document that already carries a
/// `<style id="yokogaki-fix">` block is left with exactly one.
pub fn rewrite_document(content: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(strip_bom(content))
        .map_err(|e| crate::Error::InvalidEpub(format!("document is not UTF-8: {}", e)))?;

    // html5ever treats an XML declaration as a bogus comment, so hold it
    // aside and splice it back after serializing.
    let (declaration, markup) = split_xml_declaration(text);

    let dom = parse_html(markup);

    for element in find_elements_with_attribute(&dom.document, "style") {
        if let Some(style) = get_attribute(&element, "style") {
            set_attribute(&element, "style", &rewrite_style_declaration(&style));
        }
    }

    if let Some(head) = find_first_element(&dom.document, "head")
        && find_marker_style(&head).is_none()
    {
        append_child(&head, new_override_style());
    }

    let mut out = String::new();
    if let Some(declaration) = declaration {
        out.push_str(declaration);
        out.push('\n');
    }
    out.push_str(&serialize_html(&dom)?);
    Ok(out.into_bytes())
}

/// Parse HTML/XHTML content into a DOM tree.
pub fn parse_html(html: &str) -> RcDom {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: false,
            ..Default::default()
        },
        ..Default::default()
    };

    parse_document(RcDom::default(), opts)
        .from_utf8()
        .one(html.as_bytes())
}

/// Serialize a DOM tree back to an HTML string.
pub fn serialize_html(dom: &RcDom) -> Result<String> {
    let mut bytes = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    serialize(&mut bytes, &document, SerializeOpts::default())?;
    Ok(String::from_utf8(bytes)?)
}

/// Split a leading `<?xml ...?>` declaration off the markup.
fn split_xml_declaration(text: &str) -> (Option<&str>, &str) {
    if text.trim_start().starts_with("<?xml")
        && let Some(end) = text.find("?>")
    {
        return (Some(text[..end + 2].trim_start()), &text[end + 2..]);
    }
    (None, text)
}

/// Get the first element with the given local name.
pub fn find_first_element(handle: &Handle, name: &str) -> Option<Handle> {
    if let NodeData::Element { name: ref qname, .. } = handle.data
        && qname.local.as_ref() == name
    {
        return Some(handle.clone());
    }

    for child in handle.children.borrow().iter() {
        if let Some(found) = find_first_element(child, name) {
            return Some(found);
        }
    }

    None
}

/// Find all elements carrying a specific attribute.
pub fn find_elements_with_attribute(handle: &Handle, attr_name: &str) -> Vec<Handle> {
    let mut results = Vec::new();
    find_with_attr_recursive(handle, attr_name, &mut results);
    results
}

fn find_with_attr_recursive(handle: &Handle, attr_name: &str, results: &mut Vec<Handle>) {
    if let NodeData::Element { ref attrs, .. } = handle.data
        && attrs.borrow().iter().any(|a| a.name.local.as_ref() == attr_name)
    {
        results.push(handle.clone());
    }

    for child in handle.children.borrow().iter() {
        find_with_attr_recursive(child, attr_name, results);
    }
}

/// Get an attribute value from an element.
pub fn get_attribute(handle: &Handle, attr_name: &str) -> Option<String> {
    if let NodeData::Element { ref attrs, .. } = handle.data {
        for attr in attrs.borrow().iter() {
            if attr.name.local.as_ref() == attr_name {
                return Some(attr.value.to_string());
            }
        }
    }
    None
}

/// Set an attribute on an element, replacing an existing value.
pub fn set_attribute(handle: &Handle, attr_name: &str, value: &str) {
    if let NodeData::Element { ref attrs, .. } = handle.data {
        let mut attrs_mut = attrs.borrow_mut();

        for attr in attrs_mut.iter_mut() {
            if attr.name.local.as_ref() == attr_name {
                attr.value = value.into();
                return;
            }
        }

        attrs_mut.push(Attribute {
            name: QualName::new(None, ns!(), attr_name.into()),
            value: value.into(),
        });
    }
}

/// Find a previously injected override block among the head's children.
fn find_marker_style(head: &Handle) -> Option<Handle> {
    for child in head.children.borrow().iter() {
        if let NodeData::Element { ref name, .. } = child.data
            && name.local.as_ref() == "style"
            && get_attribute(child, "id").as_deref() == Some(MARKER_ID)
        {
            return Some(child.clone());
        }
    }
    None
}

/// Build `<style id="yokogaki-fix">...</style>` holding the override CSS.
fn new_override_style() -> Handle {
    let style = Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), "style".into()),
        attrs: RefCell::new(vec![Attribute {
            name: QualName::new(None, ns!(), "id".into()),
            value: MARKER_ID.into(),
        }]),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });

    let text = Node::new(NodeData::Text {
        contents: RefCell::new(OVERRIDE_CSS.into()),
    });
    append_child(&style, text);

    style
}

fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite_str(html: &str) -> String {
        String::from_utf8(rewrite_document(html.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_body_style_attribute_rewritten() {
        let html = r#"<html><head><title>t</title></head><body style="writing-mode: vertical-rl;"><p>text</p></body></html>"#;
        let fixed = rewrite_str(html);
        assert!(fixed.contains("writing-mode: horizontal-tb"));
        assert!(!fixed.contains("vertical-rl"));
    }

    #[test]
    fn test_all_styled_elements_rewritten() {
        let html = r#"<html><head></head><body><p style="text-orientation: upright; color: red">a</p><span style="writing-mode: tb-rl">b</span></body></html>"#;
        let fixed = rewrite_str(html);
        // The attribute rule is gone; the injected override block still
        // carries its own text-orientation: mixed.
        assert!(!fixed.contains("text-orientation: upright"));
        assert!(fixed.contains("color: red"));
        assert!(fixed.contains("writing-mode: horizontal-tb"));
    }

    #[test]
    fn test_override_block_injected_into_head() {
        let html = "<html><head><title>t</title></head><body><p>text</p></body></html>";
        let fixed = rewrite_str(html);
        assert!(fixed.contains(MARKER_ID));
        assert!(fixed.contains("horizontal-tb !important"));
    }

    #[test]
    fn test_injection_is_idempotent() {
        let html = "<html><head></head><body><p>text</p></body></html>";
        let once = rewrite_str(html);
        let twice = rewrite_str(&once);
        assert_eq!(once.matches(MARKER_ID).count(), 1);
        assert_eq!(twice.matches(MARKER_ID).count(), 1);
    }

    #[test]
    fn test_xml_declaration_preserved() {
        let html = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<html><head></head><body><p>text</p></body></html>";
        let fixed = rewrite_str(html);
        assert!(fixed.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    }

    #[test]
    fn test_document_without_head_tolerated() {
        let html = "<p>bare fragment</p>";
        let fixed = rewrite_str(html);
        assert!(fixed.contains("bare fragment"));
    }

    #[test]
    fn test_unstyled_content_untouched() {
        let html = r#"<html><head></head><body><img src="a.png"/><a href="ch2.xhtml">next</a></body></html>"#;
        let fixed = rewrite_str(html);
        assert!(fixed.contains(r#"src="a.png""#));
        assert!(fixed.contains(r#"href="ch2.xhtml""#));
    }
}
