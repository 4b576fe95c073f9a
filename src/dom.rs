//! DOM manipulation and traversal helpers

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom as rcdom;
use rcdom::{Handle, Node, NodeData};

use crate::utils::collapse_spaces;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Elements that start a new line in rendered text
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "footer", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "li", "nav", "ol", "p", "section", "ul",
];

pub fn has_class(attrs: &[Attribute], class_name: &str) -> bool {
    attrs.iter().any(|attr| {
        attr.name.local.as_ref() == "class"
            && attr.value.split_whitespace().any(|class| class == class_name)
    })
}

pub fn has_attr(attrs: &[Attribute], attr_name: &str, attr_value: &str) -> bool {
    attrs
        .iter()
        .any(|attr| attr.name.local.as_ref() == attr_name && attr.value.as_ref() == attr_value)
}

pub fn attr_contains(attrs: &[Attribute], attr_name: &str, needle: &str) -> bool {
    attrs
        .iter()
        .any(|attr| attr.name.local.as_ref() == attr_name && attr.value.contains(needle))
}

pub fn get_attr_value(attrs: &[Attribute], attr_name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| attr.name.local.as_ref() == attr_name)
        .map(|attr| attr.value.as_ref().to_string())
}

/// Tag name of an element node, `None` for text, comments and the document
pub fn tag_name(handle: &Handle) -> Option<&str> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

pub fn is_tag(handle: &Handle, tag: &str) -> bool {
    tag_name(handle) == Some(tag)
}

/// Run a predicate over an element's attributes; non-elements never match
pub fn with_attrs<F>(handle: &Handle, f: F) -> bool
where
    F: FnOnce(&[Attribute]) -> bool,
{
    match &handle.data {
        NodeData::Element { attrs, .. } => f(attrs.borrow().as_slice()),
        _ => false,
    }
}

pub fn attr(handle: &Handle, attr_name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => get_attr_value(&attrs.borrow(), attr_name),
        _ => None,
    }
}

/// Matches `[data-testid="..."]`
pub fn has_test_id(handle: &Handle, test_id: &str) -> bool {
    with_attrs(handle, |attrs| has_attr(attrs, "data-testid", test_id))
}

/// First descendant (excluding `handle` itself) in document order matching `pred`
pub fn find_first<F>(handle: &Handle, pred: &F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    for child in handle.children.borrow().iter() {
        if pred(child) {
            return Some(child.clone());
        }
        if let Some(found) = find_first(child, pred) {
            return Some(found);
        }
    }
    None
}

/// All descendants (excluding `handle` itself) in document order matching `pred`
pub fn find_all<F>(handle: &Handle, pred: &F) -> Vec<Handle>
where
    F: Fn(&Handle) -> bool,
{
    fn collect<F>(node: &Handle, pred: &F, found: &mut Vec<Handle>)
    where
        F: Fn(&Handle) -> bool,
    {
        for child in node.children.borrow().iter() {
            if pred(child) {
                found.push(child.clone());
            }
            collect(child, pred, found);
        }
    }

    let mut found = Vec::new();
    collect(handle, pred, &mut found);
    found
}

pub fn parent_element(handle: &Handle) -> Option<Handle> {
    // Temporarily take parent ref, use it, then restore it
    let parent_weak_opt = handle.parent.take();
    let parent = parent_weak_opt.as_ref().and_then(|weak| weak.upgrade());
    handle.parent.set(parent_weak_opt);
    parent.filter(|parent| matches!(parent.data, NodeData::Element { .. }))
}

/// Nearest ancestor-or-self matching `pred`
pub fn closest<F>(handle: &Handle, pred: F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    let mut current = Some(handle.clone());
    while let Some(node) = current {
        if pred(&node) {
            return Some(node);
        }
        current = parent_element(&node);
    }
    None
}

/// Rendered text of a subtree, approximating a browser's `innerText`
/// - `<br>` becomes a newline
/// - Block-level elements sit on their own lines
/// - Whitespace-only text containing a newline is source formatting and is dropped
/// - Newlines inside text are kept, runs of spaces collapse
pub fn inner_text(handle: &Handle) -> String {
    let mut text = String::new();

    fn break_line(text: &mut String) {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
    }

    fn collect_text(node: &Handle, text: &mut String) {
        match &node.data {
            NodeData::Text { contents } => {
                let contents = contents.borrow();
                if contents.trim().is_empty() && contents.contains('\n') {
                    return;
                }
                text.push_str(&collapse_spaces(&contents));
            }
            NodeData::Element { name, .. } => {
                let tag_name = name.local.as_ref();
                match tag_name {
                    "br" => text.push('\n'),
                    "script" | "style" | "template" => {}
                    _ if BLOCK_TAGS.contains(&tag_name) => {
                        break_line(text);
                        for child in node.children.borrow().iter() {
                            collect_text(child, text);
                        }
                        break_line(text);
                    }
                    _ => {
                        for child in node.children.borrow().iter() {
                            collect_text(child, text);
                        }
                    }
                }
            }
            _ => {
                for child in node.children.borrow().iter() {
                    collect_text(child, text);
                }
            }
        }
    }

    collect_text(handle, &mut text);
    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Text of a subtree exactly as written, for pre-wrap content like post bodies.
/// Wrapper elements add no breaks and whitespace is kept; only `<br>` adds a newline.
pub fn raw_text(handle: &Handle) -> String {
    fn collect_raw(node: &Handle, text: &mut String) {
        match &node.data {
            NodeData::Text { contents } => text.push_str(&contents.borrow()),
            NodeData::Element { name, .. } => match name.local.as_ref() {
                "br" => text.push('\n'),
                "script" | "style" | "template" => {}
                _ => {
                    for child in node.children.borrow().iter() {
                        collect_raw(child, text);
                    }
                }
            },
            _ => {
                for child in node.children.borrow().iter() {
                    collect_raw(child, text);
                }
            }
        }
    }

    let mut text = String::new();
    collect_raw(handle, &mut text);
    text.trim().to_string()
}

fn html_name(tag: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag))
}

fn attr_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

/// Create a detached HTML element
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: attr_name(name),
            value: StrTendril::from(*value),
        })
        .collect();

    Node::new(NodeData::Element {
        name: html_name(tag),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

pub fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Insert `child` into `parent` directly before `reference`.
/// Returns false (and leaves the tree untouched) if `reference` is not a child of `parent`.
pub fn insert_before(parent: &Handle, child: Handle, reference: &Handle) -> bool {
    let mut children = parent.children.borrow_mut();
    let Some(index) = children.iter().position(|node| Rc::ptr_eq(node, reference)) else {
        return false;
    };
    child.parent.set(Some(Rc::downgrade(parent)));
    children.insert(index, child);
    true
}

/// Set (or add) an attribute on an element
pub fn set_attr(handle: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &handle.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|attr| attr.name.local.as_ref() == name) {
            Some(existing) => existing.value = StrTendril::from(value),
            None => attrs.push(Attribute {
                name: attr_name(name),
                value: StrTendril::from(value),
            }),
        }
    }
}

/// Replace the children of an element this crate created with a single text node
pub fn set_text(handle: &Handle, text: &str) {
    for child in handle.children.borrow_mut().drain(..) {
        child.parent.set(None);
    }
    append_child(handle, create_text(text));
}
