use crate::error::{DesignError, DesignResult};
use kuchiki::iter::NodeEdge;
use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData, NodeRef};
use std::collections::BTreeMap;

pub const DEFAULT_MAX_TEMPLATE_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_MAX_TREE_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateLimits {
    pub max_bytes: usize,
    pub max_depth: usize,
}

impl Default for TemplateLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_TEMPLATE_BYTES,
            max_depth: DEFAULT_MAX_TREE_DEPTH,
        }
    }
}

/// Parsed design template. Read-only once built.
pub struct DocumentTree {
    document: NodeRef,
}

impl DocumentTree {
    pub fn parse(html: &str) -> DesignResult<Self> {
        Self::parse_with_limits(html, &TemplateLimits::default())
    }

    // html5ever recovers from malformed markup on its own; the only failures
    // here are inputs we refuse to hand it or trees we refuse to keep.
    pub fn parse_with_limits(html: &str, limits: &TemplateLimits) -> DesignResult<Self> {
        if html.trim().is_empty() {
            return Err(DesignError::template("template is empty"));
        }
        if html.len() > limits.max_bytes {
            return Err(DesignError::template(format!(
                "template is {} bytes, limit is {}",
                html.len(),
                limits.max_bytes
            )));
        }

        let document = kuchiki::parse_html().one(html);
        let depth = max_element_depth(&document);
        if depth > limits.max_depth {
            return Err(DesignError::template(format!(
                "template nests {} elements deep, limit is {}",
                depth, limits.max_depth
            )));
        }
        log::debug!("parsed design template: {} bytes, depth {}", html.len(), depth);
        Ok(Self { document })
    }

    pub fn find_by_id(&self, id: &str) -> Option<Element> {
        find_node_by_id(&self.document, id).map(|node| Element { node })
    }

    pub fn find_first_by_tag(&self, tag: &str) -> Option<Element> {
        self.elements()
            .find(|el| el.tag_name().eq_ignore_ascii_case(tag))
    }

    /// Elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        self.document
            .descendants()
            .filter(|node| node.as_element().is_some())
            .map(|node| Element { node })
    }

    /// Deep copy of the whole document; mutations on the copy never reach this tree.
    pub(crate) fn copy_document(&self) -> NodeRef {
        let copy = NodeRef::new_document();
        for child in self.document.children() {
            if let Some(cloned) = deep_clone(&child) {
                copy.append(cloned);
            }
        }
        copy
    }
}

/// Handle to one element of a [`DocumentTree`].
#[derive(Clone)]
pub struct Element {
    node: NodeRef,
}

impl Element {
    pub fn tag_name(&self) -> String {
        self.node
            .as_element()
            .map(|el| el.name.local.to_string())
            .unwrap_or_default()
    }

    pub fn id(&self) -> Option<String> {
        self.attribute("id")
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        let el = self.node.as_element()?;
        let attrs = el.attributes.borrow();
        attrs.get(name).map(str::to_string)
    }

    pub fn attributes(&self) -> BTreeMap<String, String> {
        let Some(el) = self.node.as_element() else {
            return BTreeMap::new();
        };
        let attrs = el.attributes.borrow();
        attrs
            .map
            .iter()
            .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
            .collect()
    }

    pub fn children(&self) -> Vec<Element> {
        self.node
            .children()
            .filter(|node| node.as_element().is_some())
            .map(|node| Element { node })
            .collect()
    }

    pub fn text_contents(&self) -> String {
        self.node.text_contents()
    }

    pub(crate) fn node(&self) -> &NodeRef {
        &self.node
    }
}

/// First element under `root`, in document order, whose `id` attribute equals `id`.
pub(crate) fn find_node_by_id(root: &NodeRef, id: &str) -> Option<NodeRef> {
    root.descendants().find(|node| {
        node.as_element()
            .is_some_and(|el| el.attributes.borrow().get("id") == Some(id))
    })
}

fn max_element_depth(root: &NodeRef) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    for edge in root.traverse() {
        match edge {
            NodeEdge::Start(node) if node.as_element().is_some() => {
                depth += 1;
                max = max.max(depth);
            }
            NodeEdge::End(node) if node.as_element().is_some() => {
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }
    max
}

/// Recursive copy detached from the source tree. Doctype and document nodes are skipped.
pub(crate) fn deep_clone(node: &NodeRef) -> Option<NodeRef> {
    let copy = match node.data() {
        NodeData::Element(el) => {
            let attrs = el.attributes.borrow().map.clone();
            NodeRef::new_element(el.name.clone(), attrs)
        }
        NodeData::Text(text) => NodeRef::new_text(text.borrow().clone()),
        NodeData::Comment(text) => NodeRef::new_comment(text.borrow().clone()),
        NodeData::ProcessingInstruction(_)
        | NodeData::Doctype(_)
        | NodeData::Document(_)
        | NodeData::DocumentFragment => return None,
    };
    for child in node.children() {
        if let Some(cloned) = deep_clone(&child) {
            copy.append(cloned);
        }
    }
    Some(copy)
}
