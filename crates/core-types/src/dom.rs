//! The DOM capability the engine consumes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::css::SelectorList;
use crate::element::ElementDesc;
use crate::errors::DomError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// What sits above a node: a regular element, or a shadow root hosted by an
/// element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentRef {
    Element(NodeId),
    ShadowRoot { root: NodeId, host: NodeId },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
    pub scroll_height: f64,
}

impl Viewport {
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

/// Read-only access to element descriptions.
///
/// Implementations hand out snapshots; nothing returned here is a live view.
/// `query_all` follows `querySelectorAll` on the document: it does not pierce
/// shadow roots.
pub trait DomPort: Send + Sync {
    /// The document element (`<html>`).
    fn document_root(&self) -> NodeId;

    fn body(&self) -> Option<NodeId>;

    /// `None` for unknown nodes and for shadow roots.
    fn element(&self, node: NodeId) -> Option<ElementDesc>;

    fn parent(&self, node: NodeId) -> Option<ParentRef>;

    /// Element children of an element or of a shadow root, in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn shadow_root(&self, host: NodeId) -> Option<NodeId>;

    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    fn query_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError>;

    fn element_at(&self, x: f64, y: f64) -> Option<NodeId>;

    fn viewport(&self) -> Viewport;

    /// Probe for a page-level global such as `React` or `__VUE__`.
    fn has_global(&self, name: &str) -> bool;
}

/// Parent element, stopping at shadow-root boundaries.
pub fn parent_element(dom: &dyn DomPort, node: NodeId) -> Option<NodeId> {
    match dom.parent(node)? {
        ParentRef::Element(parent) => Some(parent),
        ParentRef::ShadowRoot { .. } => None,
    }
}

/// Ancestor elements from nearest to furthest, not crossing shadow roots.
pub fn ancestors(dom: &dyn DomPort, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = node;
    while let Some(parent) = parent_element(dom, current) {
        out.push(parent);
        current = parent;
    }
    out
}

/// `Element.closest` over snapshots: the node itself or its nearest ancestor
/// matching `selector`.
pub fn closest(dom: &dyn DomPort, node: NodeId, selector: &SelectorList) -> Option<NodeId> {
    std::iter::once(node)
        .chain(ancestors(dom, node))
        .find(|candidate| {
            selector.matches_node(dom, *candidate)
        })
}

/// Element siblings including `node` itself (children of its parent element
/// or shadow root).
pub fn siblings(dom: &dyn DomPort, node: NodeId) -> Vec<NodeId> {
    match dom.parent(node) {
        Some(ParentRef::Element(parent)) => dom.children(parent),
        Some(ParentRef::ShadowRoot { root, .. }) => dom.children(root),
        None => vec![node],
    }
}

/// Depth-first walk (document order) of every element under `root`,
/// descending into shadow roots when `pierce_shadow` is set. Stops after
/// `limit` elements.
pub fn walk(dom: &dyn DomPort, root: NodeId, pierce_shadow: bool, limit: usize) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if out.len() >= limit {
            break;
        }
        out.push(node);
        let mut next = dom.children(node);
        if pierce_shadow {
            if let Some(shadow) = dom.shadow_root(node) {
                next.extend(dom.children(shadow));
            }
        }
        stack.extend(next.into_iter().rev());
    }
    out
}
