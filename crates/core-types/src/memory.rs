//! In-memory [`DomPort`] used by tests and scenario replay.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::css::SelectorList;
use crate::dom::{DomPort, NodeId, ParentRef, Viewport};
use crate::element::{ElementDesc, Rect};
use crate::errors::DomError;

/// Declarative element tree: an element description plus its light children
/// and optional shadow-root contents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    #[serde(flatten)]
    pub element: ElementDesc,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Vec<NodeSpec>>,
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            element: ElementDesc::new(tag),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.element.id = Some(id.into());
        self
    }

    /// Adds one or more whitespace-separated classes.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        for class in crate::element::split_classes(&class.into()) {
            if !self.element.has_class(&class) {
                self.element.classes.push(class);
            }
        }
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.element.set_attr(name, value);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.element.text = text.into().trim().to_string();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.element.value = Some(value.into());
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.element.rect = Some(Rect::new(x, y, width, height));
        self
    }

    pub fn content_editable(mut self) -> Self {
        self.element.content_editable = true;
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn shadow(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.shadow = Some(children.into_iter().collect());
        self
    }
}

#[derive(Debug)]
enum NodeKind {
    Element {
        desc: ElementDesc,
        shadow_root: Option<NodeId>,
    },
    ShadowRoot {
        host: NodeId,
    },
}

#[derive(Debug)]
struct DomNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct DomTree {
    nodes: BTreeMap<NodeId, DomNode>,
    root: NodeId,
    next_id: u64,
    viewport: Viewport,
    globals: BTreeSet<String>,
}

impl DomTree {
    fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, spec: NodeSpec, parent: Option<NodeId>) -> NodeId {
        let id = self.alloc();
        let mut desc = spec.element;
        desc.tag.make_ascii_lowercase();
        self.nodes.insert(
            id,
            DomNode {
                kind: NodeKind::Element {
                    desc,
                    shadow_root: None,
                },
                parent,
                children: Vec::new(),
            },
        );
        let children: Vec<NodeId> = spec
            .children
            .into_iter()
            .map(|child| self.insert(child, Some(id)))
            .collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = children;
        }
        if let Some(shadow) = spec.shadow {
            self.attach_shadow(id, shadow);
        }
        id
    }

    fn attach_shadow(&mut self, host: NodeId, contents: Vec<NodeSpec>) -> NodeId {
        let root = self.alloc();
        self.nodes.insert(
            root,
            DomNode {
                kind: NodeKind::ShadowRoot { host },
                parent: None,
                children: Vec::new(),
            },
        );
        let children: Vec<NodeId> = contents
            .into_iter()
            .map(|child| self.insert(child, Some(root)))
            .collect();
        if let Some(node) = self.nodes.get_mut(&root) {
            node.children = children;
        }
        if let Some(DomNode {
            kind: NodeKind::Element { shadow_root, .. },
            ..
        }) = self.nodes.get_mut(&host)
        {
            *shadow_root = Some(root);
        }
        root
    }

    fn desc(&self, node: NodeId) -> Option<&ElementDesc> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Element { desc, .. } => Some(desc),
            NodeKind::ShadowRoot { .. } => None,
        }
    }

    fn desc_mut(&mut self, node: NodeId) -> Option<&mut ElementDesc> {
        match &mut self.nodes.get_mut(&node)?.kind {
            NodeKind::Element { desc, .. } => Some(desc),
            NodeKind::ShadowRoot { .. } => None,
        }
    }

    /// Ancestor elements of `node`, nearest first, stopping at a shadow root.
    fn ancestor_descs(&self, node: NodeId) -> Vec<&ElementDesc> {
        let mut out = Vec::new();
        let mut current = self.nodes.get(&node).and_then(|n| n.parent);
        while let Some(id) = current {
            let Some(desc) = self.desc(id) else {
                break;
            };
            out.push(desc);
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        out
    }

    fn matches(&self, list: &SelectorList, node: NodeId) -> bool {
        let Some(desc) = self.desc(node) else {
            return false;
        };
        if list.needs_ancestors() {
            list.matches_path(desc, &self.ancestor_descs(node))
        } else {
            list.matches(desc)
        }
    }

    /// Light-DOM elements in document order.
    fn light_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            if let Some(entry) = self.nodes.get(&node) {
                stack.extend(entry.children.iter().rev().copied());
            }
        }
        out
    }

    fn remove_subtree(&mut self, node: NodeId) {
        if let Some(entry) = self.nodes.remove(&node) {
            for child in entry.children {
                self.remove_subtree(child);
            }
            if let NodeKind::Element {
                shadow_root: Some(root),
                ..
            } = entry.kind
            {
                self.remove_subtree(root);
            }
        }
    }
}

/// Thread-safe mutable element tree implementing [`DomPort`].
#[derive(Debug)]
pub struct MemoryDom {
    inner: RwLock<DomTree>,
}

impl MemoryDom {
    /// Builds a document from `root` (normally the `<html>` element). Node
    /// ids are assigned in document order starting at 1.
    pub fn new(root: NodeSpec) -> Self {
        let mut tree = DomTree {
            nodes: BTreeMap::new(),
            root: NodeId(1),
            next_id: 1,
            viewport: Viewport {
                width: 1280.0,
                height: 800.0,
                scroll_height: 800.0,
                ..Default::default()
            },
            globals: BTreeSet::new(),
        };
        tree.root = tree.insert(root, None);
        Self {
            inner: RwLock::new(tree),
        }
    }

    /// Wraps `body_children` in `<html><body>…</body></html>`.
    pub fn with_body(body_children: impl IntoIterator<Item = NodeSpec>) -> Self {
        Self::new(NodeSpec::new("html").child(NodeSpec::new("body").children(body_children)))
    }

    /// First light-DOM match for `selector`.
    pub fn find(&self, selector: &str) -> Option<NodeId> {
        self.query_all(selector).ok()?.into_iter().next()
    }

    /// First match anywhere, shadow trees included.
    pub fn find_deep(&self, selector: &str) -> Option<NodeId> {
        let list = SelectorList::parse(selector).ok()?;
        let tree = self.inner.read();
        tree.nodes
            .keys()
            .copied()
            .find(|id| tree.matches(&list, *id))
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.inner.write().viewport = viewport;
    }

    pub fn set_scroll_y(&self, y: f64) {
        self.inner.write().viewport.scroll_y = y;
    }

    pub fn set_global(&self, name: impl Into<String>) {
        self.inner.write().globals.insert(name.into());
    }

    pub fn set_value(&self, node: NodeId, value: impl Into<String>) -> bool {
        self.update(node, |el| el.value = Some(value.into()))
    }

    pub fn set_checked(&self, node: NodeId, checked: bool) -> bool {
        self.update(node, |el| el.checked = Some(checked))
    }

    pub fn set_text(&self, node: NodeId, text: impl Into<String>) -> bool {
        self.update(node, |el| el.text = text.into().trim().to_string())
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> bool {
        self.update(node, |el| el.set_attr(name, value))
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> bool {
        self.update(node, |el| el.remove_attr(name))
    }

    pub fn update(&self, node: NodeId, apply: impl FnOnce(&mut ElementDesc)) -> bool {
        let mut tree = self.inner.write();
        match tree.desc_mut(node) {
            Some(desc) => {
                apply(desc);
                true
            }
            None => false,
        }
    }

    /// Appends `spec` under `parent` (an element or a shadow root).
    pub fn append(&self, parent: NodeId, spec: NodeSpec) -> Result<NodeId, DomError> {
        let mut tree = self.inner.write();
        if !tree.nodes.contains_key(&parent) {
            return Err(DomError::UnknownNode(parent.0));
        }
        let id = tree.insert(spec, Some(parent));
        if let Some(entry) = tree.nodes.get_mut(&parent) {
            entry.children.push(id);
        }
        Ok(id)
    }

    pub fn attach_shadow(
        &self,
        host: NodeId,
        contents: impl IntoIterator<Item = NodeSpec>,
    ) -> Result<NodeId, DomError> {
        let mut tree = self.inner.write();
        if tree.desc(host).is_none() {
            return Err(DomError::UnknownNode(host.0));
        }
        Ok(tree.attach_shadow(host, contents.into_iter().collect()))
    }

    /// Detaches `node` and its subtree, returning its last description.
    pub fn remove(&self, node: NodeId) -> Option<ElementDesc> {
        let mut tree = self.inner.write();
        let desc = tree.desc(node).cloned()?;
        if let Some(parent) = tree.nodes.get(&node).and_then(|n| n.parent) {
            if let Some(entry) = tree.nodes.get_mut(&parent) {
                entry.children.retain(|child| *child != node);
            }
        }
        tree.remove_subtree(node);
        debug!(target: "dom.memory", %node, "node removed");
        Some(desc)
    }
}

impl DomPort for MemoryDom {
    fn document_root(&self) -> NodeId {
        self.inner.read().root
    }

    fn body(&self) -> Option<NodeId> {
        let tree = self.inner.read();
        let root = tree.nodes.get(&tree.root)?;
        root.children
            .iter()
            .copied()
            .find(|child| tree.desc(*child).map(|d| d.tag == "body").unwrap_or(false))
    }

    fn element(&self, node: NodeId) -> Option<ElementDesc> {
        self.inner.read().desc(node).cloned()
    }

    fn parent(&self, node: NodeId) -> Option<ParentRef> {
        let tree = self.inner.read();
        let parent = tree.nodes.get(&node)?.parent?;
        match &tree.nodes.get(&parent)?.kind {
            NodeKind::Element { .. } => Some(ParentRef::Element(parent)),
            NodeKind::ShadowRoot { host } => Some(ParentRef::ShadowRoot {
                root: parent,
                host: *host,
            }),
        }
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .read()
            .nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        match &self.inner.read().nodes.get(&host)?.kind {
            NodeKind::Element { shadow_root, .. } => *shadow_root,
            NodeKind::ShadowRoot { .. } => None,
        }
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let tree = self.inner.read();
        tree.light_order()
            .into_iter()
            .find(|node| tree.desc(*node).and_then(|d| d.id.as_deref()) == Some(id))
    }

    fn query_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let list = SelectorList::parse(selector)?;
        let tree = self.inner.read();
        Ok(tree
            .light_order()
            .into_iter()
            .filter(|node| tree.matches(&list, *node))
            .collect())
    }

    fn element_at(&self, x: f64, y: f64) -> Option<NodeId> {
        let tree = self.inner.read();
        tree.light_order().into_iter().rev().find(|node| {
            tree.desc(*node)
                .and_then(|d| d.rect)
                .map(|r| r.contains(x, y))
                .unwrap_or(false)
        })
    }

    fn viewport(&self) -> Viewport {
        self.inner.read().viewport
    }

    fn has_global(&self, name: &str) -> bool {
        self.inner.read().globals.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{closest, walk};

    fn sample() -> MemoryDom {
        MemoryDom::with_body([
            NodeSpec::new("nav").id("top").child(NodeSpec::new("a").text("Home")),
            NodeSpec::new("my-widget")
                .shadow([NodeSpec::new("button").class("inner").text("Go")]),
            NodeSpec::new("input").id("email").rect(0.0, 0.0, 100.0, 20.0),
        ])
    }

    #[test]
    fn ids_follow_document_order() {
        let dom = sample();
        assert_eq!(dom.document_root(), NodeId(1));
        assert_eq!(dom.body(), Some(NodeId(2)));
        assert_eq!(dom.find("#top"), Some(NodeId(3)));
        assert_eq!(dom.element_by_id("email"), dom.find("input"));
    }

    #[test]
    fn combinators_see_light_dom_ancestors() {
        let dom = sample();
        assert_eq!(dom.query_all("nav a").unwrap(), vec![NodeId(4)]);
        assert_eq!(dom.query_all("body > nav > a").unwrap(), vec![NodeId(4)]);
        assert!(dom.query_all("body > a").unwrap().is_empty());
        assert!(dom.find_deep("my-widget button").is_none());
        assert!(dom.find_deep("button.inner").is_some());

        let link = dom.find("nav a").unwrap();
        let inside = SelectorList::parse("body nav").unwrap();
        assert_eq!(closest(&dom, link, &inside), dom.find("#top"));
    }

    #[test]
    fn query_all_does_not_pierce_shadow_roots() {
        let dom = sample();
        assert!(dom.query_all("button.inner").unwrap().is_empty());
        let inner = dom.find_deep("button.inner").expect("shadow button");
        match dom.parent(inner) {
            Some(ParentRef::ShadowRoot { host, .. }) => {
                assert_eq!(dom.element(host).unwrap().tag, "my-widget")
            }
            other => panic!("unexpected parent {other:?}"),
        }
        let body = dom.body().unwrap();
        assert_eq!(walk(&dom, body, false, 100).len(), 5);
        assert_eq!(walk(&dom, body, true, 100).len(), 6);
    }

    #[test]
    fn mutations_are_visible_to_readers() {
        let dom = sample();
        let email = dom.find("#email").unwrap();
        assert!(dom.set_value(email, "a@b.c"));
        assert_eq!(dom.element(email).unwrap().value.as_deref(), Some("a@b.c"));
        assert_eq!(dom.element_at(10.0, 10.0), Some(email));

        let nav = dom.find("nav").unwrap();
        let link = dom.children(nav)[0];
        let nav_sel = SelectorList::parse("nav").unwrap();
        assert_eq!(closest(&dom, link, &nav_sel), Some(nav));

        let removed = dom.remove(nav).expect("removed");
        assert_eq!(removed.id.as_deref(), Some("top"));
        assert!(dom.element(link).is_none());
        assert!(dom.find("nav").is_none());
    }

    #[test]
    fn node_spec_deserializes_from_flat_json() {
        let spec: NodeSpec = serde_json::from_value(serde_json::json!({
            "tag": "form",
            "id": "login",
            "children": [
                {"tag": "input", "attributes": {"type": "email", "name": "email"}}
            ]
        }))
        .unwrap();
        assert_eq!(spec.element.tag, "form");
        assert_eq!(spec.children[0].element.attr("name"), Some("email"));
    }
}
