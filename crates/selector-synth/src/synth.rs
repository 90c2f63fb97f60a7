use pagewire_core_types::dom::{ancestors, walk};
use pagewire_core_types::{DomPort, ElementDesc, NodeId, ParentRef};
use tracing::trace;

use crate::patterns::{is_auto_generated_id, meaningful_classes};
use crate::strategies::{
    default_strategies, is_landmark, SelectorStrategy, StrategyOutcome, SynthContext,
};
use crate::text::escape_ident;

/// Path segment separating a shadow host from the inside of its shadow root.
pub const SHADOW_MARKER: &str = ">>>";

/// Elements scanned under a landmark when deciding whether a context
/// selector is unambiguous.
const CONTEXT_SCAN_LIMIT: usize = 2_000;

/// Ordered strategy chain plus the context and positional fallbacks.
pub struct SelectorSynthesizer {
    strategies: Vec<Box<dyn SelectorStrategy>>,
}

impl Default for SelectorSynthesizer {
    fn default() -> Self {
        Self::new(default_strategies())
    }
}

impl std::fmt::Debug for SelectorSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorSynthesizer")
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SelectorSynthesizer {
    pub fn new(strategies: Vec<Box<dyn SelectorStrategy>>) -> Self {
        Self { strategies }
    }

    /// Best available locator for `node`. Never fails; unknown nodes get
    /// `"*"`.
    pub fn best_selector(&self, dom: &dyn DomPort, node: NodeId) -> String {
        let Some(element) = dom.element(node) else {
            trace!(target: "selector.synth", %node, "node vanished before synthesis");
            return "*".to_string();
        };

        match self.run_strategies(dom, node, &element) {
            StrategyOutcome::Found(selector) => return selector,
            StrategyOutcome::Fallback => return positional_path(dom, node),
            StrategyOutcome::Skip => {}
        }

        if let Some(selector) = self.context_selector(dom, node, &element) {
            trace!(target: "selector.synth", %node, selector = %selector, "landmark context");
            return selector;
        }
        positional_path(dom, node)
    }

    fn run_strategies(
        &self,
        dom: &dyn DomPort,
        node: NodeId,
        element: &ElementDesc,
    ) -> StrategyOutcome {
        let ctx = SynthContext { dom, node, element };
        for strategy in &self.strategies {
            match strategy.attempt(&ctx) {
                StrategyOutcome::Skip => continue,
                StrategyOutcome::Found(selector) => {
                    trace!(
                        target: "selector.synth",
                        %node,
                        strategy = strategy.name(),
                        selector = %selector,
                        "selector synthesized"
                    );
                    return StrategyOutcome::Found(selector);
                }
                StrategyOutcome::Fallback => {
                    trace!(
                        target: "selector.synth",
                        %node,
                        strategy = strategy.name(),
                        "probe failed; using positional path"
                    );
                    return StrategyOutcome::Fallback;
                }
            }
        }
        StrategyOutcome::Skip
    }

    /// `<landmark> tag`, qualified with `:nth-of-type(k)` when the landmark
    /// holds several same-tag siblings. Gives up when the tag is ambiguous
    /// in any other way.
    fn context_selector(
        &self,
        dom: &dyn DomPort,
        node: NodeId,
        element: &ElementDesc,
    ) -> Option<String> {
        let (landmark, landmark_el) = ancestors(dom, node)
            .into_iter()
            .filter_map(|id| dom.element(id).map(|el| (id, el)))
            .find(|(_, el)| is_landmark(el))?;

        let landmark_selector = match self.run_strategies(dom, landmark, &landmark_el) {
            StrategyOutcome::Found(selector) => selector,
            _ => return None,
        };

        let same_tag: Vec<NodeId> = walk(dom, landmark, false, CONTEXT_SCAN_LIMIT)
            .into_iter()
            .skip(1)
            .filter(|id| dom.element(*id).is_some_and(|el| el.tag == element.tag))
            .collect();
        if same_tag.len() <= 1 {
            return Some(format!("{} {}", landmark_selector, element.tag));
        }

        let siblings = same_tag_siblings(dom, node, &element.tag);
        if same_tag.iter().all(|id| siblings.contains(id)) {
            let index = siblings.iter().position(|id| *id == node)? + 1;
            return Some(format!(
                "{} {}:nth-of-type({})",
                landmark_selector, element.tag, index
            ));
        }
        None
    }
}

/// Full ancestor path from `body` (or the nearest stable id) down to `node`.
pub fn positional_path(dom: &dyn DomPort, node: NodeId) -> String {
    // Built leaf-first; each entry is (segment, joiner to the segment above).
    let mut segments: Vec<(String, &str)> = Vec::new();
    let mut current = node;

    loop {
        let Some(element) = dom.element(current) else {
            break;
        };
        if let Some(id) = stable_id(&element) {
            segments.push((format!("{}#{}", element.tag, escape_ident(id)), " > "));
            break;
        }
        if element.is("body") || element.is("html") {
            segments.push((element.tag.clone(), " > "));
            break;
        }

        let parent = dom.parent(current);
        let segment = match &parent {
            Some(ParentRef::Element(parent)) => {
                indexed_segment(&element, current, &dom.children(*parent))
            }
            Some(ParentRef::ShadowRoot { root, .. }) => {
                indexed_segment(&element, current, &dom.children(*root))
            }
            None => element.tag.clone(),
        };

        match parent {
            Some(ParentRef::Element(parent)) => {
                segments.push((segment, " > "));
                current = parent;
            }
            Some(ParentRef::ShadowRoot { host, .. }) => {
                segments.push((segment, SHADOW_MARKER));
                current = host;
            }
            None => {
                segments.push((segment, " > "));
                break;
            }
        }
    }

    let mut out = String::new();
    for (idx, (segment, _)) in segments.iter().enumerate().rev() {
        out.push_str(segment);
        if idx > 0 {
            let joiner = segments[idx - 1].1;
            if joiner == SHADOW_MARKER {
                out.push(' ');
                out.push_str(SHADOW_MARKER);
                out.push(' ');
            } else {
                out.push_str(joiner);
            }
        }
    }
    out
}

/// Best-effort description of an element that is no longer in the document.
/// No probes: `tag#id`, else `tag.c1.c2`, else the tag.
pub fn detached_selector(element: &ElementDesc) -> String {
    if let Some(id) = element.id.as_deref().filter(|id| !id.trim().is_empty()) {
        return format!("{}#{}", element.tag, escape_ident(id));
    }
    let classes = meaningful_classes(&element.classes);
    if classes.is_empty() {
        return element.tag.clone();
    }
    let mut out = element.tag.clone();
    for class in classes.into_iter().take(2) {
        out.push('.');
        out.push_str(&escape_ident(class));
    }
    out
}

fn stable_id(element: &ElementDesc) -> Option<&str> {
    element
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !is_auto_generated_id(id))
}

fn indexed_segment(element: &ElementDesc, node: NodeId, siblings: &[NodeId]) -> String {
    if siblings.len() <= 1 {
        return element.tag.clone();
    }
    match siblings.iter().position(|id| *id == node) {
        Some(idx) => format!("{}:nth-child({})", element.tag, idx + 1),
        None => element.tag.clone(),
    }
}

fn same_tag_siblings(dom: &dyn DomPort, node: NodeId, tag: &str) -> Vec<NodeId> {
    pagewire_core_types::dom::siblings(dom, node)
        .into_iter()
        .filter(|id| dom.element(*id).is_some_and(|el| el.tag == tag))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewire_core_types::{MemoryDom, NodeSpec};

    #[test]
    fn positional_path_stops_at_stable_id() {
        let dom = MemoryDom::with_body([NodeSpec::new("div").id("app").children([
            NodeSpec::new("span"),
            NodeSpec::new("span"),
        ])]);
        let spans = dom.query_all("span").unwrap();
        assert_eq!(positional_path(&dom, spans[1]), "div#app > span:nth-child(2)");
    }

    #[test]
    fn positional_path_marks_shadow_crossing() {
        let dom = MemoryDom::with_body([NodeSpec::new("div").children([
            NodeSpec::new("p"),
            NodeSpec::new("x-card").shadow([NodeSpec::new("span"), NodeSpec::new("b")]),
        ])]);
        let inner = dom.find_deep("b").unwrap();
        assert_eq!(
            positional_path(&dom, inner),
            "body > div > x-card:nth-child(2) >>> b:nth-child(2)"
        );
    }

    #[test]
    fn detached_selector_needs_no_document() {
        let el = ElementDesc::new("div").with_class("toast").with_class("mt-2");
        assert_eq!(detached_selector(&el), "div.toast");
        assert_eq!(detached_selector(&ElementDesc::new("li")), "li");
        assert_eq!(
            detached_selector(&ElementDesc::new("div").with_id("modal")),
            "div#modal"
        );
    }
}
