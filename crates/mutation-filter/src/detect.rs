//! Framework detection from page globals, marker attributes and a bounded
//! scan of the document.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use pagewire_core_types::dom::walk;
use pagewire_core_types::{DomPort, ElementDesc};
use regex::Regex;
use tracing::debug;

use crate::presets::Framework;

static TAILWIND_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-?(p|m)[trblxy]?-\d+|(bg|text|border)-[a-z]+-\d{2,3}|(sm|md|lg|xl|2xl|hover|focus):[a-z-]+|(flex|grid|gap|space-[xy]|rounded|shadow)(-[a-z0-9]+)?)$",
    )
    .expect("static tailwind pattern")
});

static BOOTSTRAP_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(btn-(primary|secondary|success|danger|warning|info|light|dark|link|outline-[a-z]+)|col-(xs|sm|md|lg|xl|xxl)-\d+|navbar(-[a-z]+)?|modal-dialog|form-control|form-group)$",
    )
    .expect("static bootstrap pattern")
});

/// Utility classes seen before Tailwind is assumed.
const TAILWIND_THRESHOLD: usize = 5;

/// Markers a page-level probe can answer without a scan.
const GLOBAL_MARKERS: &[(Framework, &[&str])] = &[
    (Framework::React, &["React", "__REACT_DEVTOOLS_GLOBAL_HOOK__", "__NEXT_DATA__"]),
    (Framework::Vue, &["Vue", "__VUE__", "__NUXT__"]),
    (Framework::Angular, &["ng", "angular", "getAllAngularRootElements"]),
    (Framework::Svelte, &["__svelte"]),
    (Framework::Bootstrap, &["bootstrap"]),
    (Framework::Htmx, &["htmx"]),
];

const SELECTOR_MARKERS: &[(Framework, &str)] = &[
    (Framework::React, "[data-reactroot], #__next, #root"),
    (Framework::Vue, "[data-v-app], #__nuxt"),
    (Framework::Angular, "[ng-version], [ng-app]"),
    (Framework::Htmx, "[hx-get], [hx-post], [hx-target], [data-hx-get]"),
];

/// Frameworks that appear to be on the page, in [`Framework::ALL`] order.
pub fn detect_frameworks(dom: &dyn DomPort, scan_limit: usize) -> Vec<Framework> {
    let mut found = BTreeSet::new();

    for (framework, globals) in GLOBAL_MARKERS {
        if globals.iter().any(|name| dom.has_global(name)) {
            found.insert(*framework);
        }
    }

    for (framework, selector) in SELECTOR_MARKERS {
        if found.contains(framework) {
            continue;
        }
        if dom.query_all(selector).is_ok_and(|hits| !hits.is_empty()) {
            found.insert(*framework);
        }
    }

    let mut tailwind_hits = 0usize;
    for node in walk(dom, dom.document_root(), false, scan_limit) {
        let Some(element) = dom.element(node) else {
            continue;
        };
        scan_element(&element, &mut found, &mut tailwind_hits);
    }
    if tailwind_hits >= TAILWIND_THRESHOLD {
        found.insert(Framework::Tailwind);
    }

    let found: Vec<Framework> = found.into_iter().collect();
    debug!(target: "mutation.watch", frameworks = ?found, "framework detection finished");
    found
}

fn scan_element(element: &ElementDesc, found: &mut BTreeSet<Framework>, tailwind_hits: &mut usize) {
    for name in element.attribute_names() {
        if name.starts_with("data-react") {
            found.insert(Framework::React);
        } else if name.starts_with("data-v-") {
            found.insert(Framework::Vue);
        } else if name.starts_with("_ngcontent-") || name.starts_with("_nghost-") || name.starts_with("ng-") {
            found.insert(Framework::Angular);
        } else if name.starts_with("hx-") || name.starts_with("data-hx-") {
            found.insert(Framework::Htmx);
        }
    }
    for class in &element.classes {
        if class.starts_with("svelte-") {
            found.insert(Framework::Svelte);
        }
        if BOOTSTRAP_CLASS.is_match(class) {
            found.insert(Framework::Bootstrap);
        }
        if TAILWIND_CLASS.is_match(class) {
            *tailwind_hits += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewire_core_types::{MemoryDom, NodeSpec};

    #[test]
    fn plain_page_has_no_frameworks() {
        let dom = MemoryDom::with_body([NodeSpec::new("p").text("hello")]);
        assert!(detect_frameworks(&dom, 2_000).is_empty());
    }

    #[test]
    fn globals_and_markers_are_detected() {
        let dom = MemoryDom::with_body([
            NodeSpec::new("div").attr("data-v-7ba5bd90", ""),
            NodeSpec::new("button").attr("hx-post", "/save"),
        ]);
        dom.set_global("React");
        assert_eq!(
            detect_frameworks(&dom, 2_000),
            vec![Framework::React, Framework::Vue, Framework::Htmx]
        );
    }

    #[test]
    fn class_scan_finds_tailwind_and_bootstrap() {
        let dom = MemoryDom::with_body([
            NodeSpec::new("div").class("px-4 py-2 bg-blue-500 text-sm md:flex rounded-lg"),
            NodeSpec::new("button").class("btn btn-primary"),
            NodeSpec::new("span").class("svelte-1x2y3z"),
        ]);
        assert_eq!(
            detect_frameworks(&dom, 2_000),
            vec![Framework::Svelte, Framework::Tailwind, Framework::Bootstrap]
        );
    }

    #[test]
    fn scan_is_bounded() {
        let dom = MemoryDom::with_body([
            NodeSpec::new("div"),
            NodeSpec::new("div"),
            NodeSpec::new("span").class("svelte-abc123"),
        ]);
        assert!(detect_frameworks(&dom, 3).is_empty());
    }
}
