//! Compiled filter rules.

use std::collections::HashMap;

use pagewire_core_types::dom::ancestors;
use pagewire_core_types::{DomPort, ElementDesc, NodeId, SelectorList};
use regex::Regex;
use tracing::{debug, warn};

use crate::rules::FilterRules;

/// A class or attribute rule.
#[derive(Clone, Debug)]
pub enum Pattern {
    Regex(Regex),
    /// Rule text that is not a valid regex; matches by equality or
    /// containment.
    Literal(String),
}

impl Pattern {
    pub fn compile(source: &str) -> Pattern {
        match Regex::new(source) {
            Ok(re) => Pattern::Regex(re),
            Err(err) => {
                debug!(target: "mutation.watch", pattern = source, error = %err, "rule is not a regex; matching literally");
                Pattern::Literal(source.to_string())
            }
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(value),
            Pattern::Literal(text) => value == text || value.contains(text.as_str()),
        }
    }
}

/// An element rule.
#[derive(Clone, Debug)]
pub enum ElementRule {
    Selector(SelectorList),
    /// Rule text that does not parse as a selector; compared with the tag.
    Tag(String),
}

impl ElementRule {
    pub fn compile(source: &str) -> ElementRule {
        match SelectorList::parse(source) {
            Ok(list) => ElementRule::Selector(list),
            Err(err) => {
                warn!(target: "mutation.watch", rule = source, error = %err, "element rule is not a selector; comparing tag names");
                ElementRule::Tag(source.trim().to_ascii_lowercase())
            }
        }
    }

    pub fn matches(&self, element: &ElementDesc) -> bool {
        self.matches_path(element, &[])
    }

    /// Like [`ElementRule::matches`] with the element's ancestors, nearest
    /// first, available to descendant and child combinators.
    pub fn matches_path(&self, element: &ElementDesc, ancestors: &[&ElementDesc]) -> bool {
        match self {
            ElementRule::Selector(list) => list.matches_path(element, ancestors),
            ElementRule::Tag(tag) => element.tag == *tag,
        }
    }
}

/// Compiled patterns keyed by rule text. Cleared whenever the active rule
/// set changes.
#[derive(Default)]
pub struct PatternCache {
    patterns: HashMap<String, Pattern>,
    elements: HashMap<String, ElementRule>,
    compiled_for: Option<FilterRules>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(&mut self, source: &str) -> Pattern {
        self.patterns
            .entry(source.to_string())
            .or_insert_with(|| Pattern::compile(source))
            .clone()
    }

    pub fn element_rule(&mut self, source: &str) -> ElementRule {
        self.elements
            .entry(source.to_string())
            .or_insert_with(|| ElementRule::compile(source))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.patterns.len() + self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
        self.elements.clear();
        self.compiled_for = None;
    }

    /// Compiles `rules`, reusing cached entries when the rule set is the one
    /// compiled last time.
    pub fn compile(&mut self, rules: &FilterRules) -> CompiledRules {
        if self.compiled_for.as_ref() != Some(rules) {
            self.clear();
            self.compiled_for = Some(rules.clone());
        }
        CompiledRules {
            ignore_classes: rules.ignore_classes.iter().map(|r| self.pattern(r)).collect(),
            ignore_attributes: rules
                .ignore_attributes
                .iter()
                .map(|r| self.pattern(r))
                .collect(),
            ignore_elements: rules
                .ignore_elements
                .iter()
                .map(|r| self.element_rule(r))
                .collect(),
            interesting_classes: rules
                .interesting_classes
                .iter()
                .map(|r| self.pattern(r))
                .collect(),
            interesting_attributes: rules
                .interesting_attributes
                .iter()
                .map(|r| self.pattern(r))
                .collect(),
            only_selectors: rules
                .only_selectors
                .iter()
                .map(|r| self.element_rule(r))
                .collect(),
        }
    }
}

/// Rules ready for classification.
#[derive(Clone, Debug, Default)]
pub struct CompiledRules {
    pub ignore_classes: Vec<Pattern>,
    pub ignore_attributes: Vec<Pattern>,
    pub ignore_elements: Vec<ElementRule>,
    pub interesting_classes: Vec<Pattern>,
    pub interesting_attributes: Vec<Pattern>,
    pub only_selectors: Vec<ElementRule>,
}

fn any_match(patterns: &[Pattern], value: &str) -> bool {
    patterns.iter().any(|p| p.matches(value))
}

impl CompiledRules {
    pub fn is_ignored_class(&self, class: &str) -> bool {
        any_match(&self.ignore_classes, class)
    }

    pub fn is_ignored_attribute(&self, name: &str) -> bool {
        any_match(&self.ignore_attributes, name)
    }

    pub fn is_interesting_class(&self, class: &str) -> bool {
        any_match(&self.interesting_classes, class)
    }

    pub fn is_interesting_attribute(&self, name: &str) -> bool {
        any_match(&self.interesting_attributes, name)
    }

    /// Ignore decision for an element that has left the document: only the
    /// element itself is checked.
    pub fn is_ignored_detached(&self, element: &ElementDesc) -> bool {
        let ignored = self.ignore_elements.iter().any(|r| r.matches(element));
        let outside_allow_list = !self.only_selectors.is_empty()
            && !self.only_selectors.iter().any(|r| r.matches(element));
        ignored || outside_allow_list
    }

    /// Ignore decision for a live element: the element or any ancestor may
    /// match `ignoreElements`, and the element or any ancestor must match a
    /// non-empty `onlySelectors`.
    pub fn is_ignored_live(&self, dom: &dyn DomPort, node: NodeId, element: &ElementDesc) -> bool {
        if self.ignore_elements.is_empty() && self.only_selectors.is_empty() {
            return false;
        }
        let owned: Vec<ElementDesc> = ancestors(dom, node)
            .into_iter()
            .filter_map(|id| dom.element(id))
            .collect();
        let chain: Vec<&ElementDesc> = std::iter::once(element).chain(owned.iter()).collect();
        let any_in_chain = |rules: &[ElementRule]| {
            (0..chain.len()).any(|i| rules.iter().any(|r| r.matches_path(chain[i], &chain[i + 1..])))
        };
        if any_in_chain(&self.ignore_elements) {
            return true;
        }
        !self.only_selectors.is_empty() && !any_in_chain(&self.only_selectors)
    }

    /// Element worth listing individually.
    pub fn is_notable_element(&self, element: &ElementDesc) -> bool {
        if element.id.as_deref().is_some_and(|id| !id.is_empty()) {
            return true;
        }
        if matches!(
            element.tag.as_str(),
            "dialog" | "form" | "button" | "a" | "input" | "select" | "textarea"
        ) || element.is_custom_element()
        {
            return true;
        }
        element.classes.iter().any(|c| self.is_interesting_class(c))
            || element
                .attribute_names()
                .any(|name| self.is_interesting_attribute(name))
    }
}
