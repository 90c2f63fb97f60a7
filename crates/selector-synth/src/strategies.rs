//! Locator strategies in priority order.
//!
//! Each strategy looks at one kind of evidence on the element. Strategies do
//! not know about each other; [`crate::SelectorSynthesizer`] walks them and
//! keeps the first hit.

use pagewire_core_types::dom::walk;
use pagewire_core_types::{DomError, DomPort, ElementDesc, NodeId};
use serde::Serialize;

use crate::patterns::{is_auto_generated_id, meaningful_classes};
use crate::target::{label_for_control, labelled_by_text};
use crate::text::{clean_text, escape_ident, quote};

/// Visible text longer than this is not used in a locator.
pub const MAX_SELECTOR_TEXT: usize = 50;

/// Most classes combined into one class selector.
pub const MAX_CLASSES: usize = 3;

/// Descendants inspected when looking for a landmark heading.
const HEADING_SCAN_LIMIT: usize = 200;

pub const LANDMARK_TAGS: &[&str] = &[
    "header", "nav", "main", "footer", "aside", "section", "article", "form",
];

pub fn is_landmark(element: &ElementDesc) -> bool {
    LANDMARK_TAGS.contains(&element.tag.as_str())
}

/// Strategy identifiers, in the order the synthesizer tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Id,
    AccessibleAttribute,
    FormLabel,
    TestId,
    Name,
    Role,
    Landmark,
    VisibleText,
    ImageAlt,
    Classes,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Id => "id",
            StrategyKind::AccessibleAttribute => "accessible_attribute",
            StrategyKind::FormLabel => "form_label",
            StrategyKind::TestId => "test_id",
            StrategyKind::Name => "name",
            StrategyKind::Role => "role",
            StrategyKind::Landmark => "landmark",
            StrategyKind::VisibleText => "visible_text",
            StrategyKind::ImageAlt => "image_alt",
            StrategyKind::Classes => "classes",
        }
    }
}

/// What a strategy has to work with.
pub struct SynthContext<'a> {
    pub dom: &'a dyn DomPort,
    pub node: NodeId,
    pub element: &'a ElementDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Found(String),
    /// No usable evidence; try the next strategy.
    Skip,
    /// A uniqueness probe could not be evaluated. Only the positional path
    /// is trustworthy from here.
    Fallback,
}

impl From<Result<Option<String>, DomError>> for StrategyOutcome {
    fn from(result: Result<Option<String>, DomError>) -> Self {
        match result {
            Ok(Some(selector)) => StrategyOutcome::Found(selector),
            Ok(None) => StrategyOutcome::Skip,
            Err(_) => StrategyOutcome::Fallback,
        }
    }
}

pub trait SelectorStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome;

    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// The standard strategy chain.
pub fn default_strategies() -> Vec<Box<dyn SelectorStrategy>> {
    vec![
        Box::new(IdStrategy),
        Box::new(AccessibleAttributeStrategy),
        Box::new(FormLabelStrategy),
        Box::new(TestIdStrategy),
        Box::new(NameStrategy),
        Box::new(RoleStrategy),
        Box::new(LandmarkStrategy),
        Box::new(VisibleTextStrategy),
        Box::new(ImageAltStrategy),
        Box::new(ClassStrategy),
    ]
}

/// `#id` for ids that look hand-written.
pub struct IdStrategy;

impl SelectorStrategy for IdStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Id
    }

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome {
        match ctx.element.id.as_deref().map(str::trim) {
            Some(id) if !is_auto_generated_id(id) => {
                StrategyOutcome::Found(format!("#{}", escape_ident(id)))
            }
            _ => StrategyOutcome::Skip,
        }
    }
}

/// `aria-label`, then `title`.
pub struct AccessibleAttributeStrategy;

impl SelectorStrategy for AccessibleAttributeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AccessibleAttribute
    }

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome {
        let el = ctx.element;
        for attr in ["aria-label", "title"] {
            if let Some(value) = el.non_empty_attr(attr) {
                return StrategyOutcome::Found(format!("{}[{}={}]", el.tag, attr, quote(value)));
            }
        }
        StrategyOutcome::Skip
    }
}

/// Form controls by their label, falling back to the placeholder.
pub struct FormLabelStrategy;

impl SelectorStrategy for FormLabelStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FormLabel
    }

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome {
        let el = ctx.element;
        if !el.is_form_control() {
            return StrategyOutcome::Skip;
        }
        match label_for_control(ctx.dom, ctx.node, el) {
            Ok(Some(label)) => {
                return StrategyOutcome::Found(format!("{}:label({})", el.tag, quote(&label)))
            }
            Ok(None) => {}
            Err(_) => return StrategyOutcome::Fallback,
        }
        match el.non_empty_attr("placeholder") {
            Some(placeholder) => {
                StrategyOutcome::Found(format!("{}[placeholder={}]", el.tag, quote(placeholder)))
            }
            None => StrategyOutcome::Skip,
        }
    }
}

pub struct TestIdStrategy;

impl SelectorStrategy for TestIdStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TestId
    }

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome {
        for attr in ["data-testid", "data-test-id"] {
            if let Some(value) = ctx.element.non_empty_attr(attr) {
                return StrategyOutcome::Found(format!("[{}={}]", attr, quote(value)));
            }
        }
        StrategyOutcome::Skip
    }
}

pub struct NameStrategy;

impl SelectorStrategy for NameStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Name
    }

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome {
        let el = ctx.element;
        match el.non_empty_attr("name") {
            Some(name) if el.is_form_control() => {
                StrategyOutcome::Found(format!("{}[name={}]", el.tag, quote(name)))
            }
            _ => StrategyOutcome::Skip,
        }
    }
}

/// Explicit ARIA role plus an accessible name.
pub struct RoleStrategy;

impl SelectorStrategy for RoleStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Role
    }

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome {
        let el = ctx.element;
        let Some(role) = el.non_empty_attr("role") else {
            return StrategyOutcome::Skip;
        };
        let name = labelled_by_text(ctx.dom, el).or_else(|| single_line_text(&el.text));
        match name {
            Some(name) => StrategyOutcome::Found(format!(
                "[role={}]:name({})",
                quote(role),
                quote(&name)
            )),
            None => StrategyOutcome::Skip,
        }
    }
}

/// Landmarks by their first heading, or by tag when the page has only one.
pub struct LandmarkStrategy;

impl SelectorStrategy for LandmarkStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Landmark
    }

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome {
        let el = ctx.element;
        if !is_landmark(el) {
            return StrategyOutcome::Skip;
        }
        if let Some(heading) = inner_heading(ctx.dom, ctx.node) {
            return StrategyOutcome::Found(format!("{}:heading({})", el.tag, quote(&heading)));
        }
        ctx.dom
            .query_all(&el.tag)
            .map(|matches| (matches.len() == 1).then(|| el.tag.clone()))
            .into()
    }
}

/// Buttons and links by what they say; links by `href` when they say nothing.
pub struct VisibleTextStrategy;

impl SelectorStrategy for VisibleTextStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::VisibleText
    }

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome {
        let el = ctx.element;
        if !matches!(el.tag.as_str(), "button" | "a") {
            return StrategyOutcome::Skip;
        }
        if let Some(text) = single_line_text(&el.text) {
            return StrategyOutcome::Found(format!("{}:text({})", el.tag, quote(&text)));
        }
        if el.is("a") && el.text.trim().is_empty() {
            if let Some(href) = el.non_empty_attr("href") {
                return StrategyOutcome::Found(format!("a[href={}]", quote(href)));
            }
        }
        StrategyOutcome::Skip
    }
}

pub struct ImageAltStrategy;

impl SelectorStrategy for ImageAltStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ImageAlt
    }

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome {
        match ctx.element.non_empty_attr("alt") {
            Some(alt) if ctx.element.is("img") => {
                StrategyOutcome::Found(format!("img[alt={}]", quote(alt)))
            }
            _ => StrategyOutcome::Skip,
        }
    }
}

/// De-noised class combination, kept only when it matches exactly one
/// element.
pub struct ClassStrategy;

impl SelectorStrategy for ClassStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Classes
    }

    fn attempt(&self, ctx: &SynthContext<'_>) -> StrategyOutcome {
        let el = ctx.element;
        let classes = meaningful_classes(&el.classes);
        if classes.is_empty() {
            return StrategyOutcome::Skip;
        }
        let mut selector = el.tag.clone();
        for class in classes.into_iter().take(MAX_CLASSES) {
            selector.push('.');
            selector.push_str(&escape_ident(class));
        }
        ctx.dom
            .query_all(&selector)
            .map(|matches| (matches == [ctx.node]).then_some(selector))
            .into()
    }
}

/// Trimmed text usable in a locator: one line, at most
/// [`MAX_SELECTOR_TEXT`] characters.
pub fn single_line_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains('\n') || trimmed.chars().count() > MAX_SELECTOR_TEXT {
        return None;
    }
    Some(clean_text(trimmed, MAX_SELECTOR_TEXT))
}

fn inner_heading(dom: &dyn DomPort, node: NodeId) -> Option<String> {
    walk(dom, node, false, HEADING_SCAN_LIMIT)
        .into_iter()
        .skip(1)
        .filter_map(|child| dom.element(child))
        .find(|el| matches!(el.tag.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
        .and_then(|heading| {
            let text = clean_text(&heading.text, MAX_SELECTOR_TEXT);
            (!text.is_empty()).then_some(text)
        })
}
