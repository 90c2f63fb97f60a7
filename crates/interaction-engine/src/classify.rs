//! Stateless raw → semantic mappings.

use pagewire_core_types::dom::ParentRef;
use pagewire_core_types::{NodeId, SelectorList, SemanticEvent, SemanticKind};
use selector_synth::text::truncate_chars;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::aggregate::Scope;
use crate::raw::{ConsoleLevel, Modifiers};

/// Keys reported without a modifier.
const COMMAND_KEYS: &[&str] = &["Enter", "Escape", "Tab"];

/// Selectors marking the recording widget's own UI.
#[derive(Clone, Debug, Default)]
pub struct WidgetFilter {
    selectors: Vec<SelectorList>,
}

impl WidgetFilter {
    pub fn new(sources: &[String]) -> Self {
        let selectors = sources
            .iter()
            .filter_map(|source| match SelectorList::parse(source) {
                Ok(list) => Some(list),
                Err(err) => {
                    warn!(target: "interaction.engine", selector = %source, error = %err, "ignoreWithin selector skipped");
                    None
                }
            })
            .collect();
        Self { selectors }
    }

    /// True when `node` or anything above it, across shadow hosts, matches.
    pub fn contains(&self, scope: Scope<'_>, node: NodeId) -> bool {
        if self.selectors.is_empty() {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if self.selectors.iter().any(|s| s.matches_node(scope.dom, id)) {
                return true;
            }
            current = match scope.dom.parent(id) {
                Some(ParentRef::Element(parent)) => Some(parent),
                Some(ParentRef::ShadowRoot { host, .. }) => Some(host),
                None => None,
            };
        }
        false
    }
}

pub fn click(scope: Scope<'_>, node: NodeId, x: f64, y: f64, now: i64) -> Option<SemanticEvent> {
    let element = scope.dom.element(node)?;
    // Toggles are reported by the change handler.
    if matches!(element.input_type().as_str(), "checkbox" | "radio") {
        return None;
    }
    Some(
        SemanticEvent::new(SemanticKind::Click, now)
            .with_target(scope.target(node))
            .field("x", x)
            .field("y", y),
    )
}

pub fn submit(scope: Scope<'_>, node: NodeId, now: i64) -> Option<SemanticEvent> {
    let element = scope.dom.element(node)?;
    let method = element
        .non_empty_attr("method")
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "get".to_string());
    Some(
        SemanticEvent::new(SemanticKind::Submit, now)
            .with_target(scope.target(node))
            .field("action", element.attr("action").unwrap_or_default())
            .field("method", method),
    )
}

pub fn focus(scope: Scope<'_>, node: NodeId, gained: bool, now: i64) -> Option<SemanticEvent> {
    let target = scope.target(node)?;
    let kind = if gained {
        SemanticKind::FocusIn
    } else {
        SemanticKind::FocusOut
    };
    Some(SemanticEvent::new(kind, now).with_target(Some(target)))
}

/// Copy, cut or paste. Clipboard text is never reported for password
/// fields.
pub fn clipboard(
    scope: Scope<'_>,
    kind: SemanticKind,
    node: Option<NodeId>,
    text: Option<&str>,
    now: i64,
) -> SemanticEvent {
    let secret = node
        .and_then(|n| scope.dom.element(n))
        .is_some_and(|el| el.input_type() == "password");
    let length = text.map(|t| t.chars().count()).unwrap_or(0);
    let mut event = SemanticEvent::new(kind, now)
        .with_target(node.and_then(|n| scope.target(n)))
        .field("length", length);
    if let Some(text) = text.filter(|_| !secret) {
        event = event.field("text", truncate_chars(text, scope.policy.max_clipboard_text));
    }
    event
}

/// `Ctrl+S`-style label for a key press.
pub fn combo_label(key: &str, modifiers: &Modifiers) -> String {
    let key = if key.chars().count() == 1 {
        key.to_uppercase()
    } else {
        key.to_string()
    };
    let mut parts: Vec<String> = modifiers.names().into_iter().map(str::to_string).collect();
    if !parts.iter().any(|p| *p == key) {
        parts.push(key);
    }
    parts.join("+")
}

/// Command keys and modifier combos. Plain typing is left to the typing
/// session.
pub fn key(
    scope: Scope<'_>,
    node: Option<NodeId>,
    key: &str,
    modifiers: &Modifiers,
    now: i64,
) -> Option<SemanticEvent> {
    if !COMMAND_KEYS.contains(&key) && !modifiers.is_combo() {
        return None;
    }
    Some(
        SemanticEvent::new(SemanticKind::Key, now)
            .with_target(node.and_then(|n| scope.target(n)))
            .field("key", key)
            .field("modifiers", modifiers.names())
            .field("combo", combo_label(key, modifiers)),
    )
}

pub fn navigation(url: &str, from: Option<&str>, trigger: Option<&str>, now: i64) -> SemanticEvent {
    let (path, hash) = match Url::parse(url) {
        Ok(parsed) => (
            Value::from(parsed.path()),
            Value::from(
                parsed
                    .fragment()
                    .map(|f| format!("#{f}"))
                    .unwrap_or_default(),
            ),
        ),
        Err(err) => {
            debug!(target: "interaction.engine", url, error = %err, "navigation url not parsed");
            (Value::Null, Value::Null)
        }
    };
    SemanticEvent::new(SemanticKind::Navigate, now)
        .field("url", url)
        .field("from", from.map(Value::from).unwrap_or(Value::Null))
        .field("path", path)
        .field("hash", hash)
        .field("trigger", trigger.unwrap_or("navigation"))
}

pub fn unload(url: Option<&str>, now: i64) -> SemanticEvent {
    SemanticEvent::new(SemanticKind::Unload, now)
        .field("url", url.map(Value::from).unwrap_or(Value::Null))
}

pub fn console(level: ConsoleLevel, message: &str, max_len: usize, now: i64) -> SemanticEvent {
    let kind = match level {
        ConsoleLevel::Warn => SemanticKind::ConsoleWarn,
        ConsoleLevel::Error => SemanticKind::ConsoleError,
        ConsoleLevel::Log | ConsoleLevel::Info | ConsoleLevel::Debug => SemanticKind::ConsoleLog,
    };
    let level = serde_json::to_value(level).unwrap_or(Value::Null);
    SemanticEvent::new(kind, now)
        .field("level", level)
        .field("message", truncate_chars(message, max_len))
}

/// A labelled point in the recording. `label` wins over a `label` key in the
/// payload.
pub fn marker(label: &str, payload: Map<String, Value>, now: i64) -> SemanticEvent {
    SemanticEvent::new(SemanticKind::Marker, now)
        .with_payload(payload)
        .field("label", label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::EnginePolicy;
    use pagewire_core_types::{MemoryDom, NodeSpec};
    use selector_synth::SelectorSynthesizer;
    use serde_json::json;

    #[test]
    fn navigation_payload_is_parsed() {
        let event = navigation(
            "https://shop.test/cart?step=2#review",
            Some("https://shop.test/"),
            Some("pushState"),
            9,
        );
        assert_eq!(event.payload_str("path"), Some("/cart"));
        assert_eq!(event.payload_str("hash"), Some("#review"));
        assert_eq!(event.payload_str("trigger"), Some("pushState"));
        assert_eq!(event.payload_str("from"), Some("https://shop.test/"));

        let event = navigation("not a url", None, None, 9);
        assert_eq!(event.payload["path"], Value::Null);
        assert_eq!(event.payload_str("trigger"), Some("navigation"));
    }

    #[test]
    fn only_command_keys_and_combos_are_reported() {
        let dom = MemoryDom::with_body([]);
        let synth = SelectorSynthesizer::default();
        let policy = EnginePolicy::default();
        let scope = Scope { dom: &dom, synth: &synth, policy: &policy };
        let none = Modifiers::default();
        let ctrl = Modifiers { ctrl: true, ..Default::default() };
        let shift = Modifiers { shift: true, ..Default::default() };

        assert!(key(scope, None, "a", &none, 0).is_none());
        assert!(key(scope, None, "A", &shift, 0).is_none());
        assert_eq!(
            key(scope, None, "Enter", &none, 0).unwrap().payload_str("combo"),
            Some("Enter")
        );
        assert_eq!(
            key(scope, None, "s", &ctrl, 0).unwrap().payload_str("combo"),
            Some("Ctrl+S")
        );
    }

    #[test]
    fn clipboard_hides_password_text() {
        let dom = MemoryDom::with_body([
            NodeSpec::new("input").id("pw").attr("type", "password"),
            NodeSpec::new("textarea").id("notes"),
        ]);
        let synth = SelectorSynthesizer::default();
        let policy = EnginePolicy::default();
        let scope = Scope { dom: &dom, synth: &synth, policy: &policy };

        let event = clipboard(scope, SemanticKind::Paste, dom.find("#pw"), Some("hunter2"), 0);
        assert_eq!(event.payload["length"], 7);
        assert!(event.payload.get("text").is_none());

        let long = "x".repeat(300);
        let event = clipboard(scope, SemanticKind::Copy, dom.find("#notes"), Some(&long), 0);
        assert_eq!(event.payload_str("text").map(|t| t.chars().count()), Some(100));
    }

    #[test]
    fn widget_filter_climbs_out_of_shadow_roots() {
        let dom = MemoryDom::with_body([
            NodeSpec::new("pagewire-panel")
                .attr("data-pagewire-widget", "")
                .shadow([NodeSpec::new("button").id("record")]),
            NodeSpec::new("button").id("page"),
        ]);
        let synth = SelectorSynthesizer::default();
        let policy = EnginePolicy::default();
        let scope = Scope { dom: &dom, synth: &synth, policy: &policy };
        let filter = WidgetFilter::new(&policy.ignore_within);

        assert!(filter.contains(scope, dom.find_deep("#record").unwrap()));
        assert!(!filter.contains(scope, dom.find("#page").unwrap()));
    }

    #[test]
    fn marker_keeps_extra_fields() {
        let payload = json!({"step": 3, "label": "ignored"});
        let Value::Object(map) = payload else { unreachable!() };
        let event = marker("checkout", map, 5);
        assert_eq!(event.payload_str("label"), Some("checkout"));
        assert_eq!(event.payload["step"], 3);
    }
}
