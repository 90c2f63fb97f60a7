use pagewire_core_types::{ElementDesc, NodeId, SemanticEvent, SemanticKind, TargetInfo};
use tracing::trace;

use super::{Scope, Step};
use crate::timers::Timer;

const TEXT_INPUT_TYPES: &[&str] = &["text", "email", "password", "search", "tel", "url", "number"];

/// Inputs whose value is typed character by character.
pub fn is_editable(element: &ElementDesc) -> bool {
    if element.content_editable || element.is("textarea") {
        return true;
    }
    element.is("input") && TEXT_INPUT_TYPES.contains(&element.input_type().as_str())
}

fn live_value(element: &ElementDesc) -> String {
    if element.content_editable {
        element.text.clone()
    } else {
        element.value.clone().unwrap_or_default()
    }
}

fn field_type(element: &ElementDesc) -> String {
    if element.content_editable {
        "contenteditable".to_string()
    } else if element.is("textarea") {
        "textarea".to_string()
    } else {
        element.input_type()
    }
}

fn mask(value: &str) -> String {
    "*".repeat(value.chars().count())
}

#[derive(Debug)]
struct Session {
    node: NodeId,
    target: Option<TargetInfo>,
    field: String,
    field_type: String,
    started: i64,
    text: String,
}

/// One open typing session at most.
#[derive(Debug, Default)]
pub struct TypingAggregator {
    session: Option<Session>,
}

impl TypingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn field(&self) -> Option<NodeId> {
        self.session.as_ref().map(|s| s.node)
    }

    /// Feeds one `input` event. Non-editable targets are ignored.
    pub fn on_input(&mut self, scope: Scope<'_>, node: NodeId, now: i64) -> Step {
        let Some(element) = scope.dom.element(node) else {
            return Step::none();
        };
        if !is_editable(&element) {
            return Step::none();
        }
        let mut step = Step::none();
        if self.field() != Some(node) {
            step.push(self.flush(scope, now));
            let target = scope.target(node);
            self.session = Some(Session {
                node,
                field: target
                    .as_ref()
                    .map(|t| t.selector.clone())
                    .unwrap_or_else(|| scope.selector(node)),
                target,
                field_type: field_type(&element),
                started: now,
                text: String::new(),
            });
            trace!(target: "interaction.engine", %node, "typing session opened");
        }
        if let Some(session) = self.session.as_mut() {
            session.text = live_value(&element);
        }
        step.arm = Some((Timer::Typing, now + scope.policy.typing_window_ms));
        step
    }

    /// Closes the open session. The field's value is read again so edits made
    /// after the last input event are reflected.
    pub fn flush(&mut self, scope: Scope<'_>, now: i64) -> Option<SemanticEvent> {
        let session = self.session.take()?;
        let element = scope.dom.element(session.node);
        let final_value = element
            .as_ref()
            .map(live_value)
            .unwrap_or_else(|| session.text.clone());
        let target = scope.target(session.node).or(session.target);
        let duration = now - session.started;

        let kind = if final_value.is_empty() {
            SemanticKind::Cleared
        } else {
            SemanticKind::Typed
        };
        let (text, final_value) = if session.field_type == "password" {
            (mask(&session.text), mask(&final_value))
        } else {
            (session.text, final_value)
        };
        Some(
            SemanticEvent::new(kind, now)
                .with_target(target)
                .field("text", text)
                .field("field", session.field)
                .field("fieldType", session.field_type)
                .field("duration", duration)
                .field("finalValue", final_value),
        )
    }

    pub fn reset(&mut self) {
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::EnginePolicy;
    use pagewire_core_types::{MemoryDom, NodeSpec};
    use selector_synth::SelectorSynthesizer;

    fn form() -> MemoryDom {
        MemoryDom::with_body([NodeSpec::new("form").children([
            NodeSpec::new("input").id("email").attr("type", "email"),
            NodeSpec::new("input").id("pin").attr("type", "password"),
            NodeSpec::new("input").id("agree").attr("type", "checkbox"),
        ])])
    }

    #[test]
    fn rapid_input_collapses_into_one_event() {
        let dom = form();
        let synth = SelectorSynthesizer::default();
        let policy = EnginePolicy::default();
        let scope = Scope { dom: &dom, synth: &synth, policy: &policy };
        let email = dom.find("#email").unwrap();
        let mut typing = TypingAggregator::new();

        for (i, value) in ["a", "ab", "abc"].into_iter().enumerate() {
            dom.set_value(email, value);
            let step = typing.on_input(scope, email, 1_000 + i as i64 * 50);
            assert!(step.events.is_empty());
            assert_eq!(step.arm, Some((Timer::Typing, 1_500 + i as i64 * 50)));
        }
        let event = typing.flush(scope, 1_600).unwrap();
        assert_eq!(event.kind, SemanticKind::Typed);
        assert_eq!(event.payload_str("text"), Some("abc"));
        assert_eq!(event.payload_str("field"), Some("#email"));
        assert_eq!(event.payload_str("fieldType"), Some("email"));
        assert_eq!(event.payload["duration"], 600);
        assert!(typing.flush(scope, 1_700).is_none());
    }

    #[test]
    fn emptied_field_reports_cleared_and_passwords_are_masked() {
        let dom = form();
        let synth = SelectorSynthesizer::default();
        let policy = EnginePolicy::default();
        let scope = Scope { dom: &dom, synth: &synth, policy: &policy };
        let email = dom.find("#email").unwrap();
        let pin = dom.find("#pin").unwrap();
        let mut typing = TypingAggregator::new();

        dom.set_value(email, "x");
        typing.on_input(scope, email, 0);
        dom.set_value(email, "");
        typing.on_input(scope, email, 5);
        let cleared = typing.flush(scope, 10).unwrap();
        assert_eq!(cleared.kind, SemanticKind::Cleared);
        assert_eq!(cleared.payload_str("text"), Some(""));
        assert_eq!(cleared.payload_str("finalValue"), Some(""));
        assert_eq!(cleared.payload_str("field"), Some("#email"));
        assert_eq!(cleared.payload_str("fieldType"), Some("email"));
        assert_eq!(cleared.payload["duration"], 10);

        dom.set_value(pin, "1234");
        typing.on_input(scope, pin, 20);
        let event = typing.flush(scope, 30).unwrap();
        assert_eq!(event.payload_str("text"), Some("****"));
        assert_eq!(event.payload_str("finalValue"), Some("****"));
    }

    #[test]
    fn checkboxes_are_not_typed_into() {
        let dom = form();
        let synth = SelectorSynthesizer::default();
        let policy = EnginePolicy::default();
        let scope = Scope { dom: &dom, synth: &synth, policy: &policy };
        let agree = dom.find("#agree").unwrap();
        let mut typing = TypingAggregator::new();
        let step = typing.on_input(scope, agree, 0);
        assert!(step.arm.is_none());
        assert!(!typing.is_open());
    }
}
