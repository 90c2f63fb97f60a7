use pagewire_core_types::{ElementDesc, NodeId, SemanticEvent, SemanticKind};

use super::Scope;

/// Input types whose `change` event carries the whole value at once.
const DISCRETE_INPUT_TYPES: &[&str] = &[
    "range",
    "color",
    "date",
    "time",
    "datetime",
    "datetime-local",
    "month",
    "week",
    "file",
];

fn select_value(element: &ElementDesc) -> String {
    if element.attr("multiple").is_some() {
        return element.selected.join(", ");
    }
    element
        .value
        .clone()
        .or_else(|| element.selected.first().cloned())
        .unwrap_or_default()
}

/// `input:changed` / `input:checked` for a `change` event. Text-like fields
/// return `None`; their edits arrive through typing sessions.
pub fn change_event(scope: Scope<'_>, node: NodeId, now: i64) -> Option<SemanticEvent> {
    let element = scope.dom.element(node)?;
    let input_type = element.input_type();

    if matches!(input_type.as_str(), "checkbox" | "radio") {
        let checked = element.checked.unwrap_or(false);
        let value = if checked {
            element.attr("value").unwrap_or("on").to_string()
        } else {
            String::new()
        };
        return Some(
            SemanticEvent::new(SemanticKind::Checked, now)
                .with_target(scope.target(node))
                .field("field", scope.selector(node))
                .field("fieldType", input_type)
                .field("checked", checked)
                .field("value", value),
        );
    }

    let (field_type, value) = if element.is("select") {
        ("select".to_string(), select_value(&element))
    } else if input_type == "file" {
        (input_type, element.files.join(", "))
    } else if DISCRETE_INPUT_TYPES.contains(&input_type.as_str()) {
        let value = element.value.clone().unwrap_or_default();
        (input_type, value)
    } else {
        return None;
    };

    Some(
        SemanticEvent::new(SemanticKind::Changed, now)
            .with_target(scope.target(node))
            .field("field", scope.selector(node))
            .field("fieldType", field_type)
            .field("value", value),
    )
}
