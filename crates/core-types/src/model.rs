//! Wire payloads produced by the engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Interaction,
    Navigation,
    Input,
    Hover,
    Scroll,
    Mutation,
    Console,
    Focus,
    Recording,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Interaction,
        Category::Navigation,
        Category::Input,
        Category::Hover,
        Category::Scroll,
        Category::Mutation,
        Category::Console,
        Category::Focus,
        Category::Recording,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Interaction => "interaction",
            Category::Navigation => "navigation",
            Category::Input => "input",
            Category::Hover => "hover",
            Category::Scroll => "scroll",
            Category::Mutation => "mutation",
            Category::Console => "console",
            Category::Focus => "focus",
            Category::Recording => "recording",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Every semantic event type the engine can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticKind {
    #[serde(rename = "interaction:click")]
    Click,
    #[serde(rename = "interaction:drag")]
    Drag,
    #[serde(rename = "interaction:key")]
    Key,
    #[serde(rename = "interaction:submit")]
    Submit,
    #[serde(rename = "input:typed")]
    Typed,
    #[serde(rename = "input:cleared")]
    Cleared,
    #[serde(rename = "input:changed")]
    Changed,
    #[serde(rename = "input:checked")]
    Checked,
    #[serde(rename = "input:copy")]
    Copy,
    #[serde(rename = "input:cut")]
    Cut,
    #[serde(rename = "input:paste")]
    Paste,
    #[serde(rename = "hover:enter")]
    HoverEnter,
    #[serde(rename = "hover:leave")]
    HoverLeave,
    #[serde(rename = "hover:dwell")]
    HoverDwell,
    #[serde(rename = "scroll:stop")]
    ScrollStop,
    #[serde(rename = "focus:in")]
    FocusIn,
    #[serde(rename = "focus:out")]
    FocusOut,
    #[serde(rename = "navigation:navigate")]
    Navigate,
    #[serde(rename = "navigation:unload")]
    Unload,
    #[serde(rename = "console:log")]
    ConsoleLog,
    #[serde(rename = "console:warn")]
    ConsoleWarn,
    #[serde(rename = "console:error")]
    ConsoleError,
    #[serde(rename = "recording:marker")]
    Marker,
}

impl SemanticKind {
    pub fn category(self) -> Category {
        match self {
            SemanticKind::Click | SemanticKind::Drag | SemanticKind::Key | SemanticKind::Submit => {
                Category::Interaction
            }
            SemanticKind::Typed
            | SemanticKind::Cleared
            | SemanticKind::Changed
            | SemanticKind::Checked
            | SemanticKind::Copy
            | SemanticKind::Cut
            | SemanticKind::Paste => Category::Input,
            SemanticKind::HoverEnter | SemanticKind::HoverLeave | SemanticKind::HoverDwell => {
                Category::Hover
            }
            SemanticKind::ScrollStop => Category::Scroll,
            SemanticKind::FocusIn | SemanticKind::FocusOut => Category::Focus,
            SemanticKind::Navigate | SemanticKind::Unload => Category::Navigation,
            SemanticKind::ConsoleLog | SemanticKind::ConsoleWarn | SemanticKind::ConsoleError => {
                Category::Console
            }
            SemanticKind::Marker => Category::Recording,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SemanticKind::Click => "interaction:click",
            SemanticKind::Drag => "interaction:drag",
            SemanticKind::Key => "interaction:key",
            SemanticKind::Submit => "interaction:submit",
            SemanticKind::Typed => "input:typed",
            SemanticKind::Cleared => "input:cleared",
            SemanticKind::Changed => "input:changed",
            SemanticKind::Checked => "input:checked",
            SemanticKind::Copy => "input:copy",
            SemanticKind::Cut => "input:cut",
            SemanticKind::Paste => "input:paste",
            SemanticKind::HoverEnter => "hover:enter",
            SemanticKind::HoverLeave => "hover:leave",
            SemanticKind::HoverDwell => "hover:dwell",
            SemanticKind::ScrollStop => "scroll:stop",
            SemanticKind::FocusIn => "focus:in",
            SemanticKind::FocusOut => "focus:out",
            SemanticKind::Navigate => "navigation:navigate",
            SemanticKind::Unload => "navigation:unload",
            SemanticKind::ConsoleLog => "console:log",
            SemanticKind::ConsoleWarn => "console:warn",
            SemanticKind::ConsoleError => "console:error",
            SemanticKind::Marker => "recording:marker",
        }
    }
}

impl fmt::Display for SemanticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the element an event happened on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub selector: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemanticEvent {
    #[serde(rename = "type")]
    pub kind: SemanticKind,
    pub timestamp: i64,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetInfo>,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl SemanticEvent {
    pub fn new(kind: SemanticKind, timestamp: i64) -> Self {
        Self {
            kind,
            timestamp,
            category: kind.category(),
            target: None,
            payload: Map::new(),
        }
    }

    pub fn with_target(mut self, target: Option<TargetInfo>) -> Self {
        self.target = target;
        self
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload.extend(payload);
        self
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSummary {
    pub added: u64,
    pub removed: u64,
    pub attribute_changes: u64,
    pub text_changes: u64,
}

impl MutationSummary {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.attribute_changes == 0 && self.text_changes == 0
    }

    pub fn total(&self) -> u64 {
        self.added + self.removed + self.attribute_changes + self.text_changes
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Added,
    Removed,
    Attribute,
    Text,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotableMutation {
    #[serde(rename = "type")]
    pub kind: MutationKind,
    pub selector: String,
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationBatch {
    pub timestamp: i64,
    pub count: u64,
    pub summary: MutationSummary,
    pub notable: Vec<NotableMutation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored: Option<u64>,
}

/// Out-of-band notification for the transport, e.g. a watch that could not
/// start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineNotice {
    pub code: String,
    pub message: String,
}

impl EngineNotice {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Envelope handed to the transport sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SinkMessage {
    Semantic(SemanticEvent),
    Mutations(MutationBatch),
    Error(EngineNotice),
}

impl SinkMessage {
    pub fn as_semantic(&self) -> Option<&SemanticEvent> {
        match self {
            SinkMessage::Semantic(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_batch(&self) -> Option<&MutationBatch> {
        match self {
            SinkMessage::Mutations(batch) => Some(batch),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&EngineNotice> {
        match self {
            SinkMessage::Error(notice) => Some(notice),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn semantic_event_wire_shape() {
        let event = SemanticEvent::new(SemanticKind::Typed, 42)
            .with_target(Some(TargetInfo {
                selector: "#email".into(),
                tag: "input".into(),
                id: Some("email".into()),
                ..Default::default()
            }))
            .field("text", "abc");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "input:typed",
                "timestamp": 42,
                "category": "input",
                "target": {"selector": "#email", "tag": "input", "id": "email"},
                "payload": {"text": "abc"}
            })
        );
        let back: SemanticEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn kind_category_and_name_agree_with_serde() {
        for kind in [
            SemanticKind::Click,
            SemanticKind::HoverDwell,
            SemanticKind::ScrollStop,
            SemanticKind::Marker,
            SemanticKind::ConsoleError,
        ] {
            let rendered = serde_json::to_value(kind).unwrap();
            assert_eq!(rendered, json!(kind.as_str()));
            let prefix = kind.as_str().split(':').next().unwrap();
            assert_eq!(prefix, kind.category().as_str());
        }
    }

    #[test]
    fn sink_message_is_adjacently_tagged() {
        let batch = MutationBatch {
            timestamp: 1,
            count: 2,
            summary: MutationSummary {
                added: 1,
                ..Default::default()
            },
            notable: vec![],
            ignored: None,
        };
        let value = serde_json::to_value(SinkMessage::Mutations(batch)).unwrap();
        assert_eq!(value["kind"], "mutations");
        assert_eq!(value["data"]["summary"]["attributeChanges"], 0);
        assert!(value["data"].get("ignored").is_none());
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Hover".parse::<Category>(), Ok(Category::Hover));
        assert!("bogus".parse::<Category>().is_err());
    }
}
