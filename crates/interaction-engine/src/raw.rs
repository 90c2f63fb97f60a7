//! Raw events as the page's listeners report them.

use pagewire_core_types::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl, Alt or Meta held. Shift alone only changes the character.
    pub fn is_combo(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.ctrl {
            out.push("Ctrl");
        }
        if self.alt {
            out.push("Alt");
        }
        if self.shift {
            out.push("Shift");
        }
        if self.meta {
            out.push("Meta");
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Debug,
    Warn,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RawEvent {
    #[serde(rename = "click")]
    Click {
        target: NodeId,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    #[serde(rename = "mousedown")]
    MouseDown {
        target: NodeId,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    #[serde(rename = "mouseup")]
    MouseUp {
        target: NodeId,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    #[serde(rename = "mouseover")]
    MouseOver { target: NodeId },
    #[serde(rename = "mouseout")]
    MouseOut { target: NodeId },
    #[serde(rename = "input")]
    Input { target: NodeId },
    #[serde(rename = "change")]
    Change { target: NodeId },
    /// `scrollY` after the tick; read from the viewport when absent.
    #[serde(rename = "scroll", rename_all = "camelCase")]
    Scroll {
        #[serde(default)]
        scroll_y: Option<f64>,
    },
    #[serde(rename = "focusin")]
    FocusIn { target: NodeId },
    #[serde(rename = "focusout")]
    FocusOut { target: NodeId },
    #[serde(rename = "submit")]
    Submit { target: NodeId },
    #[serde(rename = "keydown")]
    KeyDown {
        #[serde(default)]
        target: Option<NodeId>,
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    #[serde(rename = "copy")]
    Copy {
        #[serde(default)]
        target: Option<NodeId>,
        #[serde(default)]
        text: Option<String>,
    },
    #[serde(rename = "cut")]
    Cut {
        #[serde(default)]
        target: Option<NodeId>,
        #[serde(default)]
        text: Option<String>,
    },
    #[serde(rename = "paste")]
    Paste {
        #[serde(default)]
        target: Option<NodeId>,
        #[serde(default)]
        text: Option<String>,
    },
    /// History or full-page navigation observed by the page script.
    /// `popstate` and `hashchange` listeners report the same shape.
    #[serde(rename = "navigation", alias = "popstate", alias = "hashchange")]
    Navigation {
        #[serde(alias = "newURL")]
        url: String,
        #[serde(default, alias = "oldURL")]
        from: Option<String>,
        #[serde(default)]
        trigger: Option<String>,
    },
    #[serde(rename = "beforeunload")]
    Unload,
    #[serde(rename = "console")]
    Console { level: ConsoleLevel, message: String },
    #[serde(other)]
    Unknown,
}

impl RawEvent {
    /// DOM event name used for raw counters and listener registration.
    pub fn name(&self) -> &'static str {
        match self {
            RawEvent::Click { .. } => "click",
            RawEvent::MouseDown { .. } => "mousedown",
            RawEvent::MouseUp { .. } => "mouseup",
            RawEvent::MouseOver { .. } => "mouseover",
            RawEvent::MouseOut { .. } => "mouseout",
            RawEvent::Input { .. } => "input",
            RawEvent::Change { .. } => "change",
            RawEvent::Scroll { .. } => "scroll",
            RawEvent::FocusIn { .. } => "focusin",
            RawEvent::FocusOut { .. } => "focusout",
            RawEvent::Submit { .. } => "submit",
            RawEvent::KeyDown { .. } => "keydown",
            RawEvent::Copy { .. } => "copy",
            RawEvent::Cut { .. } => "cut",
            RawEvent::Paste { .. } => "paste",
            RawEvent::Navigation { .. } => "navigation",
            RawEvent::Unload => "beforeunload",
            RawEvent::Console { .. } => "console",
            RawEvent::Unknown => "unknown",
        }
    }

    pub fn target(&self) -> Option<NodeId> {
        match self {
            RawEvent::Click { target, .. }
            | RawEvent::MouseDown { target, .. }
            | RawEvent::MouseUp { target, .. }
            | RawEvent::MouseOver { target }
            | RawEvent::MouseOut { target }
            | RawEvent::Input { target }
            | RawEvent::Change { target }
            | RawEvent::FocusIn { target }
            | RawEvent::FocusOut { target }
            | RawEvent::Submit { target } => Some(*target),
            RawEvent::KeyDown { target, .. }
            | RawEvent::Copy { target, .. }
            | RawEvent::Cut { target, .. }
            | RawEvent::Paste { target, .. } => *target,
            RawEvent::Scroll { .. }
            | RawEvent::Navigation { .. }
            | RawEvent::Unload
            | RawEvent::Console { .. }
            | RawEvent::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listener_shapes_decode() {
        let events: Vec<RawEvent> = serde_json::from_value(json!([
            {"type": "input", "target": 8},
            {"type": "keydown", "key": "s", "modifiers": {"ctrl": true}},
            {"type": "scroll", "scrollY": 420.0},
            {"type": "beforeunload"},
            {"type": "pointerrawupdate", "target": 3}
        ]))
        .unwrap();
        assert_eq!(events[0], RawEvent::Input { target: NodeId(8) });
        assert!(matches!(
            &events[1],
            RawEvent::KeyDown { target: None, key, modifiers } if key == "s" && modifiers.is_combo()
        ));
        assert_eq!(events[2], RawEvent::Scroll { scroll_y: Some(420.0) });
        assert_eq!(events[3], RawEvent::Unload);
        assert_eq!(events[4], RawEvent::Unknown);
        assert_eq!(events[4].name(), "unknown");
    }

    #[test]
    fn history_listeners_decode_as_navigation() {
        let events: Vec<RawEvent> = serde_json::from_value(json!([
            {"type": "popstate", "url": "https://shop.example/cart"},
            {"type": "hashchange", "newURL": "https://shop.example/cart#billing",
             "oldURL": "https://shop.example/cart"}
        ]))
        .unwrap();
        assert!(matches!(
            &events[0],
            RawEvent::Navigation { url, from: None, .. } if url == "https://shop.example/cart"
        ));
        assert!(matches!(
            &events[1],
            RawEvent::Navigation { url, from: Some(from), .. }
                if url.ends_with("#billing") && from == "https://shop.example/cart"
        ));
        assert_eq!(events[1].name(), "navigation");
    }
}
