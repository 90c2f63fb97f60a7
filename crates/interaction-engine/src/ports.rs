use std::fmt;

use parking_lot::Mutex;
use pagewire_core_types::NodeId;
use serde::{Deserialize, Serialize};

/// DOM events the engine listens to while enabled.
pub const LISTENED_EVENTS: &[&str] = &[
    "click",
    "mousedown",
    "mouseup",
    "mouseover",
    "mouseout",
    "input",
    "change",
    "scroll",
    "focusin",
    "focusout",
    "submit",
    "keydown",
    "copy",
    "cut",
    "paste",
    "popstate",
    "hashchange",
    "beforeunload",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerScope {
    #[default]
    Document,
    Window,
    Node(NodeId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerSpec {
    pub event: String,
    pub scope: ListenerScope,
    pub capture: bool,
    pub passive: bool,
}

impl ListenerSpec {
    /// Capture-phase document listener; scroll and navigation go on the
    /// window, scroll passively.
    pub fn for_event(event: &str) -> Self {
        let scope = match event {
            "scroll" | "popstate" | "hashchange" | "beforeunload" => ListenerScope::Window,
            _ => ListenerScope::Document,
        };
        Self {
            event: event.to_string(),
            scope,
            capture: scope == ListenerScope::Document,
            passive: matches!(event, "scroll" | "mouseover" | "mouseout"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener:{}", self.0)
    }
}

/// Where raw events come from. The source decides how registered listeners
/// reach [`crate::InteractionEngine::handle`].
pub trait EventSource: Send + Sync {
    fn register(&self, spec: ListenerSpec) -> ListenerId;
    fn unregister(&self, id: ListenerId);
}

/// Source that only records registrations. Used when events are fed in by
/// hand (tests, scenario replay).
#[derive(Debug, Default)]
pub struct RecordingEventSource {
    state: Mutex<Registrations>,
}

#[derive(Debug, Default)]
struct Registrations {
    next: u64,
    active: Vec<(ListenerId, ListenerSpec)>,
    total_registered: u64,
}

impl RecordingEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Vec<ListenerSpec> {
        self.state
            .lock()
            .active
            .iter()
            .map(|(_, spec)| spec.clone())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    /// Registrations ever made, including ones since removed.
    pub fn total_registered(&self) -> u64 {
        self.state.lock().total_registered
    }
}

impl EventSource for RecordingEventSource {
    fn register(&self, spec: ListenerSpec) -> ListenerId {
        let mut state = self.state.lock();
        state.next += 1;
        state.total_registered += 1;
        let id = ListenerId(state.next);
        state.active.push((id, spec));
        id
    }

    fn unregister(&self, id: ListenerId) {
        self.state.lock().active.retain(|(active, _)| *active != id);
    }
}
