//! Stateful aggregation: bursts of raw events collapse into one semantic
//! event when the burst is displaced by another one or goes quiet.
//!
//! Aggregators never touch the sink or the timer table themselves. They hand
//! back a [`Step`] and the engine applies it.

pub mod change;
pub mod drag;
pub mod hover;
pub mod scroll;
pub mod typing;

use pagewire_core_types::{DomPort, NodeId, SemanticEvent, TargetInfo};
use selector_synth::{target_info, SelectorSynthesizer};

use crate::policy::EnginePolicy;
use crate::timers::Timer;

pub use change::change_event;
pub use drag::DragAggregator;
pub use hover::HoverAggregator;
pub use scroll::ScrollAggregator;
pub use typing::{is_editable, TypingAggregator};

/// Read-only context shared by every handler.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub dom: &'a dyn DomPort,
    pub synth: &'a SelectorSynthesizer,
    pub policy: &'a EnginePolicy,
}

impl<'a> Scope<'a> {
    pub fn target(&self, node: NodeId) -> Option<TargetInfo> {
        target_info(self.dom, node, self.synth)
    }

    pub fn selector(&self, node: NodeId) -> String {
        self.synth.best_selector(self.dom, node)
    }
}

/// What a handler wants done, applied in field order: cancel, arm, emit.
#[derive(Debug, Default)]
pub struct Step {
    pub cancel: Option<Timer>,
    pub arm: Option<(Timer, i64)>,
    pub events: Vec<SemanticEvent>,
}

impl Step {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(event: SemanticEvent) -> Self {
        Self {
            events: vec![event],
            ..Default::default()
        }
    }

    pub fn push(&mut self, event: Option<SemanticEvent>) {
        self.events.extend(event);
    }
}

/// Rounds a measurement for payloads.
pub(crate) fn round(value: f64) -> i64 {
    value.round() as i64
}
