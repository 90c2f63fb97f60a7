use pagewire_core_types::{NodeId, SemanticEvent, SemanticKind, TargetInfo};
use selector_synth::is_interactive;

use super::{Scope, Step};
use crate::timers::Timer;

#[derive(Debug)]
struct Hovered {
    node: NodeId,
    target: Option<TargetInfo>,
    since: i64,
}

/// Tracks the element under the pointer.
#[derive(Debug, Default)]
pub struct HoverAggregator {
    current: Option<Hovered>,
}

impl HoverAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current.as_ref().map(|h| h.node)
    }

    pub fn on_over(&mut self, scope: Scope<'_>, node: NodeId, now: i64) -> Step {
        if self.current() == Some(node) {
            return Step::none();
        }
        let mut step = Step::none();
        step.push(self.flush(now));
        let target = scope.target(node);
        step.events.push(
            SemanticEvent::new(SemanticKind::HoverEnter, now).with_target(target.clone()),
        );
        self.current = Some(Hovered {
            node,
            target,
            since: now,
        });
        step.arm = Some((Timer::Dwell(node), now + scope.policy.dwell_threshold_ms));
        step
    }

    /// Leaving anything but the tracked element is a no-op.
    pub fn on_out(&mut self, node: NodeId, now: i64) -> Step {
        if self.current() != Some(node) {
            return Step::none();
        }
        Step {
            cancel: Some(Timer::Dwell(node)),
            events: self.flush(now).into_iter().collect(),
            ..Default::default()
        }
    }

    /// Dwell timer body: reports only if `node` is still hovered.
    pub fn dwell(&self, scope: Scope<'_>, node: NodeId, now: i64) -> Option<SemanticEvent> {
        let hovered = self.current.as_ref().filter(|h| h.node == node)?;
        let interactive = scope
            .dom
            .element(node)
            .map(|el| is_interactive(&el))
            .unwrap_or(false);
        let element = hovered
            .target
            .as_ref()
            .map(|t| t.selector.clone())
            .unwrap_or_else(|| scope.selector(node));
        Some(
            SemanticEvent::new(SemanticKind::HoverDwell, now)
                .with_target(hovered.target.clone())
                .field("duration", now - hovered.since)
                .field("element", element)
                .field("interactive", interactive),
        )
    }

    /// Emits `hover:leave` for the tracked element.
    pub fn flush(&mut self, now: i64) -> Option<SemanticEvent> {
        let hovered = self.current.take()?;
        Some(
            SemanticEvent::new(SemanticKind::HoverLeave, now)
                .with_target(hovered.target)
                .field("dwellTime", now - hovered.since),
        )
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}
