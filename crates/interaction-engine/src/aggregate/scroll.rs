use pagewire_core_types::{SemanticEvent, SemanticKind};
use serde_json::Value;

use super::{round, Scope, Step};
use crate::timers::Timer;

#[derive(Clone, Copy, Debug)]
struct Gesture {
    start_y: f64,
    start_time: i64,
    last_y: f64,
}

/// Collapses a run of scroll ticks into one `scroll:stop`.
#[derive(Debug, Default)]
pub struct ScrollAggregator {
    gesture: Option<Gesture>,
}

impl ScrollAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.gesture.is_some()
    }

    /// Forgets any open gesture.
    pub fn reset(&mut self) {
        self.gesture = None;
    }

    pub fn on_scroll(&mut self, scope: Scope<'_>, y: f64, now: i64) -> Step {
        // The first tick of a gesture is its starting position.
        let gesture = self.gesture.get_or_insert(Gesture {
            start_y: y,
            start_time: now,
            last_y: y,
        });
        gesture.last_y = y;
        Step {
            arm: Some((Timer::Scroll, now + scope.policy.scroll_window_ms)),
            ..Default::default()
        }
    }

    /// Closes the gesture. Short gestures settle silently.
    pub fn flush(&mut self, scope: Scope<'_>, now: i64) -> Option<SemanticEvent> {
        let gesture = self.gesture.take()?;
        let delta = gesture.last_y - gesture.start_y;
        let distance = delta.abs();
        if distance <= scope.policy.scroll_min_distance {
            return None;
        }
        let direction = if delta > 0.0 { "down" } else { "up" };
        Some(
            SemanticEvent::new(SemanticKind::ScrollStop, now)
                .field("to", self.landing(scope, gesture.last_y))
                .field("direction", direction)
                .field("distance", round(distance))
                .field("duration", now - gesture.start_time),
        )
    }

    /// `top`, `bottom`, or the selector of whatever sits in the middle of
    /// the viewport.
    fn landing(&self, scope: Scope<'_>, y: f64) -> Value {
        let viewport = scope.dom.viewport();
        let edge = scope.policy.scroll_edge;
        if y < edge {
            return Value::from("top");
        }
        if y + viewport.height >= viewport.scroll_height - edge {
            return Value::from("bottom");
        }
        let (cx, cy) = viewport.center();
        scope
            .dom
            .element_at(cx, cy)
            .map(|node| Value::from(scope.selector(node)))
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::EnginePolicy;
    use pagewire_core_types::{MemoryDom, NodeSpec, Viewport};
    use selector_synth::SelectorSynthesizer;

    fn long_page() -> MemoryDom {
        let dom = MemoryDom::with_body([
            NodeSpec::new("section").id("pricing").rect(0.0, 0.0, 1280.0, 800.0),
        ]);
        dom.set_viewport(Viewport {
            width: 1280.0,
            height: 800.0,
            scroll_height: 5_000.0,
            ..Default::default()
        });
        dom
    }

    #[test]
    fn ticks_collapse_and_report_the_landing_element() {
        let dom = long_page();
        let synth = SelectorSynthesizer::default();
        let policy = EnginePolicy::default();
        let scope = Scope { dom: &dom, synth: &synth, policy: &policy };
        let mut scroll = ScrollAggregator::new();

        for (i, y) in [120.0, 600.0, 1_200.0].into_iter().enumerate() {
            let step = scroll.on_scroll(scope, y, i as i64 * 40);
            assert_eq!(step.arm, Some((Timer::Scroll, i as i64 * 40 + 150)));
        }
        let event = scroll.flush(scope, 230).unwrap();
        assert_eq!(event.payload_str("to"), Some("#pricing"));
        assert_eq!(event.payload_str("direction"), Some("down"));
        assert_eq!(event.payload["distance"], 1_080);
        assert_eq!(event.payload["duration"], 230);
    }

    #[test]
    fn short_gestures_and_edges() {
        let dom = long_page();
        let synth = SelectorSynthesizer::default();
        let policy = EnginePolicy::default();
        let scope = Scope { dom: &dom, synth: &synth, policy: &policy };
        let mut scroll = ScrollAggregator::new();

        scroll.on_scroll(scope, 1_000.0, 0);
        scroll.on_scroll(scope, 1_040.0, 20);
        assert!(scroll.flush(scope, 170).is_none());

        scroll.on_scroll(scope, 1_040.0, 200);
        scroll.on_scroll(scope, 4_150.0, 220);
        assert_eq!(scroll.flush(scope, 370).unwrap().payload_str("to"), Some("bottom"));

        scroll.on_scroll(scope, 4_150.0, 400);
        scroll.on_scroll(scope, 30.0, 420);
        let event = scroll.flush(scope, 570).unwrap();
        assert_eq!(event.payload_str("to"), Some("top"));
        assert_eq!(event.payload_str("direction"), Some("up"));
    }

    #[test]
    fn a_single_jump_has_no_distance() {
        let dom = long_page();
        let synth = SelectorSynthesizer::default();
        let policy = EnginePolicy::default();
        let scope = Scope { dom: &dom, synth: &synth, policy: &policy };
        let mut scroll = ScrollAggregator::new();

        scroll.on_scroll(scope, 1_000.0, 0);
        assert!(scroll.is_open());
        assert!(scroll.flush(scope, 150).is_none());
        assert!(!scroll.is_open());
    }
}
