use pagewire_core_types::{NodeId, SemanticEvent, SemanticKind};

use super::{round, Scope};

#[derive(Clone, Copy, Debug)]
struct Press {
    node: NodeId,
    x: f64,
    y: f64,
    at: i64,
}

/// Pairs mousedown/mouseup into drags.
#[derive(Debug, Default)]
pub struct DragAggregator {
    press: Option<Press>,
}

fn direction(dx: f64, dy: f64) -> &'static str {
    if dx == 0.0 && dy == 0.0 {
        "none"
    } else if dx.abs() >= dy.abs() {
        if dx > 0.0 {
            "right"
        } else {
            "left"
        }
    } else if dy > 0.0 {
        "down"
    } else {
        "up"
    }
}

impl DragAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_down(&mut self, node: NodeId, x: f64, y: f64, now: i64) {
        self.press = Some(Press { node, x, y, at: now });
    }

    /// A press becomes a drag when it travelled or lasted past the
    /// thresholds; anything shorter is left to the click handler.
    pub fn on_up(&mut self, scope: Scope<'_>, x: f64, y: f64, now: i64) -> Option<SemanticEvent> {
        let press = self.press.take()?;
        let (dx, dy) = (x - press.x, y - press.y);
        let distance = dx.hypot(dy);
        let duration = now - press.at;
        let policy = scope.policy;
        if distance <= policy.drag_min_distance && duration <= policy.drag_min_duration_ms {
            return None;
        }
        Some(
            SemanticEvent::new(SemanticKind::Drag, now)
                .with_target(scope.target(press.node))
                .field("direction", direction(dx, dy))
                .field("distance", round(distance))
                .field("duration", duration)
                .field("startX", press.x)
                .field("startY", press.y)
                .field("endX", x)
                .field("endY", y),
        )
    }

    pub fn reset(&mut self) {
        self.press = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::EnginePolicy;
    use pagewire_core_types::{MemoryDom, NodeSpec};
    use selector_synth::SelectorSynthesizer;

    #[test]
    fn thresholds_separate_clicks_from_drags() {
        let dom = MemoryDom::with_body([NodeSpec::new("div").id("slider")]);
        let synth = SelectorSynthesizer::default();
        let policy = EnginePolicy::default();
        let scope = Scope { dom: &dom, synth: &synth, policy: &policy };
        let slider = dom.find("#slider").unwrap();
        let mut drag = DragAggregator::new();

        drag.on_down(slider, 100.0, 100.0, 0);
        assert!(drag.on_up(scope, 106.0, 108.0, 200).is_none());

        drag.on_down(slider, 100.0, 100.0, 1_000);
        let event = drag.on_up(scope, 100.0, 89.0, 1_050).unwrap();
        assert_eq!(event.payload_str("direction"), Some("up"));
        assert_eq!(event.payload["distance"], 11);

        drag.on_down(slider, 5.0, 5.0, 2_000);
        let event = drag.on_up(scope, 5.0, 5.0, 2_201).unwrap();
        assert_eq!(event.payload_str("direction"), Some("none"));

        assert!(drag.on_up(scope, 0.0, 0.0, 3_000).is_none());
    }

    #[test]
    fn dominant_axis_wins() {
        assert_eq!(direction(30.0, -10.0), "right");
        assert_eq!(direction(-30.0, 29.0), "left");
        assert_eq!(direction(3.0, 40.0), "down");
    }
}
