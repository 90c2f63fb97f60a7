//! Deterministic scenario replay.
//!
//! The engine runs on a [`ManualClock`]; between steps the clock is moved
//! deadline by deadline so timers fire exactly when they would have in a
//! browser.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use interaction_engine::{
    EngineStats, EnginePorts, InteractionEngine, RawEvent, RecordingEventSource, Subscription,
};
use mutation_filter::{
    Framework, MutationNode, MutationRecord, MutationWatchRequest, RecordingMutationSource,
};
use pagewire_core_types::{
    Clock, DomPort, ManualClock, MemoryDom, NodeId, ParentRef, SemanticEvent, SinkMessage,
};
use pagewire_event_bus::CollectingSink;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PagewireConfig;
use crate::scenario::{resolve_node, resolve_nodes, Action, Scenario, ScenarioError, Step};

#[derive(Clone, Debug, Default)]
pub struct ReplayOptions {
    pub settle_ms: i64,
    pub stop_at_end: bool,
    /// Replaces the scenario's own subscription.
    pub subscription: Option<Subscription>,
}

impl ReplayOptions {
    pub fn from_config(config: &PagewireConfig) -> Self {
        Self {
            settle_ms: config.replay.settle_ms as i64,
            stop_at_end: config.replay.stop_at_end,
            subscription: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub scenario: String,
    pub steps: usize,
    /// Scenario time covered, settle period included.
    pub elapsed_ms: i64,
    pub listeners: usize,
    pub frameworks: Vec<Framework>,
    /// Everything the sink received, in order.
    pub messages: Vec<SinkMessage>,
    pub buffer: Vec<SemanticEvent>,
    pub stats: EngineStats,
}

impl ReplayReport {
    pub fn semantic_events(&self) -> impl Iterator<Item = &SemanticEvent> {
        self.messages.iter().filter_map(SinkMessage::as_semantic)
    }
}

pub fn replay(
    scenario: &Scenario,
    config: &PagewireConfig,
    options: &ReplayOptions,
) -> Result<ReplayReport, ScenarioError> {
    let mut session = Session::new(scenario, config);
    let subscription = match &options.subscription {
        Some(subscription) => subscription.clone(),
        None => scenario.subscription()?,
    };
    info!(
        target: "pagewire.replay",
        scenario = scenario.display_name(),
        steps = scenario.steps.len(),
        ?subscription,
        "replay.started"
    );
    session.engine.start(subscription);
    if let Some(request) = &scenario.watch {
        session.watch(request.clone());
    }

    for (index, step) in scenario.steps.iter().enumerate() {
        session.advance_to(scenario.start_ms + step.at);
        session.apply(index, step)?;
    }
    let end = scenario.start_ms + scenario.duration() + options.settle_ms.max(0);
    session.advance_to(end);
    if options.stop_at_end {
        session.engine.stop();
    }

    let report = ReplayReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        scenario: scenario.display_name().to_string(),
        steps: scenario.steps.len(),
        elapsed_ms: end - scenario.start_ms,
        listeners: session.events.active_count(),
        frameworks: session.frameworks,
        messages: session.sink.take(),
        buffer: session.engine.buffer(None, None),
        stats: session.engine.stats(),
    };
    info!(
        target: "pagewire.replay",
        run_id = %report.run_id,
        raw = report.stats.raw.total,
        semantic = report.stats.semantic.total,
        noise_reduction = report.stats.noise_reduction,
        "replay.finished"
    );
    Ok(report)
}

struct Session<'a> {
    scenario: &'a Scenario,
    dom: Arc<MemoryDom>,
    clock: Arc<ManualClock>,
    sink: Arc<CollectingSink>,
    events: Arc<RecordingEventSource>,
    engine: InteractionEngine,
    frameworks: Vec<Framework>,
}

impl<'a> Session<'a> {
    fn new(scenario: &'a Scenario, config: &PagewireConfig) -> Self {
        let dom = Arc::new(scenario.build_dom());
        let clock = Arc::new(ManualClock::new(scenario.start_ms));
        let sink = CollectingSink::new();
        let events = Arc::new(RecordingEventSource::new());
        let mut engine = InteractionEngine::with_watch_defaults(
            EnginePorts {
                dom: dom.clone(),
                events: events.clone(),
                mutations: Arc::new(RecordingMutationSource::new()),
                sink: sink.clone(),
                clock: clock.clone(),
            },
            config.engine.clone(),
            config.watch.clone(),
        );
        if let Some(url) = &scenario.url {
            engine.set_current_url(url.clone());
        }
        Self {
            scenario,
            dom,
            clock,
            sink,
            events,
            engine,
            frameworks: Vec::new(),
        }
    }

    /// Moves the clock to `target`, stopping at every deadline on the way.
    fn advance_to(&mut self, target: i64) {
        while let Some(deadline) = self.engine.next_deadline() {
            if deadline > target {
                break;
            }
            if deadline > self.clock.now_ms() {
                self.clock.set(deadline);
            }
            if self.engine.poll_timers() == 0 {
                break;
            }
        }
        if target > self.clock.now_ms() {
            self.clock.set(target);
        }
    }

    fn watch(&mut self, request: MutationWatchRequest) {
        match self.engine.watch_mutations(request) {
            Ok(info) => self.frameworks = info.frameworks,
            Err(err) => {
                warn!(target: "pagewire.replay", error = %err, "watch request failed; continuing");
            }
        }
    }

    fn node(&self, selector: &str) -> Result<NodeId, ScenarioError> {
        resolve_node(&self.dom, selector)
    }

    fn record(&mut self, record: MutationRecord) {
        if self.scenario.auto_mutations {
            self.engine.handle_mutations(vec![record]);
        }
    }

    fn apply(&mut self, index: usize, step: &Step) -> Result<(), ScenarioError> {
        debug!(
            target: "pagewire.replay",
            index,
            at = step.at,
            action = step.action.name(),
            "replay.step"
        );
        match &step.action {
            Action::Raw { event } => {
                let mut event = event.clone();
                resolve_nodes(&mut event, &self.dom)?;
                let raw: RawEvent =
                    serde_json::from_value(event).map_err(|source| ScenarioError::Payload {
                        index,
                        what: "raw event",
                        source,
                    })?;
                self.engine.handle(raw);
            }
            Action::Type { target, value } => {
                let node = self.node(target)?;
                self.dom.set_value(node, value.clone());
                self.engine.handle(RawEvent::Input { target: node });
            }
            Action::Scroll { y } => {
                self.dom.set_scroll_y(*y);
                self.engine.handle(RawEvent::Scroll { scroll_y: Some(*y) });
            }
            Action::SetValue { target, value } => {
                let node = self.node(target)?;
                self.dom.set_value(node, value.clone());
            }
            Action::SetChecked { target, checked } => {
                let node = self.node(target)?;
                self.dom.set_checked(node, *checked);
            }
            Action::SetScrollY { y } => self.dom.set_scroll_y(*y),
            Action::SetAttribute {
                target,
                name,
                value,
            } => {
                let node = self.node(target)?;
                let old_value = self.attribute(node, name);
                self.dom.set_attribute(node, name, value);
                self.record(MutationRecord::Attributes {
                    target: node,
                    attribute_name: name.clone(),
                    old_value,
                    new_value: Some(value.clone()),
                });
            }
            Action::RemoveAttribute { target, name } => {
                let node = self.node(target)?;
                let old_value = self.attribute(node, name);
                self.dom.remove_attribute(node, name);
                self.record(MutationRecord::Attributes {
                    target: node,
                    attribute_name: name.clone(),
                    old_value,
                    new_value: None,
                });
            }
            Action::SetText { target, text } => {
                let node = self.node(target)?;
                let old_value = self.dom.element(node).map(|el| el.text);
                self.dom.set_text(node, text.clone());
                self.record(MutationRecord::CharacterData {
                    target: node,
                    parent: None,
                    old_value,
                    new_value: Some(text.clone()),
                });
            }
            Action::Append { parent, node } => {
                let parent = self.node(parent)?;
                let added = self.dom.append(parent, node.clone())?;
                self.record(MutationRecord::ChildList {
                    target: parent,
                    added: vec![MutationNode::live(added)],
                    removed: Vec::new(),
                });
            }
            Action::Remove { target } => {
                let node = self.node(target)?;
                let parent = match self.dom.parent(node) {
                    Some(ParentRef::Element(parent)) => Some(parent),
                    Some(ParentRef::ShadowRoot { root, .. }) => Some(root),
                    None => None,
                };
                if let (Some(parent), Some(desc)) = (parent, self.dom.remove(node)) {
                    self.record(MutationRecord::ChildList {
                        target: parent,
                        added: Vec::new(),
                        removed: vec![MutationNode::detached(node, desc)],
                    });
                }
            }
            Action::Mutations { records } => {
                let mut records = Value::Array(records.clone());
                resolve_nodes(&mut records, &self.dom)?;
                let records: Vec<MutationRecord> =
                    serde_json::from_value(records).map_err(|source| ScenarioError::Payload {
                        index,
                        what: "mutation records",
                        source,
                    })?;
                self.engine.handle_mutations(records);
            }
            Action::Mark { label, payload } => self.engine.mark(label, payload.clone()),
            Action::Watch { request } => self.watch(request.clone()),
            Action::Unwatch => self.engine.unwatch_mutations(),
            Action::Start { subscription } => {
                let subscription = match subscription {
                    Some(spec) => spec.resolve()?,
                    None => self.scenario.subscription()?,
                };
                self.engine.start(subscription);
            }
            Action::Stop => self.engine.stop(),
        }
        Ok(())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom
            .element(node)
            .and_then(|el| el.attr(name).map(str::to_string))
    }
}
