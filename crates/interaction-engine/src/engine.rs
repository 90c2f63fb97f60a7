use std::fmt;
use std::sync::Arc;

use mutation_filter::{
    FilterError, MutationRecord, MutationSource, MutationWatchRequest, MutationWatcher,
    WatchDefaults, WatchInfo,
};
use pagewire_core_types::{
    Category, Clock, DomPort, EngineNotice, NodeId, SemanticEvent, SemanticKind, SinkMessage,
};
use pagewire_event_bus::EventSink;
use selector_synth::SelectorSynthesizer;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::aggregate::{
    change_event, DragAggregator, HoverAggregator, Scope, ScrollAggregator, Step,
    TypingAggregator,
};
use crate::classify::{self, WidgetFilter};
use crate::emitter::{Emitter, Reader, ReaderId};
use crate::events;
use crate::metrics::{EngineStats, NoiseMetrics};
use crate::policy::EnginePolicy;
use crate::ports::{EventSource, ListenerId, ListenerSpec, LISTENED_EVENTS};
use crate::raw::RawEvent;
use crate::subscription::Subscription;
use crate::timers::{Timer, TimerTable};

/// Capabilities the engine is wired to.
#[derive(Clone)]
pub struct EnginePorts {
    pub dom: Arc<dyn DomPort>,
    pub events: Arc<dyn EventSource>,
    pub mutations: Arc<dyn MutationSource>,
    pub sink: Arc<dyn EventSink>,
    pub clock: Arc<dyn Clock>,
}

/// Turns raw page events and mutation records into semantic events.
///
/// The engine is a plain state machine: every method runs to completion
/// synchronously, and time only moves when the host calls
/// [`InteractionEngine::poll_timers`] at or after
/// [`InteractionEngine::next_deadline`].
pub struct InteractionEngine {
    policy: EnginePolicy,
    dom: Arc<dyn DomPort>,
    source: Arc<dyn EventSource>,
    mutations: Arc<dyn MutationSource>,
    clock: Arc<dyn Clock>,
    synth: SelectorSynthesizer,
    widget: WidgetFilter,
    enabled: bool,
    listeners: Vec<ListenerId>,
    timers: TimerTable,
    typing: TypingAggregator,
    scroll: ScrollAggregator,
    hover: HoverAggregator,
    drag: DragAggregator,
    emitter: Emitter,
    metrics: NoiseMetrics,
    watcher: MutationWatcher,
    current_url: Option<String>,
}

impl fmt::Debug for InteractionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionEngine")
            .field("enabled", &self.enabled)
            .field("listeners", &self.listeners.len())
            .field("emitter", &self.emitter)
            .field("watching", &self.watcher.is_active())
            .finish()
    }
}

impl InteractionEngine {
    pub fn new(ports: EnginePorts, policy: EnginePolicy) -> Self {
        Self::with_watch_defaults(ports, policy, WatchDefaults::default())
    }

    pub fn with_watch_defaults(
        ports: EnginePorts,
        policy: EnginePolicy,
        watch: WatchDefaults,
    ) -> Self {
        Self {
            widget: WidgetFilter::new(&policy.ignore_within),
            emitter: Emitter::new(ports.sink, policy.buffer_capacity),
            policy,
            dom: ports.dom,
            source: ports.events,
            mutations: ports.mutations,
            clock: ports.clock,
            synth: SelectorSynthesizer::default(),
            enabled: false,
            listeners: Vec::new(),
            timers: TimerTable::new(),
            typing: TypingAggregator::new(),
            scroll: ScrollAggregator::new(),
            hover: HoverAggregator::new(),
            drag: DragAggregator::new(),
            metrics: NoiseMetrics::new(),
            watcher: MutationWatcher::new(watch),
            current_url: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.emitter.subscription()
    }

    pub fn watcher(&self) -> &MutationWatcher {
        &self.watcher
    }

    /// Engine clock reading in milliseconds.
    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Page URL used for `from`/`url` when raw events leave it out.
    pub fn set_current_url(&mut self, url: impl Into<String>) {
        self.current_url = Some(url.into());
    }

    /// Enables the engine, or swaps the subscription of a running one.
    /// Metrics restart from zero either way; listeners are registered once.
    pub fn start(&mut self, subscription: Subscription) {
        let now = self.clock.now_ms();
        let restarted = self.enabled;
        self.metrics.reset(now);
        self.watcher.reset_stats();
        self.emitter.set_subscription(Some(subscription));
        if self.listeners.is_empty() {
            self.listeners = LISTENED_EVENTS
                .iter()
                .map(|event| self.source.register(ListenerSpec::for_event(event)))
                .collect();
        }
        if !restarted {
            self.scroll.reset();
        }
        self.enabled = true;
        if let Some(subscription) = self.emitter.subscription() {
            events::emit_started(subscription, self.listeners.len(), restarted);
        }
    }

    /// Flushes open typing, scroll and hover state, cancels timers and
    /// unregisters listeners. The mutation watch is left running.
    pub fn stop(&mut self) {
        if !self.enabled {
            return;
        }
        let now = self.clock.now_ms();
        self.fire_due(now);
        self.flush_typing(now);
        let scope = Scope {
            dom: self.dom.as_ref(),
            synth: &self.synth,
            policy: &self.policy,
        };
        let scroll = self.scroll.flush(scope, now);
        let leave = self.hover.flush(now);
        for event in scroll.into_iter().chain(leave) {
            self.emit(event);
        }

        self.timers.clear();
        self.drag.reset();
        for id in self.listeners.drain(..) {
            self.source.unregister(id);
        }
        events::emit_stopped(
            self.metrics.raw_total(),
            self.metrics.semantic_total(),
            self.metrics.noise_reduction(),
        );
        self.emitter.set_subscription(None);
        self.enabled = false;
    }

    /// Routes one raw event. Ignored while disabled and for events raised
    /// inside the recording widget.
    pub fn handle(&mut self, raw: RawEvent) {
        if !self.enabled {
            trace!(target: "interaction.engine", event = raw.name(), "engine disabled; raw event ignored");
            return;
        }
        if matches!(raw, RawEvent::Unknown) {
            return;
        }
        let now = self.clock.now_ms();
        self.fire_due(now);

        let scope = Scope {
            dom: self.dom.as_ref(),
            synth: &self.synth,
            policy: &self.policy,
        };
        if let Some(node) = raw.target() {
            if self.widget.contains(scope, node) {
                trace!(target: "interaction.engine", event = raw.name(), %node, "widget event ignored");
                return;
            }
        }
        self.metrics.record_raw(raw.name(), 1);

        match raw {
            RawEvent::Click { target, x, y } => {
                if self.typing.field().is_some_and(|field| field != target) {
                    self.flush_typing(now);
                }
                let scope = Scope {
                    dom: self.dom.as_ref(),
                    synth: &self.synth,
                    policy: &self.policy,
                };
                let event = classify::click(scope, target, x, y, now);
                self.emit_opt(event);
            }
            RawEvent::MouseDown { target, x, y } => self.drag.on_down(target, x, y, now),
            RawEvent::MouseUp { x, y, .. } => {
                let event = self.drag.on_up(scope, x, y, now);
                self.emit_opt(event);
            }
            RawEvent::MouseOver { target } => {
                let step = self.hover.on_over(scope, target, now);
                self.apply(step);
            }
            RawEvent::MouseOut { target } => {
                let step = self.hover.on_out(target, now);
                self.apply(step);
            }
            RawEvent::Input { target } => {
                let step = self.typing.on_input(scope, target, now);
                self.apply(step);
            }
            RawEvent::Change { target } => {
                let event = change_event(scope, target, now);
                self.emit_opt(event);
            }
            RawEvent::Scroll { scroll_y } => {
                let y = scroll_y.unwrap_or_else(|| self.dom.viewport().scroll_y);
                let step = self.scroll.on_scroll(scope, y, now);
                self.apply(step);
            }
            RawEvent::FocusIn { target } => {
                if self.typing.field().is_some_and(|field| field != target) {
                    self.flush_typing(now);
                }
                self.emit_focus(target, true, now);
            }
            RawEvent::FocusOut { target } => self.emit_focus(target, false, now),
            RawEvent::Submit { target } => {
                self.flush_typing(now);
                let scope = Scope {
                    dom: self.dom.as_ref(),
                    synth: &self.synth,
                    policy: &self.policy,
                };
                let event = classify::submit(scope, target, now);
                self.emit_opt(event);
            }
            RawEvent::KeyDown {
                target,
                key,
                modifiers,
            } => {
                let event = classify::key(scope, target, &key, &modifiers, now);
                if let Some(event) = event {
                    self.flush_typing(now);
                    self.emit(event);
                }
            }
            RawEvent::Copy { target, text } => {
                let event = classify::clipboard(scope, SemanticKind::Copy, target, text.as_deref(), now);
                self.emit(event);
            }
            RawEvent::Cut { target, text } => {
                let event = classify::clipboard(scope, SemanticKind::Cut, target, text.as_deref(), now);
                self.emit(event);
            }
            RawEvent::Paste { target, text } => {
                let event = classify::clipboard(scope, SemanticKind::Paste, target, text.as_deref(), now);
                self.emit(event);
            }
            RawEvent::Navigation { url, from, trigger } => {
                self.flush_typing(now);
                let from = from.or_else(|| self.current_url.clone());
                let event = classify::navigation(&url, from.as_deref(), trigger.as_deref(), now);
                self.current_url = Some(url);
                self.emit(event);
            }
            RawEvent::Unload => {
                self.flush_typing(now);
                let event = classify::unload(self.current_url.as_deref(), now);
                self.emit(event);
            }
            RawEvent::Console { level, message } => {
                let event =
                    classify::console(level, &message, self.policy.max_console_message, now);
                self.emit(event);
            }
            RawEvent::Unknown => {}
        }
    }

    /// Feeds mutation records to the active watch.
    pub fn handle_mutations(&mut self, records: Vec<MutationRecord>) {
        let now = self.clock.now_ms();
        if self.enabled {
            let counted = records.iter().filter(|r| !r.is_unknown()).count() as u64;
            self.metrics.record_raw("mutation", counted);
        }
        self.watcher
            .ingest(records, now, self.dom.as_ref(), self.mutations.as_ref());
    }

    /// Earliest instant at which [`InteractionEngine::poll_timers`] has work.
    pub fn next_deadline(&self) -> Option<i64> {
        let timers = self.enabled.then(|| self.timers.next()).flatten();
        [timers, self.watcher.deadline()].into_iter().flatten().min()
    }

    /// Runs every timer that is due. Returns how many fired.
    pub fn poll_timers(&mut self) -> usize {
        let now = self.clock.now_ms();
        self.fire_due(now)
    }

    fn fire_due(&mut self, now: i64) -> usize {
        let mut fired = 0;
        if self.enabled {
            for (timer, at) in self.timers.take_due(now) {
                fired += 1;
                let scope = Scope {
                    dom: self.dom.as_ref(),
                    synth: &self.synth,
                    policy: &self.policy,
                };
                let event = match timer {
                    Timer::Typing => self.typing.flush(scope, at),
                    Timer::Scroll => self.scroll.flush(scope, at),
                    Timer::Dwell(node) => self.hover.dwell(scope, node, at),
                };
                self.emit_opt(event);
            }
        }
        if self.watcher.deadline().is_some_and(|at| at <= now) {
            fired += 1;
            if let Some(batch) = self.watcher.poll(now, self.dom.as_ref(), &self.synth) {
                let metrics = self.enabled.then_some(&mut self.metrics);
                self.emitter.emit_batch(batch, metrics);
            }
        }
        fired
    }

    /// Starts a mutation watch, replacing any running one. A root that does
    /// not resolve is reported to the sink as an `error` message.
    pub fn watch_mutations(
        &mut self,
        request: MutationWatchRequest,
    ) -> Result<WatchInfo, FilterError> {
        match self
            .watcher
            .start(request, self.dom.as_ref(), self.mutations.as_ref())
        {
            Ok(info) => Ok(info),
            Err(err) => {
                warn!(target: "interaction.engine", code = err.code(), error = %err, "mutation watch not started");
                self.emitter
                    .deliver(SinkMessage::Error(EngineNotice::new(err.code(), err.to_string())));
                Err(err)
            }
        }
    }

    /// Stops the mutation watch. Records not yet flushed are dropped.
    pub fn unwatch_mutations(&mut self) {
        self.watcher.stop(self.mutations.as_ref());
    }

    /// Drops a `recording:marker` into the stream.
    pub fn mark(&mut self, label: &str, payload: Map<String, Value>) {
        let now = self.clock.now_ms();
        self.fire_due(now);
        debug!(target: "interaction.engine", label, "marker");
        self.emit(classify::marker(label, payload, now));
    }

    pub fn buffer(&self, since: Option<i64>, category: Option<Category>) -> Vec<SemanticEvent> {
        self.emitter.buffer(since, category)
    }

    pub fn stats(&self) -> EngineStats {
        let now = self.clock.now_ms();
        EngineStats {
            duration: self.metrics.duration(now),
            raw: self.metrics.raw_counts(),
            semantic: self.metrics.semantic_counts(),
            by_preset: self.metrics.by_preset(),
            noise_reduction: self.metrics.noise_reduction(),
            enabled: self.enabled,
            subscription: self.emitter.subscription().cloned(),
            buffered: self.emitter.buffered(),
            mutations: self.watcher.stats(),
        }
    }

    pub fn add_reader(&mut self, reader: Reader) -> ReaderId {
        self.emitter.add_reader(reader)
    }

    pub fn remove_reader(&mut self, id: ReaderId) -> bool {
        self.emitter.remove_reader(id)
    }

    fn flush_typing(&mut self, now: i64) {
        self.timers.cancel(Timer::Typing);
        let scope = Scope {
            dom: self.dom.as_ref(),
            synth: &self.synth,
            policy: &self.policy,
        };
        let event = self.typing.flush(scope, now);
        self.emit_opt(event);
    }

    fn emit_focus(&mut self, target: NodeId, gained: bool, now: i64) {
        let scope = Scope {
            dom: self.dom.as_ref(),
            synth: &self.synth,
            policy: &self.policy,
        };
        let event = classify::focus(scope, target, gained, now);
        self.emit_opt(event);
    }

    fn apply(&mut self, step: Step) {
        if let Some(timer) = step.cancel {
            self.timers.cancel(timer);
        }
        if let Some((timer, at)) = step.arm {
            self.timers.arm(timer, at);
        }
        for event in step.events {
            self.emit(event);
        }
    }

    fn emit(&mut self, event: SemanticEvent) {
        self.emitter.emit(event, &mut self.metrics);
    }

    fn emit_opt(&mut self, event: Option<SemanticEvent>) {
        if let Some(event) = event {
            self.emit(event);
        }
    }
}
