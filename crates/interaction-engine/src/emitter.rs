//! Single ingress for everything the engine produces.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use pagewire_core_types::{Category, MutationBatch, SemanticEvent, SinkMessage};
use pagewire_event_bus::EventSink;

use crate::events;
use crate::metrics::NoiseMetrics;
use crate::ring::RingBuffer;
use crate::subscription::Subscription;

/// In-process observer called synchronously for every buffered event.
pub type Reader = Box<dyn Fn(&SemanticEvent) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReaderId(pub u64);

pub struct Emitter {
    sink: Arc<dyn EventSink>,
    subscription: Option<Subscription>,
    buffer: RingBuffer<SemanticEvent>,
    readers: BTreeMap<ReaderId, Reader>,
    next_reader: u64,
    last_timestamp: i64,
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("subscription", &self.subscription)
            .field("buffered", &self.buffer.len())
            .field("readers", &self.readers.len())
            .field("last_timestamp", &self.last_timestamp)
            .finish()
    }
}

impl Emitter {
    pub fn new(sink: Arc<dyn EventSink>, capacity: usize) -> Self {
        Self {
            sink,
            subscription: None,
            buffer: RingBuffer::new(capacity),
            readers: BTreeMap::new(),
            next_reader: 0,
            last_timestamp: i64::MIN,
        }
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    pub fn set_subscription(&mut self, subscription: Option<Subscription>) {
        self.subscription = subscription;
    }

    /// Counts `event`, then buffers and delivers it if the subscription lets
    /// it through. Returns whether it was delivered.
    pub fn emit(&mut self, mut event: SemanticEvent, metrics: &mut NoiseMetrics) -> bool {
        event.timestamp = event.timestamp.max(self.last_timestamp);
        metrics.record_semantic(event.category);

        let Some(subscription) = &self.subscription else {
            events::emit_filtered(event.kind, "no_subscription");
            return false;
        };
        if !subscription.allows(event.category) {
            events::emit_filtered(event.kind, "category_not_subscribed");
            return false;
        }

        self.last_timestamp = event.timestamp;
        self.buffer.push(event.clone());
        events::emit_semantic(&event, self.buffer.len());
        self.sink.deliver(SinkMessage::Semantic(event.clone()));
        for reader in self.readers.values() {
            reader(&event);
        }
        true
    }

    /// Delivers a mutation batch unless a held subscription excludes
    /// `mutation`.
    pub fn emit_batch(&mut self, batch: MutationBatch, metrics: Option<&mut NoiseMetrics>) -> bool {
        if let Some(metrics) = metrics {
            metrics.record_semantic(Category::Mutation);
        }
        if self
            .subscription
            .as_ref()
            .is_some_and(|s| !s.allows(Category::Mutation))
        {
            events::emit_batch_filtered();
            return false;
        }
        events::emit_batch(&batch);
        self.sink.deliver(SinkMessage::Mutations(batch));
        true
    }

    pub fn deliver(&self, message: SinkMessage) {
        self.sink.deliver(message);
    }

    /// Buffered events newer than `since`, optionally of one category.
    pub fn buffer(&self, since: Option<i64>, category: Option<Category>) -> Vec<SemanticEvent> {
        self.buffer
            .iter()
            .filter(|e| since.map_or(true, |since| e.timestamp > since))
            .filter(|e| category.map_or(true, |c| e.category == c))
            .cloned()
            .collect()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    pub fn add_reader(&mut self, reader: Reader) -> ReaderId {
        self.next_reader += 1;
        let id = ReaderId(self.next_reader);
        self.readers.insert(id, reader);
        id
    }

    pub fn remove_reader(&mut self, id: ReaderId) -> bool {
        self.readers.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::Preset;
    use pagewire_core_types::SemanticKind;
    use pagewire_event_bus::CollectingSink;
    use parking_lot::Mutex;

    #[test]
    fn timestamps_never_go_backwards() {
        let sink = CollectingSink::new();
        let mut emitter = Emitter::new(sink.clone(), 10);
        let mut metrics = NoiseMetrics::new();
        emitter.set_subscription(Some(Subscription::preset(Preset::Debug)));

        emitter.emit(SemanticEvent::new(SemanticKind::Click, 500), &mut metrics);
        emitter.emit(SemanticEvent::new(SemanticKind::Typed, 450), &mut metrics);
        let stamps: Vec<i64> = sink.semantic_events().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![500, 500]);
    }

    #[test]
    fn unsubscribed_events_are_counted_but_not_delivered() {
        let sink = CollectingSink::new();
        let mut emitter = Emitter::new(sink.clone(), 10);
        let mut metrics = NoiseMetrics::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_reader = Arc::clone(&seen);
        let reader = emitter.add_reader(Box::new(move |e: &SemanticEvent| {
            seen_by_reader.lock().push(e.kind);
        }));

        assert!(!emitter.emit(SemanticEvent::new(SemanticKind::Click, 1), &mut metrics));
        emitter.set_subscription(Some(Subscription::preset(Preset::Minimal)));
        assert!(!emitter.emit(SemanticEvent::new(SemanticKind::HoverEnter, 2), &mut metrics));
        assert!(emitter.emit(SemanticEvent::new(SemanticKind::Click, 3), &mut metrics));

        assert_eq!(metrics.semantic_total(), 3);
        assert_eq!(emitter.buffered(), 1);
        assert_eq!(*seen.lock(), vec![SemanticKind::Click]);
        assert!(emitter.remove_reader(reader));
        assert!(!emitter.remove_reader(reader));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn buffer_filters_by_time_and_category() {
        let sink = CollectingSink::new();
        let mut emitter = Emitter::new(sink, 10);
        let mut metrics = NoiseMetrics::new();
        emitter.set_subscription(Some(Subscription::preset(Preset::Debug)));
        emitter.emit(SemanticEvent::new(SemanticKind::Click, 10), &mut metrics);
        emitter.emit(SemanticEvent::new(SemanticKind::FocusIn, 20), &mut metrics);
        emitter.emit(SemanticEvent::new(SemanticKind::Click, 30), &mut metrics);

        assert_eq!(emitter.buffer(Some(10), None).len(), 2);
        assert_eq!(emitter.buffer(None, Some(Category::Interaction)).len(), 2);
        assert_eq!(emitter.buffer(Some(20), Some(Category::Focus)).len(), 0);
    }
}
