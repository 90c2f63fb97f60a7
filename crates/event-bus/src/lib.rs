use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::trace;

use pagewire_core_types::{EngineNotice, MutationBatch, SemanticEvent, SinkMessage};

/// Receiver of everything the engine surfaces. Delivery is fire-and-forget:
/// implementations must not block the caller.
pub trait EventSink: Send + Sync {
    fn deliver(&self, message: SinkMessage);
}

impl<S> EventSink for Arc<S>
where
    S: EventSink + ?Sized,
{
    fn deliver(&self, message: SinkMessage) {
        (**self).deliver(message)
    }
}

/// Bounded fan-out sink. Lagging receivers lose the oldest messages instead
/// of slowing the engine down.
pub struct BroadcastSink {
    sender: broadcast::Sender<SinkMessage>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SinkMessage> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn deliver(&self, message: SinkMessage) {
        if self.sender.send(message).is_err() {
            trace!(target: "pagewire.sink", "no active subscribers; message dropped");
        }
    }
}

/// Helper to materialise an mpsc receiver from the bus subscription
/// so callers can await messages without handling broadcast semantics directly.
pub fn to_mpsc(bus: Arc<BroadcastSink>, capacity: usize) -> mpsc::Receiver<SinkMessage> {
    let mut rx = bus.subscribe();
    let (tx, out_rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if tx.send(message).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(target: "pagewire.sink", skipped, "mpsc bridge lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    out_rx
}

/// Keeps every message in memory. Used by tests and scenario replay.
#[derive(Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<SinkMessage>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<SinkMessage> {
        self.messages.lock().clone()
    }

    pub fn take(&self) -> Vec<SinkMessage> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn semantic_events(&self) -> Vec<SemanticEvent> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| m.as_semantic().cloned())
            .collect()
    }

    pub fn batches(&self) -> Vec<MutationBatch> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| m.as_batch().cloned())
            .collect()
    }

    pub fn errors(&self) -> Vec<EngineNotice> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| m.as_error().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl EventSink for CollectingSink {
    fn deliver(&self, message: SinkMessage) {
        self.messages.lock().push(message);
    }
}

/// Discards everything.
#[derive(Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn deliver(&self, _message: SinkMessage) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewire_core_types::SemanticKind;

    fn click(ts: i64) -> SinkMessage {
        SinkMessage::Semantic(SemanticEvent::new(SemanticKind::Click, ts))
    }

    #[test]
    fn collecting_sink_splits_by_kind() {
        let sink = CollectingSink::new();
        sink.deliver(click(1));
        sink.deliver(SinkMessage::Error(EngineNotice::new("x", "y")));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.semantic_events().len(), 1);
        assert_eq!(sink.errors()[0].code, "x");
        assert!(sink.batches().is_empty());
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn broadcast_sink_drops_oldest_for_lagging_receivers() {
        let bus = BroadcastSink::new(2);
        let mut rx = bus.subscribe();
        for ts in 0..4 {
            bus.deliver(click(ts));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        let next = rx.recv().await.unwrap();
        assert_eq!(next.as_semantic().unwrap().timestamp, 2);
    }

    #[tokio::test]
    async fn mpsc_bridge_forwards_messages() {
        let bus = BroadcastSink::new(8);
        let mut rx = to_mpsc(Arc::clone(&bus), 8);
        tokio::task::yield_now().await;
        bus.deliver(click(7));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.as_semantic().unwrap().timestamp, 7);
    }

    #[test]
    fn sink_without_subscribers_does_not_panic() {
        let bus = BroadcastSink::new(1);
        bus.deliver(click(1));
        NullSink.deliver(click(2));
    }
}
