use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use pagewire_core_types::NodeId;
use serde::{Deserialize, Serialize};

use crate::model::ObserveOptions;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(pub u64);

/// Whatever attaches `MutationObserver`s in the page. Records come back
/// through the engine's `handle_mutations`.
pub trait MutationSource: Send + Sync {
    fn observe(&self, root: NodeId, options: &ObserveOptions) -> ObserverId;

    fn disconnect(&self, id: ObserverId);
}

/// Source that only remembers what it was asked to observe. Used where
/// records are fed in by hand.
#[derive(Default)]
pub struct RecordingMutationSource {
    next: AtomicU64,
    observed: Mutex<Vec<(ObserverId, NodeId)>>,
}

impl RecordingMutationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roots currently observed, in attach order.
    pub fn observed_roots(&self) -> Vec<NodeId> {
        self.observed.lock().iter().map(|(_, root)| *root).collect()
    }

    pub fn active(&self) -> usize {
        self.observed.lock().len()
    }
}

impl MutationSource for RecordingMutationSource {
    fn observe(&self, root: NodeId, _options: &ObserveOptions) -> ObserverId {
        let id = ObserverId(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        self.observed.lock().push((id, root));
        id
    }

    fn disconnect(&self, id: ObserverId) {
        self.observed.lock().retain(|(existing, _)| *existing != id);
    }
}
