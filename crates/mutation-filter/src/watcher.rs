use std::collections::HashSet;

use pagewire_core_types::dom::walk;
use pagewire_core_types::{DomPort, MutationBatch, NodeId};
use selector_synth::SelectorSynthesizer;
use tracing::{debug, info, trace};

use crate::classify::{BatchClassifier, BatchLimits};
use crate::detect::detect_frameworks;
use crate::errors::FilterError;
use crate::model::{MutationRecord, MutationWatchRequest, WatchStats};
use crate::pattern::{CompiledRules, PatternCache};
use crate::policy::WatchDefaults;
use crate::ports::{MutationSource, ObserverId};
use crate::presets::{Framework, RulePreset};
use crate::rules::FilterRules;

/// Elements scanned for shadow roots when a watch starts or nodes are added.
const SHADOW_SCAN_LIMIT: usize = 5_000;

/// What a started watch resolved to.
#[derive(Clone, Debug, PartialEq)]
pub struct WatchInfo {
    pub root: NodeId,
    pub frameworks: Vec<Framework>,
    pub rules: FilterRules,
    pub observers: usize,
}

struct ActiveWatch {
    request: MutationWatchRequest,
    root: NodeId,
    rules: CompiledRules,
    raw_rules: FilterRules,
    frameworks: Vec<Framework>,
    debounce_ms: i64,
    observers: Vec<ObserverId>,
    shadow_roots: HashSet<NodeId>,
    pending: Vec<MutationRecord>,
    overflow: u64,
    deadline: Option<i64>,
}

/// One mutation watch at a time: buffers records and turns them into a
/// batch once the page has been quiet for the debounce window.
///
/// Time is passed in; the owner decides when to call [`MutationWatcher::poll`].
pub struct MutationWatcher {
    defaults: WatchDefaults,
    cache: PatternCache,
    active: Option<ActiveWatch>,
    stats: WatchStats,
}

impl Default for MutationWatcher {
    fn default() -> Self {
        Self::new(WatchDefaults::default())
    }
}

impl MutationWatcher {
    pub fn new(defaults: WatchDefaults) -> Self {
        Self {
            defaults,
            cache: PatternCache::new(),
            active: None,
            stats: WatchStats::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn stats(&self) -> WatchStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = WatchStats::default();
    }

    pub fn root(&self) -> Option<NodeId> {
        self.active.as_ref().map(|w| w.root)
    }

    pub fn frameworks(&self) -> &[Framework] {
        self.active
            .as_ref()
            .map(|w| w.frameworks.as_slice())
            .unwrap_or_default()
    }

    pub fn rules(&self) -> Option<&FilterRules> {
        self.active.as_ref().map(|w| &w.raw_rules)
    }

    pub fn pending(&self) -> usize {
        self.active.as_ref().map(|w| w.pending.len()).unwrap_or(0)
    }

    pub fn deadline(&self) -> Option<i64> {
        self.active.as_ref().and_then(|w| w.deadline)
    }

    /// Starts watching. A running watch is replaced (its pending records are
    /// dropped). Fails without side effects when the root does not resolve.
    pub fn start(
        &mut self,
        request: MutationWatchRequest,
        dom: &dyn DomPort,
        source: &dyn MutationSource,
    ) -> Result<WatchInfo, FilterError> {
        let selector = request.root_selector().to_string();
        let root = dom
            .query_all(&selector)
            .ok()
            .and_then(|hits| hits.first().copied())
            .ok_or_else(|| FilterError::root_not_found(&selector))?;

        self.stop(source);

        let preset = RulePreset::parse(&request.preset);
        let frameworks = if preset.detects_frameworks() {
            detect_frameworks(dom, self.defaults.detection_scan_limit)
        } else {
            Vec::new()
        };
        let mut raw_rules = preset.base_rules();
        for framework in &frameworks {
            raw_rules = raw_rules.merge(&framework.rules());
        }
        if let Some(custom) = &request.filters {
            raw_rules = raw_rules.merge(custom);
        }
        let rules = self.cache.compile(&raw_rules);

        let mut watch = ActiveWatch {
            debounce_ms: request.debounce_ms.unwrap_or(self.defaults.debounce_ms) as i64,
            root,
            rules,
            raw_rules,
            frameworks,
            observers: Vec::new(),
            shadow_roots: HashSet::new(),
            pending: Vec::new(),
            overflow: 0,
            deadline: None,
            request,
        };
        watch
            .observers
            .push(source.observe(root, &watch.request.observe));
        if watch.request.pierce_shadow {
            attach_shadow_observers(&mut watch, dom, source, root);
        }

        info!(
            target: "mutation.watch",
            root = %root,
            selector = %selector,
            preset = %watch.request.preset,
            frameworks = ?watch.frameworks,
            rules = watch.raw_rules.len(),
            observers = watch.observers.len(),
            "mutation watch started"
        );
        let info = WatchInfo {
            root,
            frameworks: watch.frameworks.clone(),
            rules: watch.raw_rules.clone(),
            observers: watch.observers.len(),
        };
        self.active = Some(watch);
        Ok(info)
    }

    /// Disconnects every observer and drops pending records.
    pub fn stop(&mut self, source: &dyn MutationSource) {
        if let Some(watch) = self.active.take() {
            for id in watch.observers {
                source.disconnect(id);
            }
            debug!(
                target: "mutation.watch",
                dropped = watch.pending.len(),
                "mutation watch stopped"
            );
        }
    }

    /// Buffers records and pushes the flush deadline out by the debounce
    /// window. Ignored while no watch is running.
    pub fn ingest(
        &mut self,
        records: Vec<MutationRecord>,
        now: i64,
        dom: &dyn DomPort,
        source: &dyn MutationSource,
    ) {
        let Some(watch) = self.active.as_mut() else {
            trace!(target: "mutation.watch", "records arrived without an active watch");
            return;
        };
        let max_pending = self.defaults.max_pending;
        let mut accepted = 0u64;
        for record in records {
            if record.is_unknown() {
                continue;
            }
            accepted += 1;
            if watch.request.pierce_shadow {
                if let MutationRecord::ChildList { added, .. } = &record {
                    for node in added {
                        attach_shadow_observers(watch, dom, source, node.node);
                    }
                }
            }
            if watch.pending.len() < max_pending {
                watch.pending.push(record);
            } else {
                watch.overflow += 1;
            }
        }
        if accepted == 0 {
            return;
        }
        self.stats.records += accepted;
        watch.deadline = Some(now + watch.debounce_ms);
    }

    /// Flushes when the debounce deadline has passed.
    pub fn poll(
        &mut self,
        now: i64,
        dom: &dyn DomPort,
        synth: &SelectorSynthesizer,
    ) -> Option<MutationBatch> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.flush(now, dom, synth),
            _ => None,
        }
    }

    /// Classifies everything pending right away.
    pub fn flush(
        &mut self,
        now: i64,
        dom: &dyn DomPort,
        synth: &SelectorSynthesizer,
    ) -> Option<MutationBatch> {
        let watch = self.active.as_mut()?;
        watch.deadline = None;
        if watch.pending.is_empty() && watch.overflow == 0 {
            return None;
        }
        let records = std::mem::take(&mut watch.pending);
        let overflow = std::mem::take(&mut watch.overflow);

        let classifier = BatchClassifier {
            rules: &watch.rules,
            dom,
            synth,
            limits: BatchLimits {
                notable_limit: self.defaults.notable_limit,
                max_value_len: self.defaults.max_value_len,
            },
        };
        let outcome = classifier.classify(&records, overflow, now);
        self.stats.ignored += outcome.ignored;
        match &outcome.batch {
            Some(batch) => {
                self.stats.batches += 1;
                debug!(
                    target: "mutation.watch",
                    count = batch.count,
                    added = batch.summary.added,
                    removed = batch.summary.removed,
                    attributes = batch.summary.attribute_changes,
                    text = batch.summary.text_changes,
                    notable = batch.notable.len(),
                    ignored = outcome.ignored,
                    "mutation batch ready"
                );
            }
            None => {
                trace!(
                    target: "mutation.watch",
                    records = records.len(),
                    ignored = outcome.ignored,
                    "batch filtered to nothing"
                );
            }
        }
        outcome.batch
    }
}

/// Observes every not-yet-observed shadow root at or below `from`.
fn attach_shadow_observers(
    watch: &mut ActiveWatch,
    dom: &dyn DomPort,
    source: &dyn MutationSource,
    from: NodeId,
) {
    for node in walk(dom, from, true, SHADOW_SCAN_LIMIT) {
        let Some(shadow) = dom.shadow_root(node) else {
            continue;
        };
        if watch.shadow_roots.insert(shadow) {
            watch
                .observers
                .push(source.observe(shadow, &watch.request.observe));
            trace!(target: "mutation.watch", host = %node, "shadow root observed");
        }
    }
}
