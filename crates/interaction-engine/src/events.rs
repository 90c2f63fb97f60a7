use pagewire_core_types::{Category, MutationBatch, SemanticEvent, SemanticKind};
use tracing::{debug, info, trace};

use crate::subscription::Subscription;

pub fn emit_semantic(event: &SemanticEvent, buffered: usize) {
    debug!(
        target: "interaction.events",
        kind = %event.kind,
        category = %event.category,
        timestamp = event.timestamp,
        selector = event.target.as_ref().map(|t| t.selector.as_str()),
        buffered,
        "interaction.semantic.emitted"
    );
}

pub fn emit_filtered(kind: SemanticKind, reason: &'static str) {
    trace!(
        target: "interaction.events",
        %kind,
        reason,
        "interaction.semantic.filtered"
    );
}

pub fn emit_batch(batch: &MutationBatch) {
    debug!(
        target: "interaction.events",
        count = batch.count,
        added = batch.summary.added,
        removed = batch.summary.removed,
        attributes = batch.summary.attribute_changes,
        text = batch.summary.text_changes,
        notable = batch.notable.len(),
        "interaction.mutations.delivered"
    );
}

pub fn emit_batch_filtered() {
    trace!(
        target: "interaction.events",
        category = %Category::Mutation,
        "interaction.mutations.filtered"
    );
}

pub fn emit_started(subscription: &Subscription, listeners: usize, restarted: bool) {
    info!(
        target: "interaction.events",
        categories = ?subscription.allowed(),
        listeners,
        restarted,
        "interaction.engine.started"
    );
}

pub fn emit_stopped(raw_total: u64, semantic_total: u64, noise_reduction: i64) {
    info!(
        target: "interaction.events",
        raw_total,
        semantic_total,
        noise_reduction,
        "interaction.engine.stopped"
    );
}
