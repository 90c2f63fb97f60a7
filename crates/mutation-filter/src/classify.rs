//! Turns a flushed set of records into a batch.

use std::collections::BTreeSet;

use pagewire_core_types::{
    DomPort, ElementDesc, MutationBatch, MutationKind, MutationSummary, NodeId, NotableMutation,
};
use selector_synth::{detached_selector, SelectorSynthesizer};
use selector_synth::text::truncate_chars;

use crate::model::{MutationNode, MutationRecord};
use crate::pattern::CompiledRules;

pub struct BatchLimits {
    pub notable_limit: usize,
    pub max_value_len: usize,
}

/// Result of one flush, emitted or not.
#[derive(Debug, Default)]
pub struct Classified {
    pub batch: Option<MutationBatch>,
    pub ignored: u64,
}

pub struct BatchClassifier<'a> {
    pub rules: &'a CompiledRules,
    pub dom: &'a dyn DomPort,
    pub synth: &'a SelectorSynthesizer,
    pub limits: BatchLimits,
}

struct Accumulator {
    summary: MutationSummary,
    notable: Vec<NotableMutation>,
    ignored: u64,
    notable_limit: usize,
}

impl Accumulator {
    fn note(&mut self, entry: NotableMutation) {
        if self.notable.len() < self.notable_limit {
            self.notable.push(entry);
        }
    }
}

/// Element named by a record, with where its description came from.
enum Resolved {
    Live(NodeId, ElementDesc),
    Detached(ElementDesc),
}

impl Resolved {
    fn element(&self) -> &ElementDesc {
        match self {
            Resolved::Live(_, el) | Resolved::Detached(el) => el,
        }
    }
}

impl<'a> BatchClassifier<'a> {
    /// Classifies `records` (already stripped of unknown types) and builds a
    /// batch when anything survives filtering. `overflow` records that never
    /// made it into the buffer are reported as ignored.
    pub fn classify(&self, records: &[MutationRecord], overflow: u64, now: i64) -> Classified {
        let mut acc = Accumulator {
            summary: MutationSummary::default(),
            notable: Vec::new(),
            ignored: overflow,
            notable_limit: self.limits.notable_limit,
        };
        let mut count = overflow;

        for record in records {
            match record {
                MutationRecord::ChildList { added, removed, .. } => {
                    count += 1;
                    for node in added {
                        self.structural(node, MutationKind::Added, &mut acc);
                    }
                    for node in removed {
                        self.structural(node, MutationKind::Removed, &mut acc);
                    }
                }
                MutationRecord::Attributes {
                    target,
                    attribute_name,
                    old_value,
                    new_value,
                } => {
                    count += 1;
                    self.attribute(
                        *target,
                        attribute_name,
                        old_value.as_deref(),
                        new_value.as_deref(),
                        &mut acc,
                    );
                }
                MutationRecord::CharacterData {
                    target,
                    parent,
                    old_value,
                    new_value,
                } => {
                    count += 1;
                    self.text(
                        parent.unwrap_or(*target),
                        old_value.as_deref(),
                        new_value.as_deref(),
                        &mut acc,
                    );
                }
                MutationRecord::Unknown => {}
            }
        }

        if acc.summary.is_empty() {
            return Classified {
                batch: None,
                ignored: acc.ignored,
            };
        }
        Classified {
            batch: Some(MutationBatch {
                timestamp: now,
                count,
                summary: acc.summary,
                notable: acc.notable,
                ignored: (acc.ignored > 0).then_some(acc.ignored),
            }),
            ignored: acc.ignored,
        }
    }

    fn resolve(&self, node: &MutationNode) -> Option<Resolved> {
        match self.dom.element(node.node) {
            Some(live) => Some(Resolved::Live(node.node, live)),
            None => node.element.clone().map(Resolved::Detached),
        }
    }

    fn is_ignored(&self, resolved: &Resolved) -> bool {
        match resolved {
            Resolved::Live(id, el) => self.rules.is_ignored_live(self.dom, *id, el),
            Resolved::Detached(el) => self.rules.is_ignored_detached(el),
        }
    }

    fn selector(&self, resolved: &Resolved) -> String {
        match resolved {
            Resolved::Live(id, _) => self.synth.best_selector(self.dom, *id),
            Resolved::Detached(el) => detached_selector(el),
        }
    }

    fn structural(&self, node: &MutationNode, kind: MutationKind, acc: &mut Accumulator) {
        // A removed node must be described by the record; the live lookup
        // only serves added nodes.
        let resolved = match kind {
            MutationKind::Removed => node.element.clone().map(Resolved::Detached),
            _ => self.resolve(node),
        };
        let Some(resolved) = resolved else {
            return;
        };
        if self.is_ignored(&resolved) {
            acc.ignored += 1;
            return;
        }
        match kind {
            MutationKind::Removed => acc.summary.removed += 1,
            _ => acc.summary.added += 1,
        }
        let element = resolved.element();
        if self.rules.is_notable_element(element) {
            acc.note(NotableMutation {
                kind,
                selector: self.selector(&resolved),
                tag_name: element.tag.clone(),
                id: element.id.clone().filter(|id| !id.is_empty()),
                class_name: non_empty(element.class_attr()),
                attribute: None,
                old_value: None,
                new_value: None,
            });
        }
    }

    fn attribute(
        &self,
        target: NodeId,
        name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
        acc: &mut Accumulator,
    ) {
        let Some(element) = self.dom.element(target) else {
            return;
        };
        if self.rules.is_ignored_live(self.dom, target, &element) {
            return;
        }
        if self.rules.is_ignored_attribute(name) {
            return;
        }

        let current = match new_value {
            Some(value) => Some(value.to_string()),
            None if name == "class" => non_empty(element.class_attr()),
            None => element.attr(name).map(str::to_string),
        };

        let notable = if name == "class" {
            let before = class_set(old_value.unwrap_or_default());
            let after = class_set(current.as_deref().unwrap_or_default());
            let changed: Vec<&str> = before
                .symmetric_difference(&after)
                .map(String::as_str)
                .filter(|class| !self.rules.is_ignored_class(class))
                .collect();
            if changed.is_empty() {
                return;
            }
            changed.iter().any(|class| self.rules.is_interesting_class(class))
        } else {
            self.rules.is_interesting_attribute(name)
        };

        acc.summary.attribute_changes += 1;
        if notable {
            let resolved = Resolved::Live(target, element);
            let element = resolved.element();
            acc.note(NotableMutation {
                kind: MutationKind::Attribute,
                selector: self.selector(&resolved),
                tag_name: element.tag.clone(),
                id: element.id.clone().filter(|id| !id.is_empty()),
                class_name: non_empty(element.class_attr()),
                attribute: Some(name.to_string()),
                old_value: old_value.map(|v| self.clip(v)),
                new_value: current.as_deref().map(|v| self.clip(v)),
            });
        }
    }

    fn text(
        &self,
        owner: NodeId,
        old_value: Option<&str>,
        new_value: Option<&str>,
        acc: &mut Accumulator,
    ) {
        let Some(element) = self.dom.element(owner) else {
            acc.summary.text_changes += 1;
            return;
        };
        if self.rules.is_ignored_live(self.dom, owner, &element) {
            return;
        }
        acc.summary.text_changes += 1;
        if self.rules.is_notable_element(&element) {
            let current = new_value
                .map(str::to_string)
                .unwrap_or_else(|| element.text.clone());
            let resolved = Resolved::Live(owner, element);
            let element = resolved.element();
            acc.note(NotableMutation {
                kind: MutationKind::Text,
                selector: self.selector(&resolved),
                tag_name: element.tag.clone(),
                id: element.id.clone().filter(|id| !id.is_empty()),
                class_name: non_empty(element.class_attr()),
                attribute: None,
                old_value: old_value.map(|v| self.clip(v)),
                new_value: Some(self.clip(&current)),
            });
        }
    }

    fn clip(&self, value: &str) -> String {
        truncate_chars(value, self.limits.max_value_len)
    }
}

fn class_set(raw: &str) -> BTreeSet<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
