use mutation_filter::{
    FilterError, FilterRules, Framework, MutationNode, MutationRecord, MutationWatchRequest,
    MutationWatcher, RecordingMutationSource, WatchDefaults,
};
use pagewire_core_types::{DomPort, ElementDesc, MemoryDom, MutationKind, NodeId, NodeSpec};
use selector_synth::SelectorSynthesizer;

fn rules(f: impl FnOnce(&mut FilterRules)) -> Option<FilterRules> {
    let mut rules = FilterRules::default();
    f(&mut rules);
    Some(rules)
}

fn request(preset: &str, filters: Option<FilterRules>) -> MutationWatchRequest {
    MutationWatchRequest {
        preset: preset.to_string(),
        filters,
        ..Default::default()
    }
}

fn page() -> MemoryDom {
    MemoryDom::with_body([
        NodeSpec::new("main").id("content").children([
            NodeSpec::new("div").id("panel").class("panel fade-in"),
            NodeSpec::new("p").text("Subtotal: $10"),
            NodeSpec::new("ul").class("results"),
        ]),
        NodeSpec::new("aside").class("ads"),
    ])
}

struct Harness {
    dom: MemoryDom,
    source: RecordingMutationSource,
    synth: SelectorSynthesizer,
    watcher: MutationWatcher,
}

impl Harness {
    fn new(dom: MemoryDom) -> Self {
        Self {
            dom,
            source: RecordingMutationSource::new(),
            synth: SelectorSynthesizer::default(),
            watcher: MutationWatcher::default(),
        }
    }

    fn start(&mut self, request: MutationWatchRequest) {
        self.watcher
            .start(request, &self.dom, &self.source)
            .expect("watch starts");
    }

    fn ingest(&mut self, records: Vec<MutationRecord>, now: i64) {
        self.watcher.ingest(records, now, &self.dom, &self.source);
    }

    fn poll(&mut self, now: i64) -> Option<pagewire_core_types::MutationBatch> {
        self.watcher.poll(now, &self.dom, &self.synth)
    }

    fn node(&self, selector: &str) -> NodeId {
        self.dom.find_deep(selector).expect("fixture node")
    }

    fn append(&self, parent: &str, spec: NodeSpec) -> NodeId {
        self.dom.append(self.node(parent), spec).expect("append")
    }
}

#[test]
fn missing_root_fails_without_observing() {
    let mut h = Harness::new(page());
    let err = h
        .watcher
        .start(
            MutationWatchRequest {
                root: Some("#nowhere".into()),
                ..Default::default()
            },
            &h.dom,
            &h.source,
        )
        .unwrap_err();
    assert_eq!(err, FilterError::root_not_found("#nowhere"));
    assert_eq!(err.code(), "mutation_root_not_found");
    assert!(!h.watcher.is_active());
    assert_eq!(h.source.active(), 0);
}

#[test]
fn batches_wait_for_quiet_period() {
    let mut h = Harness::new(page());
    h.start(request("none", None));
    let results = h.node(".results");

    let first = h.append(".results", NodeSpec::new("li").text("one"));
    h.ingest(
        vec![MutationRecord::ChildList {
            target: results,
            added: vec![MutationNode::live(first)],
            removed: vec![],
        }],
        0,
    );
    assert!(h.poll(50).is_none());

    let second = h.append(".results", NodeSpec::new("li").text("two"));
    h.ingest(
        vec![MutationRecord::ChildList {
            target: results,
            added: vec![MutationNode::live(second)],
            removed: vec![],
        }],
        80,
    );
    assert!(h.poll(150).is_none());
    assert_eq!(h.watcher.deadline(), Some(180));

    let batch = h.poll(180).expect("batch after quiet period");
    assert_eq!(batch.timestamp, 180);
    assert_eq!(batch.count, 2);
    assert_eq!(batch.summary.added, 2);
    assert!(batch.notable.is_empty());
    assert_eq!(batch.ignored, None);
    assert_eq!(h.watcher.deadline(), None);
    assert!(h.poll(500).is_none());
}

#[test]
fn fully_ignored_batch_is_never_produced() {
    let mut h = Harness::new(page());
    h.start(request(
        "none",
        rules(|r| r.ignore_elements = vec!["script".into(), ".ads".into()]),
    ));
    let body = h.dom.body().unwrap();
    let script = h.append("body", NodeSpec::new("script"));
    let inside_ad = h.append(".ads", NodeSpec::new("div").id("banner"));
    h.ingest(
        vec![
            MutationRecord::ChildList {
                target: body,
                added: vec![MutationNode::live(script)],
                removed: vec![],
            },
            MutationRecord::ChildList {
                target: h.node(".ads"),
                added: vec![MutationNode::live(inside_ad)],
                removed: vec![MutationNode::detached(
                    NodeId(900),
                    ElementDesc::new("script"),
                )],
            },
        ],
        0,
    );
    assert!(h.poll(100).is_none());
    let stats = h.watcher.stats();
    assert_eq!(stats.records, 2);
    assert_eq!(stats.batches, 0);
    assert_eq!(stats.ignored, 3);
}

#[test]
fn ignored_class_swap_is_dropped_entirely() {
    let mut h = Harness::new(page());
    h.start(request(
        "none",
        rules(|r| {
            r.ignore_classes = vec!["^is-".into(), "^fade".into()];
            r.interesting_classes = vec!["open".into(), "fade".into()];
        }),
    ));
    let panel = h.node("#panel");
    let text_owner = h.node("p");
    h.ingest(
        vec![
            MutationRecord::Attributes {
                target: panel,
                attribute_name: "class".into(),
                old_value: Some("panel is-open".into()),
                new_value: None,
            },
            MutationRecord::CharacterData {
                target: NodeId(700),
                parent: Some(text_owner),
                old_value: Some("Subtotal: $10".into()),
                new_value: Some("Subtotal: $12".into()),
            },
        ],
        0,
    );
    let batch = h.poll(100).expect("text change survives");
    assert_eq!(batch.summary.attribute_changes, 0);
    assert_eq!(batch.summary.text_changes, 1);
    assert!(batch.notable.is_empty());
    assert_eq!(batch.count, 2);
}

#[test]
fn smart_baseline_also_drops_state_class_swaps() {
    let mut h = Harness::new(page());
    h.start(request("smart", None));
    let panel = h.node("#panel");
    h.ingest(
        vec![MutationRecord::Attributes {
            target: panel,
            attribute_name: "class".into(),
            old_value: Some("panel is-open".into()),
            new_value: None,
        }],
        0,
    );
    assert!(h.poll(100).is_none());
}

#[test]
fn interesting_class_change_is_notable() {
    let mut h = Harness::new(page());
    h.start(request(
        "none",
        rules(|r| r.interesting_classes = vec!["^error$".into()]),
    ));
    let panel = h.node("#panel");
    h.dom.set_attribute(panel, "class", "panel fade-in error");
    h.ingest(
        vec![
            MutationRecord::Attributes {
                target: panel,
                attribute_name: "class".into(),
                old_value: Some("panel fade-in".into()),
                new_value: None,
            },
            MutationRecord::Attributes {
                target: panel,
                attribute_name: "data-state".into(),
                old_value: None,
                new_value: Some("busy".into()),
            },
        ],
        0,
    );
    let batch = h.poll(100).unwrap();
    assert_eq!(batch.summary.attribute_changes, 2);
    assert_eq!(batch.notable.len(), 1);
    let entry = &batch.notable[0];
    assert_eq!(entry.kind, MutationKind::Attribute);
    assert_eq!(entry.selector, "#panel");
    assert_eq!(entry.attribute.as_deref(), Some("class"));
    assert_eq!(entry.old_value.as_deref(), Some("panel fade-in"));
    assert_eq!(entry.new_value.as_deref(), Some("panel fade-in error"));
}

#[test]
fn ignored_attribute_names_are_not_counted() {
    let mut h = Harness::new(page());
    h.start(request("none", rules(|r| r.ignore_attributes = vec!["^style$".into()])));
    let panel = h.node("#panel");
    h.ingest(
        vec![MutationRecord::Attributes {
            target: panel,
            attribute_name: "style".into(),
            old_value: None,
            new_value: Some("opacity: 0.5".into()),
        }],
        0,
    );
    assert!(h.poll(100).is_none());
}

#[test]
fn notable_list_is_capped_earliest_first() {
    let mut h = Harness::new(page());
    h.start(request("none", None));
    let results = h.node(".results");
    let added: Vec<MutationNode> = (0..25)
        .map(|i| {
            let node = h.append(".results", NodeSpec::new("li").id(format!("item-{i}")));
            MutationNode::live(node)
        })
        .collect();
    h.ingest(
        vec![MutationRecord::ChildList {
            target: results,
            added,
            removed: vec![],
        }],
        0,
    );
    let batch = h.poll(100).unwrap();
    assert_eq!(batch.summary.added, 25);
    assert_eq!(batch.notable.len(), 20);
    assert_eq!(batch.notable[0].id.as_deref(), Some("item-0"));
    assert_eq!(batch.notable[19].id.as_deref(), Some("item-19"));
}

#[test]
fn removed_nodes_are_described_without_the_document() {
    let mut h = Harness::new(page());
    h.start(request("none", None));
    let main = h.node("#content");
    let panel = h.node("#panel");
    let gone = h.dom.remove(panel).expect("panel existed");
    h.ingest(
        vec![MutationRecord::ChildList {
            target: main,
            added: vec![],
            removed: vec![MutationNode::detached(panel, gone)],
        }],
        0,
    );
    let batch = h.poll(100).unwrap();
    assert_eq!(batch.summary.removed, 1);
    assert_eq!(batch.notable[0].kind, MutationKind::Removed);
    assert_eq!(batch.notable[0].selector, "div#panel");
    assert_eq!(batch.notable[0].class_name.as_deref(), Some("panel fade-in"));
}

#[test]
fn text_change_is_notable_when_its_element_is() {
    let mut h = Harness::new(page());
    h.start(request("none", None));
    let panel = h.node("#panel");
    h.ingest(
        vec![MutationRecord::CharacterData {
            target: panel,
            parent: None,
            old_value: Some("Loading".into()),
            new_value: Some("Saved".into()),
        }],
        0,
    );
    let batch = h.poll(100).unwrap();
    assert_eq!(batch.summary.text_changes, 1);
    assert_eq!(batch.notable[0].kind, MutationKind::Text);
    assert_eq!(batch.notable[0].new_value.as_deref(), Some("Saved"));
}

#[test]
fn only_selectors_restrict_structural_changes() {
    let mut h = Harness::new(page());
    h.start(request("none", rules(|r| r.only_selectors = vec!["main".into()])));
    let inside = h.append(".results", NodeSpec::new("li"));
    let outside = h.append(".ads", NodeSpec::new("div"));
    h.ingest(
        vec![MutationRecord::ChildList {
            target: h.dom.body().unwrap(),
            added: vec![MutationNode::live(inside), MutationNode::live(outside)],
            removed: vec![],
        }],
        0,
    );
    let batch = h.poll(100).unwrap();
    assert_eq!(batch.summary.added, 1);
    assert_eq!(batch.ignored, Some(1));
}

#[test]
fn overflow_is_reported_as_ignored() {
    let mut h = Harness {
        watcher: MutationWatcher::new(WatchDefaults {
            max_pending: 2,
            ..Default::default()
        }),
        ..Harness::new(page())
    };
    h.start(request("none", None));
    let p = h.node("p");
    let records = (0..5)
        .map(|_| MutationRecord::CharacterData {
            target: p,
            parent: None,
            old_value: None,
            new_value: None,
        })
        .collect();
    h.ingest(records, 0);
    let batch = h.poll(100).unwrap();
    assert_eq!(batch.summary.text_changes, 2);
    assert_eq!(batch.count, 5);
    assert_eq!(batch.ignored, Some(3));
}

#[test]
fn unknown_records_do_not_arm_the_timer() {
    let mut h = Harness::new(page());
    h.start(request("none", None));
    h.ingest(vec![MutationRecord::Unknown], 0);
    assert_eq!(h.watcher.deadline(), None);
    assert_eq!(h.watcher.stats().records, 0);
}

#[test]
fn shadow_roots_are_observed_when_piercing() {
    let dom = MemoryDom::with_body([NodeSpec::new("x-card").shadow([NodeSpec::new("span")])]);
    let mut h = Harness::new(dom);
    let info = h
        .watcher
        .start(
            MutationWatchRequest {
                pierce_shadow: true,
                ..request("none", None)
            },
            &h.dom,
            &h.source,
        )
        .unwrap();
    assert_eq!(info.observers, 2);

    let widget = h.append(
        "body",
        NodeSpec::new("x-menu").shadow([NodeSpec::new("ul")]),
    );
    h.ingest(
        vec![MutationRecord::ChildList {
            target: h.dom.body().unwrap(),
            added: vec![MutationNode::live(widget)],
            removed: vec![],
        }],
        0,
    );
    assert_eq!(h.source.active(), 3);

    h.watcher.stop(&h.source);
    assert_eq!(h.source.active(), 0);
    assert!(!h.watcher.is_active());
}

#[test]
fn smart_preset_merges_detected_frameworks() {
    let dom = MemoryDom::with_body([NodeSpec::new("div").attr("ng-version", "17.0.0")]);
    let mut h = Harness::new(dom);
    let info = h
        .watcher
        .start(
            request("smart", rules(|r| r.ignore_classes = vec!["^custom-".into()])),
            &h.dom,
            &h.source,
        )
        .unwrap();
    assert_eq!(info.frameworks, vec![Framework::Angular]);
    assert!(info.rules.ignore_attributes.iter().any(|r| r == "^_ngcontent-"));
    assert_eq!(info.rules.ignore_classes.last().map(String::as_str), Some("^custom-"));
}
