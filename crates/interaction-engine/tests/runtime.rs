use std::sync::Arc;
use std::time::Duration;

use interaction_engine::{
    EngineError, EnginePolicy, EnginePorts, EngineRuntime, InteractionEngine, Preset, RawEvent,
    RecordingEventSource, Subscription, TokioClock,
};
use mutation_filter::{MutationNode, MutationRecord, MutationWatchRequest, RecordingMutationSource};
use pagewire_core_types::{MemoryDom, NodeSpec, SemanticKind};
use pagewire_event_bus::{to_mpsc, BroadcastSink, CollectingSink, EventSink};
use serde_json::Map;

fn engine(dom: Arc<MemoryDom>, sink: Arc<dyn EventSink>) -> InteractionEngine {
    InteractionEngine::new(
        EnginePorts {
            dom,
            events: Arc::new(RecordingEventSource::new()),
            mutations: Arc::new(RecordingMutationSource::new()),
            sink,
            clock: Arc::new(TokioClock::new()),
        },
        EnginePolicy::default(),
    )
}

fn signup() -> Arc<MemoryDom> {
    Arc::new(MemoryDom::with_body([NodeSpec::new("form").children([
        NodeSpec::new("input").id("email").attr("type", "email"),
        NodeSpec::new("ul").id("errors"),
    ])]))
}

#[tokio::test(start_paused = true)]
async fn typing_is_flushed_by_the_runtime_timer() {
    let dom = signup();
    let sink = CollectingSink::new();
    let runtime = EngineRuntime::spawn(engine(dom.clone(), sink.clone()), 16);
    let handle = runtime.handle();
    handle.start(Subscription::default()).await.unwrap();

    let email = dom.find("#email").unwrap();
    for value in ["a", "ab", "abc"] {
        dom.set_value(email, value);
        handle.handle(RawEvent::Input { target: email }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(handle.buffer(None, None).await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(500)).await;
    let buffer = handle.buffer(None, None).await.unwrap();
    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer[0].kind, SemanticKind::Typed);
    assert_eq!(buffer[0].payload_str("text"), Some("abc"));

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.raw.total, 3);
    assert_eq!(stats.noise_reduction, 67);

    let engine = runtime.shutdown().await.expect("engine returned");
    assert!(!engine.is_enabled());
    assert_eq!(sink.semantic_events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_open_sessions() {
    let dom = signup();
    let sink = CollectingSink::new();
    let runtime = EngineRuntime::spawn(engine(dom.clone(), sink.clone()), 16);
    let handle = runtime.handle();
    handle.start(Subscription::preset(Preset::Interactive)).await.unwrap();
    let email = dom.find("#email").unwrap();
    dom.set_value(email, "x");
    handle.handle(RawEvent::Input { target: email }).await.unwrap();
    handle.mark("before-shutdown", Map::new()).await.unwrap();

    runtime.shutdown().await.expect("engine returned");
    let kinds: Vec<_> = sink.semantic_events().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![SemanticKind::Marker, SemanticKind::Typed]);
    assert_eq!(
        handle.stop().await,
        Err(EngineError::RuntimeClosed)
    );
}

#[tokio::test(start_paused = true)]
async fn mutation_batches_reach_broadcast_subscribers() {
    let dom = signup();
    let bus = BroadcastSink::new(32);
    let mut rx = to_mpsc(bus.clone(), 32);
    let runtime = EngineRuntime::spawn(engine(dom.clone(), bus), 16);
    let handle = runtime.handle();
    handle.start(Subscription::preset(Preset::Detailed)).await.unwrap();

    let missing = handle
        .watch_mutations(MutationWatchRequest {
            root: Some("#app".into()),
            ..Default::default()
        })
        .await;
    assert!(matches!(missing, Err(EngineError::Watch(_))));
    let notice = rx.recv().await.expect("error message");
    assert_eq!(notice.as_error().map(|n| n.code.as_str()), Some("mutation_root_not_found"));

    let info = handle
        .watch_mutations(MutationWatchRequest {
            root: Some("form".into()),
            debounce_ms: Some(50),
            ..Default::default()
        })
        .await
        .unwrap();
    let errors = dom.find("#errors").unwrap();
    assert_eq!(info.root, dom.find("form").unwrap());

    let item = dom
        .append(errors, NodeSpec::new("li").id("email-error").text("Required"))
        .unwrap();
    handle
        .handle_mutations(vec![MutationRecord::ChildList {
            target: errors,
            added: vec![MutationNode::live(item)],
            removed: vec![],
        }])
        .await
        .unwrap();

    let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("batch before timeout")
        .expect("bus open");
    let batch = message.as_batch().expect("mutation batch");
    assert_eq!(batch.summary.added, 1);
    assert_eq!(batch.notable[0].selector, "#email-error");

    handle.unwatch_mutations().await.unwrap();
    runtime.shutdown().await;
}
