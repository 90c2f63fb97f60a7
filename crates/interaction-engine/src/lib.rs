//! Interaction engine
//!
//! Collapses the raw event firehose of a page into a short stream of
//! semantic events:
//! - aggregation state machines for typing, scrolling, hovering and dragging
//!   (flushed when displaced or after a quiet window)
//! - stateless handlers for clicks, focus, clipboard, keys, navigation and
//!   console output
//! - a subscription filter in front of a bounded ring buffer and the sink
//! - noise metrics comparing raw input with semantic output
//!
//! [`InteractionEngine`] is synchronous and owns all state;
//! [`EngineRuntime`] drives one on a tokio task.

pub mod aggregate;
pub mod classify;
pub mod emitter;
pub mod engine;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod policy;
pub mod ports;
pub mod raw;
pub mod ring;
pub mod runtime;
pub mod subscription;
pub mod timers;

pub use emitter::{Reader, ReaderId};
pub use engine::{EnginePorts, InteractionEngine};
pub use errors::EngineError;
pub use metrics::{noise_reduction, EngineStats, PresetProjection, RawCounts, SemanticCounts};
pub use policy::EnginePolicy;
pub use ports::{EventSource, ListenerId, ListenerScope, ListenerSpec, RecordingEventSource};
pub use raw::{ConsoleLevel, Modifiers, RawEvent};
pub use runtime::{EngineHandle, EngineRuntime, TokioClock};
pub use subscription::{Preset, Subscription};
