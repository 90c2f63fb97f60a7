//! Shared primitives for the pagewire interaction engine.
//!
//! Everything the engine knows about a page goes through the [`DomPort`]
//! capability: elements are snapshots ([`ElementDesc`]), never live handles.

pub mod clock;
pub mod css;
pub mod dom;
pub mod element;
pub mod errors;
pub mod memory;
pub mod model;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use css::SelectorList;
pub use dom::{DomPort, NodeId, ParentRef, Viewport};
pub use element::{ElementDesc, Rect};
pub use errors::DomError;
pub use memory::{MemoryDom, NodeSpec};
pub use model::{
    Category, EngineNotice, MutationBatch, MutationKind, MutationSummary, NotableMutation,
    SemanticEvent, SemanticKind, SinkMessage, TargetInfo,
};
