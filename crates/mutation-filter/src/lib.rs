//! Mutation batch filter
//!
//! Observes a subtree through a [`MutationSource`], buffers raw records and,
//! once the page has been quiet for the debounce window, classifies them
//! against composable [`FilterRules`] into a single [`MutationBatch`]
//! summary with a short list of notable changes.
//!
//! Rules are `merge(preset, detected frameworks.., custom)`. Merging only
//! ever adds; the ignore check runs before the notability check.
//!
//! [`MutationBatch`]: pagewire_core_types::MutationBatch

pub mod classify;
pub mod detect;
pub mod errors;
pub mod model;
pub mod pattern;
pub mod policy;
pub mod ports;
pub mod presets;
pub mod rules;
pub mod watcher;

pub use detect::detect_frameworks;
pub use errors::FilterError;
pub use model::{MutationNode, MutationRecord, MutationWatchRequest, ObserveOptions, WatchStats};
pub use pattern::{CompiledRules, PatternCache};
pub use policy::WatchDefaults;
pub use ports::{MutationSource, ObserverId, RecordingMutationSource};
pub use presets::{preset_names, smart_baseline, Framework, RulePreset};
pub use rules::FilterRules;
pub use watcher::{MutationWatcher, WatchInfo};
