//! pagewire library
//!
//! Configuration, scenario model and the deterministic replay driver behind
//! the `pagewire` binary. Exposed for integration testing.

pub mod config;
pub mod replay;
pub mod scenario;

pub use config::{load_config, LoadedConfig, PagewireConfig, ReplaySettings};
pub use replay::{replay, ReplayOptions, ReplayReport};
pub use scenario::{Action, Scenario, ScenarioError, Step, SubscriptionSpec};
