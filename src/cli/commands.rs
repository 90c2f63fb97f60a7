use clap::Subcommand;

use super::config::ConfigArgs;
use super::replay::ReplayArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Replay a scenario file through the engine and report what it emitted
    Replay(ReplayArgs),

    /// List subscription presets and mutation rule presets
    Presets,

    /// Manage pagewire configuration
    Config(ConfigArgs),

    /// Show version, effective configuration and engine defaults
    Info,
}
