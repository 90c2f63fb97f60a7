use std::path::Path;

use pagewire_cli::config::{LoadedConfig, PagewireConfig};

use super::output::OutputFormat;

pub struct CliContext {
    loaded: LoadedConfig,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(loaded: LoadedConfig, output: OutputFormat) -> Self {
        Self { loaded, output }
    }

    pub fn config(&self) -> &PagewireConfig {
        &self.loaded.config
    }

    pub fn config_path(&self) -> &Path {
        &self.loaded.path
    }

    /// Whether the configuration came from a file rather than defaults.
    pub fn config_from_file(&self) -> bool {
        self.loaded.from_file
    }

    pub fn output(&self) -> &OutputFormat {
        &self.output
    }
}
