//! Configuration file model and discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use interaction_engine::EnginePolicy;
use mutation_filter::WatchDefaults;
use pagewire_core_types::SelectorList;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

const LOCAL_CONFIG: &str = "config/pagewire.yaml";

/// Everything `pagewire.yaml` can set. Missing sections keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PagewireConfig {
    pub engine: EnginePolicy,
    pub watch: WatchDefaults,
    pub replay: ReplaySettings,
}

impl PagewireConfig {
    /// Values that parse but cannot work. Empty when the config is usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let engine = &self.engine;
        for (name, value) in [
            ("engine.typingWindowMs", engine.typing_window_ms),
            ("engine.scrollWindowMs", engine.scroll_window_ms),
            ("engine.dwellThresholdMs", engine.dwell_threshold_ms),
            ("engine.dragMinDurationMs", engine.drag_min_duration_ms),
        ] {
            if value <= 0 {
                problems.push(format!("{name} must be positive, got {value}"));
            }
        }
        if engine.buffer_capacity == 0 {
            problems.push("engine.bufferCapacity must be at least 1".to_string());
        }
        for selector in &engine.ignore_within {
            if let Err(err) = SelectorList::parse(selector) {
                problems.push(format!("engine.ignoreWithin: {err}"));
            }
        }
        if self.watch.notable_limit == 0 {
            problems.push("watch.notableLimit must be at least 1".to_string());
        }
        problems
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplaySettings {
    /// Quiet time appended after the last step so pending timers fire.
    pub settle_ms: u64,
    /// Stop the engine once the scenario has settled.
    pub stop_at_end: bool,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            settle_ms: 1_000,
            stop_at_end: false,
        }
    }
}

pub struct LoadedConfig {
    pub config: PagewireConfig,
    pub path: PathBuf,
    pub from_file: bool,
}

/// `--config` wins, then `./config/pagewire.yaml`, then the user config
/// directory. A missing file means defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(local);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("pagewire");
    path.push("config.yaml");
    Ok(path)
}

pub fn parse_config(raw: &str) -> Result<PagewireConfig> {
    if raw.trim().is_empty() {
        return Ok(PagewireConfig::default());
    }
    serde_yaml::from_str(raw).context("Failed to parse config file")
}

pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = resolve_config_path(explicit)?;
    if fs::try_exists(&path).await.unwrap_or(false) {
        let raw = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config = parse_config(&raw).with_context(|| format!("parsing {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(LoadedConfig {
            config,
            path,
            from_file: true,
        })
    } else {
        if explicit.is_some() {
            warn!(path = %path.display(), "config file not found, using defaults");
        }
        Ok(LoadedConfig {
            config: PagewireConfig::default(),
            path,
            from_file: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config(
            "engine:\n  typingWindowMs: 800\nreplay:\n  stopAtEnd: true\n",
        )
        .unwrap();
        assert_eq!(config.engine.typing_window_ms, 800);
        assert_eq!(config.engine.buffer_capacity, 100);
        assert_eq!(config.watch, WatchDefaults::default());
        assert!(config.replay.stop_at_end);
        assert_eq!(config.replay.settle_ms, 1_000);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(parse_config("\n").unwrap(), PagewireConfig::default());
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(parse_config("engine:\n  typingWindowMs: soon\n").is_err());
    }

    #[test]
    fn defaults_have_no_problems() {
        assert!(PagewireConfig::default().problems().is_empty());
    }

    #[test]
    fn problems_name_the_offending_key() {
        let config = parse_config(
            "engine:\n  typingWindowMs: 0\n  bufferCapacity: 0\n  ignoreWithin: ['div[']\n",
        )
        .unwrap();
        let problems = config.problems();
        assert_eq!(problems.len(), 3);
        assert!(problems[0].starts_with("engine.typingWindowMs"));
        assert!(problems[1].starts_with("engine.bufferCapacity"));
        assert!(problems[2].starts_with("engine.ignoreWithin"));
    }

    #[test]
    fn explicit_path_is_used_verbatim() {
        let path = resolve_config_path(Some(Path::new("/tmp/custom.yaml"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.yaml"));
    }
}
