use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use pagewire_cli::config::{parse_config, PagewireConfig};
use serde_json::{Map, Value as JsonValue};
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the configuration file path in use
    Path,

    /// Get a configuration value (dotted camelCase key, e.g. engine.typingWindowMs)
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value and save the file
    Set {
        /// Configuration key
        key: String,

        /// Configuration value (JSON, or a bare string)
        value: String,
    },

    /// Reset configuration to defaults
    Reset,

    /// Validate the configuration file
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path().to_path_buf();
    match args.action {
        ConfigAction::Show => {
            let config = ctx.config();
            ctx.output()
                .print(config, || serde_yaml::to_string(config).unwrap_or_default())?;
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Get { key } => {
            let json = serde_json::to_value(ctx.config())?;
            let segments = split_key(&key)?;
            match get_json_value(&json, &segments) {
                Some(value) => ctx
                    .output()
                    .print(value, || serde_yaml::to_string(value).unwrap_or_default())?,
                None => bail!("{} not found in configuration", key),
            }
        }
        ConfigAction::Set { key, value } => {
            let config = load_config_file(&path).await?;
            let mut json = serde_json::to_value(&config)?;
            let segments = split_key(&key)?;
            set_json_value(&mut json, &segments, parse_cli_value(&value))?;
            let config: PagewireConfig = serde_json::from_value(json)
                .with_context(|| format!("{key} = {value} does not fit the configuration"))?;
            save_config_file(&path, &config).await?;
            info!(key = %key, path = %path.display(), "configuration updated");
            println!("Saved configuration to {}", path.display());
        }
        ConfigAction::Reset => {
            save_config_file(&path, &PagewireConfig::default()).await?;
            println!(
                "Configuration reset to defaults and written to {}",
                path.display()
            );
        }
        ConfigAction::Validate => {
            if !fs::try_exists(&path).await? {
                println!(
                    "No configuration file at {}; defaults are valid",
                    path.display()
                );
                return Ok(());
            }
            let config = load_config_file(&path).await?;
            let problems = config.problems();
            if !problems.is_empty() {
                for problem in &problems {
                    eprintln!("- {problem}");
                }
                bail!(
                    "{} has {} problem(s)",
                    path.display(),
                    problems.len()
                );
            }
            println!("Configuration file {} is valid", path.display());
        }
    }

    Ok(())
}

async fn load_config_file(path: &Path) -> Result<PagewireConfig> {
    if fs::try_exists(path).await? {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        parse_config(&raw).with_context(|| format!("parsing {}", path.display()))
    } else {
        Ok(PagewireConfig::default())
    }
}

async fn save_config_file(path: &Path, config: &PagewireConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let serialized = serde_yaml::to_string(config)?;
    fs::write(path, serialized)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn parse_cli_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        bail!("configuration key cannot be empty");
    }
    Ok(segments)
}

fn set_json_value(target: &mut JsonValue, path: &[&str], value: JsonValue) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        bail!("configuration key cannot be empty");
    };
    let mut current = target;
    for segment in parents {
        current = ensure_object(current, segment)?
            .entry((*segment).to_string())
            .or_insert(JsonValue::Null);
    }
    ensure_object(current, last)?.insert((*last).to_string(), value);
    Ok(())
}

fn ensure_object<'a>(
    value: &'a mut JsonValue,
    segment: &str,
) -> Result<&'a mut Map<String, JsonValue>> {
    if value.is_null() {
        *value = JsonValue::Object(Map::new());
    }
    match value {
        JsonValue::Object(map) => Ok(map),
        _ => bail!(
            "{} resolves to a non-object value; cannot assign nested configuration",
            segment
        ),
    }
}

fn get_json_value<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut current = value;
    for segment in path {
        match current {
            JsonValue::Object(map) => {
                current = map.get(*segment)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_and_get_nested_keys() {
        let mut doc = serde_json::to_value(PagewireConfig::default()).unwrap();
        set_json_value(&mut doc, &["engine", "typingWindowMs"], JsonValue::from(750)).unwrap();
        set_json_value(&mut doc, &["replay", "stopAtEnd"], JsonValue::Bool(true)).unwrap();
        assert_eq!(
            get_json_value(&doc, &["engine", "typingWindowMs"]),
            Some(&JsonValue::from(750))
        );
        let config: PagewireConfig = serde_json::from_value(doc).unwrap();
        assert_eq!(config.engine.typing_window_ms, 750);
        assert!(config.replay.stop_at_end);
    }

    #[test]
    fn scalar_parents_are_rejected() {
        let mut doc = json!({ "engine": 5 });
        assert!(set_json_value(&mut doc, &["engine", "x"], JsonValue::Null).is_err());
    }

    #[test]
    fn bare_strings_stay_strings() {
        assert_eq!(parse_cli_value("800"), json!(800));
        assert_eq!(parse_cli_value("[\"a\"]"), json!(["a"]));
        assert_eq!(parse_cli_value("main"), json!("main"));
    }
}
