use anyhow::Result;
use interaction_engine::ports::LISTENED_EVENTS;
use interaction_engine::Preset;
use pagewire_core_types::Category;
use serde::Serialize;

use crate::cli::context::CliContext;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemInfo {
    name: &'static str,
    version: &'static str,
    config_path: String,
    config_loaded: bool,
    listened_events: Vec<&'static str>,
    categories: Vec<Category>,
    default_subscription: Preset,
    typing_window_ms: i64,
    scroll_window_ms: i64,
    dwell_threshold_ms: i64,
    buffer_capacity: usize,
    debounce_ms: u64,
}

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let info = SystemInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        config_path: ctx.config_path().display().to_string(),
        config_loaded: ctx.config_from_file(),
        listened_events: LISTENED_EVENTS.to_vec(),
        categories: Category::ALL.to_vec(),
        default_subscription: Preset::Interactive,
        typing_window_ms: config.engine.typing_window_ms,
        scroll_window_ms: config.engine.scroll_window_ms,
        dwell_threshold_ms: config.engine.dwell_threshold_ms,
        buffer_capacity: config.engine.buffer_capacity,
        debounce_ms: config.watch.debounce_ms,
    };

    ctx.output().print(&info, || {
        let source = if info.config_loaded {
            "loaded"
        } else {
            "not found, using defaults"
        };
        let categories: Vec<_> = info.categories.iter().map(|c| c.as_str()).collect();
        let mut lines = vec![
            "pagewire System Information".to_string(),
            "===========================".to_string(),
            format!("Version: {}", info.version),
            String::new(),
            "Configuration:".to_string(),
            format!("- Path: {} ({source})", info.config_path),
            format!("- Typing window: {}ms", info.typing_window_ms),
            format!("- Scroll window: {}ms", info.scroll_window_ms),
            format!("- Dwell threshold: {}ms", info.dwell_threshold_ms),
            format!("- Buffer capacity: {}", info.buffer_capacity),
            format!("- Mutation debounce: {}ms", info.debounce_ms),
            String::new(),
            "Engine:".to_string(),
            format!("- Listened events: {}", info.listened_events.len()),
            format!("- Categories: {}", categories.join(", ")),
            format!("- Default subscription: {}", info.default_subscription),
        ];
        lines.push(String::new());
        lines.join("\n")
    })
}
