use serde::{Deserialize, Serialize};

/// Windows and thresholds of the aggregation machines. All values are in
/// milliseconds or CSS pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnginePolicy {
    pub typing_window_ms: i64,
    pub scroll_window_ms: i64,
    /// A scroll gesture shorter than this is not reported.
    pub scroll_min_distance: f64,
    /// Distance from either end of the document reported as `top`/`bottom`.
    pub scroll_edge: f64,
    pub dwell_threshold_ms: i64,
    pub drag_min_distance: f64,
    pub drag_min_duration_ms: i64,
    pub buffer_capacity: usize,
    /// Events whose target sits inside one of these are the widget's own.
    pub ignore_within: Vec<String>,
    pub max_console_message: usize,
    pub max_clipboard_text: usize,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            typing_window_ms: 500,
            scroll_window_ms: 150,
            scroll_min_distance: 50.0,
            scroll_edge: 100.0,
            dwell_threshold_ms: 300,
            drag_min_distance: 10.0,
            drag_min_duration_ms: 200,
            buffer_capacity: 100,
            ignore_within: vec!["[data-pagewire-widget]".to_string()],
            max_console_message: 500,
            max_clipboard_text: 100,
        }
    }
}
