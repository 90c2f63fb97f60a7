use serde::{Deserialize, Serialize};

/// Watcher limits that are not part of a single request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchDefaults {
    pub debounce_ms: u64,
    /// Records held between flushes; the rest are counted as ignored.
    pub max_pending: usize,
    pub notable_limit: usize,
    /// Elements inspected by framework detection.
    pub detection_scan_limit: usize,
    /// Attribute and text values are clipped to this many characters.
    pub max_value_len: usize,
}

impl Default for WatchDefaults {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            max_pending: 5_000,
            notable_limit: 20,
            detection_scan_limit: 2_000,
            max_value_len: 100,
        }
    }
}
