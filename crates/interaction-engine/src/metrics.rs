//! Noise metrics: how many raw events it took to produce the semantic stream.

use std::collections::BTreeMap;

use mutation_filter::WatchStats;
use pagewire_core_types::Category;
use serde::{Deserialize, Serialize};

use crate::subscription::{Preset, Subscription};

/// Percentage of raw events that did not turn into semantic events,
/// clamped to `0..=100`. Zero when nothing was observed.
pub fn noise_reduction(semantic: u64, raw: u64) -> i64 {
    if raw == 0 {
        return 0;
    }
    let ratio = 1.0 - semantic as f64 / raw as f64;
    ((ratio * 100.0).round() as i64).clamp(0, 100)
}

/// Semantic output a preset would have let through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetProjection {
    pub semantic: u64,
    pub noise_reduction: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCounts {
    pub total: u64,
    pub by_type: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticCounts {
    pub total: u64,
    pub by_category: BTreeMap<Category, u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    /// Milliseconds since the last `start`.
    pub duration: i64,
    pub raw: RawCounts,
    pub semantic: SemanticCounts,
    pub by_preset: BTreeMap<String, PresetProjection>,
    pub noise_reduction: i64,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    pub buffered: usize,
    pub mutations: WatchStats,
}

#[derive(Clone, Debug, Default)]
pub struct NoiseMetrics {
    raw: BTreeMap<String, u64>,
    semantic: BTreeMap<Category, u64>,
    started_at: Option<i64>,
}

impl NoiseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self, now: i64) {
        self.raw.clear();
        self.semantic.clear();
        self.started_at = Some(now);
    }

    pub fn record_raw(&mut self, name: &str, count: u64) {
        if count == 0 {
            return;
        }
        *self.raw.entry(name.to_string()).or_default() += count;
    }

    pub fn record_semantic(&mut self, category: Category) {
        *self.semantic.entry(category).or_default() += 1;
    }

    pub fn raw_total(&self) -> u64 {
        self.raw.values().sum()
    }

    pub fn semantic_total(&self) -> u64 {
        self.semantic.values().sum()
    }

    pub fn noise_reduction(&self) -> i64 {
        noise_reduction(self.semantic_total(), self.raw_total())
    }

    pub fn by_preset(&self) -> BTreeMap<String, PresetProjection> {
        let raw = self.raw_total();
        Preset::ALL
            .into_iter()
            .map(|preset| {
                let semantic: u64 = preset
                    .categories()
                    .iter()
                    .filter_map(|c| self.semantic.get(c))
                    .sum();
                (
                    preset.as_str().to_string(),
                    PresetProjection {
                        semantic,
                        noise_reduction: noise_reduction(semantic, raw),
                    },
                )
            })
            .collect()
    }

    pub fn duration(&self, now: i64) -> i64 {
        self.started_at.map(|at| (now - at).max(0)).unwrap_or(0)
    }

    pub fn raw_counts(&self) -> RawCounts {
        RawCounts {
            total: self.raw_total(),
            by_type: self.raw.clone(),
        }
    }

    pub fn semantic_counts(&self) -> SemanticCounts {
        SemanticCounts {
            total: self.semantic_total(),
            by_category: self.semantic.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_is_clamped_and_rounded() {
        assert_eq!(noise_reduction(0, 0), 0);
        assert_eq!(noise_reduction(0, 40), 100);
        assert_eq!(noise_reduction(40, 40), 0);
        assert_eq!(noise_reduction(60, 40), 0);
        assert_eq!(noise_reduction(1, 3), 67);
    }

    #[test]
    fn presets_project_semantic_counts() {
        let mut metrics = NoiseMetrics::new();
        metrics.reset(1_000);
        metrics.record_raw("mouseover", 18);
        metrics.record_raw("click", 2);
        metrics.record_semantic(Category::Interaction);
        metrics.record_semantic(Category::Hover);
        metrics.record_semantic(Category::Hover);

        let by_preset = metrics.by_preset();
        assert_eq!(by_preset["minimal"].semantic, 1);
        assert_eq!(by_preset["minimal"].noise_reduction, 95);
        assert_eq!(by_preset["detailed"].semantic, 3);
        assert_eq!(metrics.noise_reduction(), 85);
        assert_eq!(metrics.duration(1_250), 250);
    }

    #[test]
    fn stats_serialize_with_nested_counts() {
        let mut metrics = NoiseMetrics::new();
        metrics.reset(0);
        metrics.record_raw("click", 1);
        metrics.record_raw("keydown", 3);
        metrics.record_semantic(Category::Interaction);
        let stats = EngineStats {
            duration: metrics.duration(500),
            raw: metrics.raw_counts(),
            semantic: metrics.semantic_counts(),
            by_preset: metrics.by_preset(),
            noise_reduction: metrics.noise_reduction(),
            enabled: true,
            subscription: None,
            buffered: 1,
            mutations: WatchStats::default(),
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["duration"], 500);
        assert_eq!(json["raw"]["total"], 4);
        assert_eq!(json["raw"]["byType"]["keydown"], 3);
        assert_eq!(json["semantic"]["total"], 1);
        assert_eq!(json["semantic"]["byCategory"]["interaction"], 1);
        assert_eq!(json["byPreset"]["minimal"]["semantic"], 1);
        assert_eq!(json["noiseReduction"], 75);
        assert!(json.get("rawTotal").is_none());

        let back: EngineStats = serde_json::from_value(json).unwrap();
        assert_eq!(back, stats);
    }
}
