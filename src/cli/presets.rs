use std::fmt::Write as _;

use anyhow::Result;
use interaction_engine::Preset;
use mutation_filter::{preset_names, RulePreset};
use pagewire_core_types::Category;
use serde::Serialize;

use crate::cli::context::CliContext;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PresetTable {
    subscriptions: Vec<SubscriptionRow>,
    rules: Vec<RuleRow>,
}

#[derive(Debug, Serialize)]
struct SubscriptionRow {
    name: &'static str,
    categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RuleRow {
    name: &'static str,
    rules: usize,
    detects_frameworks: bool,
}

fn preset_table() -> PresetTable {
    let subscriptions = Preset::ALL
        .iter()
        .map(|preset| SubscriptionRow {
            name: preset.as_str(),
            categories: preset.categories().to_vec(),
        })
        .collect();
    let rules = preset_names()
        .into_iter()
        .map(|name| {
            let preset = RulePreset::parse(name);
            RuleRow {
                name,
                rules: preset.base_rules().len(),
                detects_frameworks: preset.detects_frameworks(),
            }
        })
        .collect();
    PresetTable {
        subscriptions,
        rules,
    }
}

pub fn cmd_presets(ctx: &CliContext) -> Result<()> {
    let table = preset_table();
    ctx.output().print(&table, || {
        let mut out = String::from("Subscription presets:\n");
        for row in &table.subscriptions {
            let names: Vec<_> = row.categories.iter().map(|c| c.as_str()).collect();
            let _ = writeln!(out, "  {:<12} {}", row.name, names.join(", "));
        }
        out.push_str("\nMutation rule presets:\n");
        for row in &table.rules {
            let detection = if row.detects_frameworks {
                " + detected frameworks"
            } else {
                ""
            };
            let _ = writeln!(out, "  {:<12} {} rules{}", row.name, row.rules, detection);
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_every_preset() {
        let table = preset_table();
        let names: Vec<_> = table.subscriptions.iter().map(|row| row.name).collect();
        assert_eq!(names, vec!["minimal", "interactive", "detailed", "debug"]);
        assert_eq!(table.subscriptions[3].categories.len(), 9);
        assert_eq!(table.rules[0].name, "none");
        assert_eq!(table.rules[0].rules, 0);
        assert!(table.rules[1].detects_frameworks);
    }
}
