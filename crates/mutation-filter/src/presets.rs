//! Built-in rule sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rules::{strings, FilterRules};

/// Libraries with a rule preset of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    React,
    Vue,
    Angular,
    Svelte,
    Tailwind,
    Bootstrap,
    Htmx,
}

impl Framework {
    pub const ALL: [Framework; 7] = [
        Framework::React,
        Framework::Vue,
        Framework::Angular,
        Framework::Svelte,
        Framework::Tailwind,
        Framework::Bootstrap,
        Framework::Htmx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::React => "react",
            Framework::Vue => "vue",
            Framework::Angular => "angular",
            Framework::Svelte => "svelte",
            Framework::Tailwind => "tailwind",
            Framework::Bootstrap => "bootstrap",
            Framework::Htmx => "htmx",
        }
    }

    pub fn rules(&self) -> FilterRules {
        match self {
            Framework::React => FilterRules {
                ignore_attributes: strings(&["^data-reactroot$", "^data-reactid$"]),
                ..Default::default()
            },
            Framework::Vue => FilterRules {
                ignore_classes: strings(&[
                    "^v-(enter|leave)",
                    "-(enter|leave)(-active|-from|-to)?$",
                    "-move$",
                ]),
                ignore_attributes: strings(&["^data-v-[0-9a-f]+$"]),
                ..Default::default()
            },
            Framework::Angular => FilterRules {
                ignore_classes: strings(&[
                    "^ng-(touched|untouched|dirty|pristine|valid|invalid|pending)$",
                    "^ng-(animating|animate|trigger|star-inserted|enter|leave)",
                ]),
                ignore_attributes: strings(&[
                    "^_ngcontent-",
                    "^_nghost-",
                    "^ng-reflect-",
                    "^ng-version$",
                ]),
                ..Default::default()
            },
            Framework::Svelte => FilterRules {
                ignore_classes: strings(&["^svelte-[a-z0-9]+$"]),
                ..Default::default()
            },
            Framework::Tailwind => FilterRules {
                ignore_classes: strings(&[
                    "^-?(p|m)[trblxy]?-",
                    "^(bg|text|border|ring|shadow|opacity|translate-[xy]|scale|rotate|blur)-",
                    "^(hover|focus|active|group-hover|focus-within|dark|disabled|sm|md|lg|xl|2xl):",
                    "^(transition|duration|ease|delay|animate)(-|$)",
                ]),
                ..Default::default()
            },
            Framework::Bootstrap => FilterRules {
                ignore_classes: strings(&[
                    "^(show|showing|fade|collapsing|collapse|in|modal-open)$",
                    "^(was-validated)$",
                ]),
                interesting_classes: strings(&[
                    "^(modal|alert|toast|dropdown-menu|invalid-feedback)$",
                ]),
                ..Default::default()
            },
            Framework::Htmx => FilterRules {
                ignore_classes: strings(&[
                    "^htmx-(request|settling|swapping|added|indicator)$",
                ]),
                ..Default::default()
            },
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Framework::ALL
            .into_iter()
            .find(|fw| fw.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown framework preset '{s}'"))
    }
}

/// Rule presets a watch request can name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RulePreset {
    /// No rules at all.
    None,
    /// Common noise baseline plus whatever frameworks are detected.
    Smart,
    /// Common noise baseline plus one framework's rules; no detection.
    Framework(Framework),
}

impl RulePreset {
    /// Unknown names resolve to `Smart`.
    pub fn parse(name: &str) -> RulePreset {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "" => RulePreset::None,
            "smart" | "auto" => RulePreset::Smart,
            other => other
                .parse::<Framework>()
                .map(RulePreset::Framework)
                .unwrap_or(RulePreset::Smart),
        }
    }

    pub fn detects_frameworks(&self) -> bool {
        matches!(self, RulePreset::Smart)
    }

    pub fn base_rules(&self) -> FilterRules {
        match self {
            RulePreset::None => FilterRules::default(),
            RulePreset::Smart => smart_baseline(),
            RulePreset::Framework(fw) => smart_baseline().merge(&fw.rules()),
        }
    }
}

pub fn preset_names() -> Vec<&'static str> {
    let mut names = vec!["none", "smart"];
    names.extend(Framework::ALL.iter().map(|fw| fw.as_str()));
    names
}

/// Noise every page has: transient state classes, style churn, live-region
/// bookkeeping and non-visual elements.
pub fn smart_baseline() -> FilterRules {
    FilterRules {
        ignore_classes: strings(&[
            "^(is|has)-",
            "^(hover|hovered|focus|focused|focus-visible|active)$",
            "^fade",
            "^animat",
            "(^|-)transition",
            "^(entering|entered|exiting|exited|leaving)$",
        ]),
        ignore_attributes: strings(&[
            "^style$",
            "^aria-(busy|live|atomic|relevant|activedescendant)$",
            "^data-(timestamp|time|updated|last-updated|tick)$",
        ]),
        ignore_elements: strings(&[
            "script",
            "style",
            "link",
            "meta",
            "noscript",
            "template",
            "[data-pagewire-widget]",
        ]),
        interesting_classes: strings(&[
            "error",
            "invalid",
            "success",
            "warning",
            "alert",
            "modal",
            "dialog",
            "toast",
            "notification",
        ]),
        interesting_attributes: strings(&[
            "^aria-(expanded|selected|checked|pressed|hidden|invalid|disabled|current)$",
            "^(disabled|hidden|open|checked|selected|required|readonly)$",
            "^(value|href|src)$",
        ]),
        only_selectors: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_names_resolve() {
        assert_eq!(RulePreset::parse("none"), RulePreset::None);
        assert_eq!(RulePreset::parse("Smart"), RulePreset::Smart);
        assert_eq!(
            RulePreset::parse("vue"),
            RulePreset::Framework(Framework::Vue)
        );
        assert_eq!(RulePreset::parse("mystery"), RulePreset::Smart);
    }

    #[test]
    fn framework_preset_extends_the_baseline() {
        let baseline = smart_baseline();
        let angular = RulePreset::Framework(Framework::Angular).base_rules();
        assert!(angular.len() > baseline.len());
        assert!(angular
            .ignore_attributes
            .iter()
            .any(|rule| rule == "^_ngcontent-"));
        assert!(RulePreset::None.base_rules().is_empty());
    }

    #[test]
    fn every_framework_has_rules() {
        for fw in Framework::ALL {
            assert!(!fw.rules().is_empty(), "{fw} has no rules");
        }
        assert_eq!(preset_names().len(), 9);
    }
}
