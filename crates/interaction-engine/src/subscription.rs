use std::fmt;
use std::str::FromStr;

use pagewire_core_types::Category;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Named category sets. Each preset contains the one before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Minimal,
    Interactive,
    Detailed,
    Debug,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Minimal,
        Preset::Interactive,
        Preset::Detailed,
        Preset::Debug,
    ];

    pub fn categories(&self) -> &'static [Category] {
        use Category::*;
        match self {
            Preset::Minimal => &[Interaction, Navigation, Recording],
            Preset::Interactive => &[Interaction, Navigation, Recording, Input, Focus],
            Preset::Detailed => &[
                Interaction,
                Navigation,
                Recording,
                Input,
                Focus,
                Hover,
                Scroll,
                Mutation,
            ],
            Preset::Debug => &[
                Interaction,
                Navigation,
                Recording,
                Input,
                Focus,
                Hover,
                Scroll,
                Mutation,
                Console,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Minimal => "minimal",
            Preset::Interactive => "interactive",
            Preset::Detailed => "detailed",
            Preset::Debug => "debug",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::UnknownPreset(s.to_string()))
    }
}

/// Which categories reach the sink and the buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subscription {
    Preset { preset: Preset },
    Categories { categories: Vec<Category> },
}

impl Subscription {
    pub fn preset(preset: Preset) -> Self {
        Subscription::Preset { preset }
    }

    pub fn categories(categories: impl IntoIterator<Item = Category>) -> Self {
        Subscription::Categories {
            categories: categories.into_iter().collect(),
        }
    }

    /// Parses `minimal`, `debug`, ... or a comma-separated category list.
    pub fn parse(spec: &str) -> Result<Self, EngineError> {
        if let Ok(preset) = spec.parse::<Preset>() {
            return Ok(Subscription::preset(preset));
        }
        let categories = spec
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Category>()
                    .map_err(|_| EngineError::UnknownCategory(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if categories.is_empty() {
            return Err(EngineError::UnknownPreset(spec.to_string()));
        }
        Ok(Subscription::categories(categories))
    }

    pub fn allowed(&self) -> &[Category] {
        match self {
            Subscription::Preset { preset } => preset.categories(),
            Subscription::Categories { categories } => categories,
        }
    }

    pub fn allows(&self, category: Category) -> bool {
        self.allowed().contains(&category)
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Subscription::preset(Preset::Interactive)
    }
}
