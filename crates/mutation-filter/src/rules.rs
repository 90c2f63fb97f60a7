use serde::{Deserialize, Serialize};

/// Six independent pattern lists. Class and attribute entries are regular
/// expressions (literal text when they do not compile); element entries are
/// CSS selectors (a bare tag name when they do not parse).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterRules {
    pub ignore_classes: Vec<String>,
    pub ignore_attributes: Vec<String>,
    pub ignore_elements: Vec<String>,
    pub interesting_classes: Vec<String>,
    pub interesting_attributes: Vec<String>,
    pub only_selectors: Vec<String>,
}

impl FilterRules {
    /// Union by concatenation. Nothing is ever removed.
    pub fn merge(mut self, other: &FilterRules) -> FilterRules {
        self.ignore_classes.extend(other.ignore_classes.iter().cloned());
        self.ignore_attributes
            .extend(other.ignore_attributes.iter().cloned());
        self.ignore_elements.extend(other.ignore_elements.iter().cloned());
        self.interesting_classes
            .extend(other.interesting_classes.iter().cloned());
        self.interesting_attributes
            .extend(other.interesting_attributes.iter().cloned());
        self.only_selectors.extend(other.only_selectors.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ignore_classes.is_empty()
            && self.ignore_attributes.is_empty()
            && self.ignore_elements.is_empty()
            && self.interesting_classes.is_empty()
            && self.interesting_attributes.is_empty()
            && self.only_selectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ignore_classes.len()
            + self.ignore_attributes.len()
            + self.ignore_elements.len()
            + self.interesting_classes.len()
            + self.interesting_attributes.len()
            + self.only_selectors.len()
    }
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_concatenates_and_keeps_duplicates() {
        let a = FilterRules {
            ignore_classes: strings(&["^is-"]),
            ..Default::default()
        };
        let b = FilterRules {
            ignore_classes: strings(&["^is-", "fade"]),
            only_selectors: strings(&["main"]),
            ..Default::default()
        };
        let merged = a.merge(&b);
        assert_eq!(merged.ignore_classes, strings(&["^is-", "^is-", "fade"]));
        assert_eq!(merged.only_selectors, strings(&["main"]));
        assert_eq!(merged.len(), 4);
        assert!(!merged.is_empty());
        assert!(FilterRules::default().is_empty());
    }

    #[test]
    fn rules_use_camel_case_on_the_wire() {
        let rules: FilterRules =
            serde_json::from_str(r#"{"ignoreClasses":["x"],"interestingAttributes":["aria-.*"]}"#)
                .unwrap();
        assert_eq!(rules.ignore_classes, strings(&["x"]));
        assert_eq!(rules.interesting_attributes, strings(&["aria-.*"]));
    }
}
