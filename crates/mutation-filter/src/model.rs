use pagewire_core_types::{ElementDesc, NodeId};
use serde::{Deserialize, Serialize};

use crate::rules::FilterRules;

/// One raw record as delivered by a [`crate::MutationSource`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MutationRecord {
    #[serde(rename = "childList", rename_all = "camelCase")]
    ChildList {
        target: NodeId,
        #[serde(default)]
        added: Vec<MutationNode>,
        #[serde(default)]
        removed: Vec<MutationNode>,
    },
    #[serde(rename = "attributes", rename_all = "camelCase")]
    Attributes {
        target: NodeId,
        attribute_name: String,
        #[serde(default)]
        old_value: Option<String>,
        /// Value after the change; read from the document when absent.
        #[serde(default)]
        new_value: Option<String>,
    },
    #[serde(rename = "characterData", rename_all = "camelCase")]
    CharacterData {
        target: NodeId,
        /// Element owning the text node; `target` itself when absent.
        #[serde(default)]
        parent: Option<NodeId>,
        #[serde(default)]
        old_value: Option<String>,
        #[serde(default)]
        new_value: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl MutationRecord {
    pub fn is_unknown(&self) -> bool {
        matches!(self, MutationRecord::Unknown)
    }
}

/// Node carried by a `childList` record. Removed nodes are usually gone from
/// the document by flush time, so sources attach a description. Nodes with
/// no description that the document cannot describe either are non-element
/// nodes and are skipped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationNode {
    pub node: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementDesc>,
}

impl MutationNode {
    pub fn live(node: NodeId) -> Self {
        Self {
            node,
            element: None,
        }
    }

    pub fn detached(node: NodeId, element: ElementDesc) -> Self {
        Self {
            node,
            element: Some(element),
        }
    }
}

/// `MutationObserver` options handed to the source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: true,
            subtree: true,
            attribute_old_value: true,
            character_data_old_value: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MutationWatchRequest {
    /// CSS selector of the observed root; `body` when absent.
    pub root: Option<String>,
    /// `smart`, `none`, or a framework preset name.
    pub preset: String,
    pub filters: Option<FilterRules>,
    pub debounce_ms: Option<u64>,
    pub pierce_shadow: bool,
    pub observe: ObserveOptions,
}

impl Default for MutationWatchRequest {
    fn default() -> Self {
        Self {
            root: None,
            preset: "smart".to_string(),
            filters: None,
            debounce_ms: None,
            pierce_shadow: false,
            observe: ObserveOptions::default(),
        }
    }
}

impl MutationWatchRequest {
    pub fn root_selector(&self) -> &str {
        self.root
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("body")
    }
}

/// Watcher counters since the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchStats {
    pub records: u64,
    pub batches: u64,
    pub ignored: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_decode_from_observer_shape() {
        let records: Vec<MutationRecord> = serde_json::from_value(json!([
            {"type": "childList", "target": 2, "added": [{"node": 9}]},
            {"type": "attributes", "target": 3, "attributeName": "class", "oldValue": "a b"},
            {"type": "characterData", "target": 11, "parent": 4, "newValue": "hi"},
            {"type": "somethingNew", "target": 1}
        ]))
        .unwrap();
        assert_eq!(records.len(), 4);
        assert!(matches!(
            &records[1],
            MutationRecord::Attributes { attribute_name, old_value: Some(old), .. }
                if attribute_name == "class" && old == "a b"
        ));
        assert!(records[3].is_unknown());
    }

    #[test]
    fn request_defaults_to_smart_body_watch() {
        let request: MutationWatchRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request.preset, "smart");
        assert_eq!(request.root_selector(), "body");
        assert!(request.observe.subtree);
    }
}
