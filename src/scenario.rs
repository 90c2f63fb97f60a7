//! Scenario files: a page snapshot plus a timeline of things that happen
//! to it.
//!
//! Node references inside raw events and mutation records (`target`,
//! `node`, `parent`) may be written as CSS selectors; they are resolved
//! against the live document when the step runs, so elements appended by
//! earlier steps can be targeted.

use interaction_engine::{EngineError, Subscription};
use mutation_filter::MutationWatchRequest;
use pagewire_core_types::{DomError, MemoryDom, NodeId, NodeSpec, Viewport};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

const NODE_KEYS: [&str; 3] = ["target", "node", "parent"];

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario is not valid: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("step {index}: invalid {what}: {source}")]
    Payload {
        index: usize,
        what: &'static str,
        source: serde_json::Error,
    },
    #[error("no element matches '{0}'")]
    Unresolved(String),
    #[error("step {index} at {at}ms comes before the previous step at {previous}ms")]
    OutOfOrder { index: usize, at: i64, previous: i64 },
    #[error(transparent)]
    Subscription(#[from] EngineError),
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// `"detailed"`, `"input,focus"` or the structured wire form.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum SubscriptionSpec {
    Named(String),
    Structured(Subscription),
}

impl SubscriptionSpec {
    pub fn resolve(&self) -> Result<Subscription, ScenarioError> {
        match self {
            SubscriptionSpec::Named(spec) => Ok(Subscription::parse(spec)?),
            SubscriptionSpec::Structured(subscription) => Ok(subscription.clone()),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum DomSnapshot {
    /// Children of `<body>`; the `<html>` and `<body>` wrappers are implied.
    Body { body: Vec<NodeSpec> },
    Document(NodeSpec),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    /// Page address at the start; used as `from` for the first navigation.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub start_ms: i64,
    #[serde(default)]
    pub viewport: Option<Viewport>,
    /// Page globals visible to framework detection, e.g. `React`.
    #[serde(default)]
    pub globals: Vec<String>,
    pub dom: DomSnapshot,
    #[serde(default)]
    pub subscription: Option<SubscriptionSpec>,
    #[serde(default)]
    pub watch: Option<MutationWatchRequest>,
    /// DOM patches also produce the mutation records a browser would.
    #[serde(default = "default_true")]
    pub auto_mutations: bool,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct Step {
    /// Milliseconds after `startMs`.
    #[serde(default)]
    pub at: i64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// A raw listener event in wire form.
    Raw { event: Value },
    /// Sets the value of a field and fires `input`.
    Type { target: String, value: String },
    /// Moves the viewport and fires `scroll`.
    Scroll { y: f64 },
    SetValue { target: String, value: String },
    SetChecked { target: String, checked: bool },
    SetScrollY { y: f64 },
    SetAttribute {
        target: String,
        name: String,
        value: String,
    },
    RemoveAttribute { target: String, name: String },
    SetText { target: String, text: String },
    Append { parent: String, node: NodeSpec },
    Remove { target: String },
    /// Mutation records in wire form, for changes the patches cannot express.
    Mutations { records: Vec<Value> },
    Mark {
        label: String,
        #[serde(default)]
        payload: Map<String, Value>,
    },
    Watch {
        #[serde(default)]
        request: MutationWatchRequest,
    },
    Unwatch,
    Start {
        #[serde(default)]
        subscription: Option<SubscriptionSpec>,
    },
    Stop,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Raw { .. } => "raw",
            Action::Type { .. } => "type",
            Action::Scroll { .. } => "scroll",
            Action::SetValue { .. } => "setValue",
            Action::SetChecked { .. } => "setChecked",
            Action::SetScrollY { .. } => "setScrollY",
            Action::SetAttribute { .. } => "setAttribute",
            Action::RemoveAttribute { .. } => "removeAttribute",
            Action::SetText { .. } => "setText",
            Action::Append { .. } => "append",
            Action::Remove { .. } => "remove",
            Action::Mutations { .. } => "mutations",
            Action::Mark { .. } => "mark",
            Action::Watch { .. } => "watch",
            Action::Unwatch => "unwatch",
            Action::Start { .. } => "start",
            Action::Stop => "stop",
        }
    }
}

impl Scenario {
    pub fn from_json(raw: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(raw)?;
        scenario.check_order()?;
        Ok(scenario)
    }

    fn check_order(&self) -> Result<(), ScenarioError> {
        let mut previous = 0;
        for (index, step) in self.steps.iter().enumerate() {
            if step.at < previous {
                return Err(ScenarioError::OutOfOrder {
                    index,
                    at: step.at,
                    previous,
                });
            }
            previous = step.at;
        }
        Ok(())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    /// Interactive when the scenario does not say.
    pub fn subscription(&self) -> Result<Subscription, ScenarioError> {
        self.subscription
            .as_ref()
            .map(SubscriptionSpec::resolve)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    pub fn build_dom(&self) -> MemoryDom {
        let dom = match &self.dom {
            DomSnapshot::Body { body } => MemoryDom::with_body(body.iter().cloned()),
            DomSnapshot::Document(root) => MemoryDom::new(root.clone()),
        };
        if let Some(viewport) = self.viewport {
            dom.set_viewport(viewport);
        }
        for global in &self.globals {
            dom.set_global(global.clone());
        }
        dom
    }

    /// Time of the last step, relative to `startMs`.
    pub fn duration(&self) -> i64 {
        self.steps.last().map(|step| step.at).unwrap_or(0)
    }
}

pub fn resolve_node(dom: &MemoryDom, selector: &str) -> Result<NodeId, ScenarioError> {
    dom.find_deep(selector)
        .ok_or_else(|| ScenarioError::Unresolved(selector.to_string()))
}

/// Replaces selector strings under node-reference keys with node ids.
/// Element descriptions are left alone; their attributes may legitimately
/// be called `target`.
pub fn resolve_nodes(value: &mut Value, dom: &MemoryDom) -> Result<(), ScenarioError> {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if key == "element" {
                    continue;
                }
                if NODE_KEYS.contains(&key.as_str()) {
                    if let Value::String(selector) = entry {
                        let node = resolve_node(dom, selector)?;
                        *entry = Value::from(node.0);
                        continue;
                    }
                }
                resolve_nodes(entry, dom)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                resolve_nodes(item, dom)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewire_core_types::DomPort;
    use serde_json::json;

    fn scenario(value: Value) -> Result<Scenario, ScenarioError> {
        Scenario::from_json(&value.to_string())
    }

    #[test]
    fn parses_body_shorthand_and_steps() {
        let scenario = scenario(json!({
            "name": "login",
            "dom": { "body": [{ "tag": "input", "id": "user", "attributes": { "type": "text" } }] },
            "subscription": "detailed",
            "steps": [
                { "at": 0, "action": "type", "target": "#user", "value": "a" },
                { "at": 120, "action": "mark", "label": "checkpoint" },
                { "at": 300, "action": "stop" }
            ]
        }))
        .unwrap();
        assert_eq!(scenario.display_name(), "login");
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[1].action.name(), "mark");
        assert_eq!(scenario.duration(), 300);
        assert!(scenario.auto_mutations);
        assert!(scenario.subscription().unwrap().allows(pagewire_core_types::Category::Scroll));

        let dom = scenario.build_dom();
        let user = dom.find("#user").unwrap();
        assert_eq!(dom.element(user).unwrap().input_type(), "text");
    }

    #[test]
    fn subscription_defaults_to_interactive() {
        let scenario = scenario(json!({ "dom": { "body": [] } })).unwrap();
        assert_eq!(scenario.subscription().unwrap(), Subscription::default());
    }

    #[test]
    fn category_list_subscription() {
        let scenario = scenario(json!({
            "dom": { "body": [] },
            "subscription": { "categories": ["input", "focus"] }
        }))
        .unwrap();
        assert_eq!(
            scenario.subscription().unwrap().allowed(),
            &[
                pagewire_core_types::Category::Input,
                pagewire_core_types::Category::Focus
            ]
        );
    }

    #[test]
    fn unknown_subscription_is_an_error() {
        let scenario = scenario(json!({ "dom": { "body": [] }, "subscription": "verbose" })).unwrap();
        assert!(matches!(
            scenario.subscription(),
            Err(ScenarioError::Subscription(_))
        ));
    }

    #[test]
    fn steps_must_be_ordered() {
        let err = scenario(json!({
            "dom": { "body": [] },
            "steps": [
                { "at": 50, "action": "stop" },
                { "at": 10, "action": "unwatch" }
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, ScenarioError::OutOfOrder { index: 1, at: 10, previous: 50 }));
    }

    #[test]
    fn selectors_become_node_ids() {
        let dom = MemoryDom::with_body([
            NodeSpec::new("ul").id("list"),
            NodeSpec::new("a").id("help").attr("target", "_blank"),
        ]);
        let list = dom.find("#list").unwrap();
        let help = dom.find("#help").unwrap();
        let mut record = json!({
            "type": "childList",
            "target": "#list",
            "removed": [{ "node": "#help", "element": { "tag": "a", "attributes": { "target": "_blank" } } }]
        });
        resolve_nodes(&mut record, &dom).unwrap();
        assert_eq!(record["target"], json!(list.0));
        assert_eq!(record["removed"][0]["node"], json!(help.0));
        assert_eq!(record["removed"][0]["element"]["attributes"]["target"], json!("_blank"));
    }

    #[test]
    fn numeric_targets_pass_through() {
        let dom = MemoryDom::with_body([]);
        let mut event = json!({ "type": "click", "target": 7 });
        resolve_nodes(&mut event, &dom).unwrap();
        assert_eq!(event["target"], json!(7));
    }

    #[test]
    fn missing_selector_is_reported() {
        let dom = MemoryDom::with_body([]);
        let mut event = json!({ "type": "click", "target": "#nowhere" });
        assert!(matches!(
            resolve_nodes(&mut event, &dom),
            Err(ScenarioError::Unresolved(selector)) if selector == "#nowhere"
        ));
    }
}
