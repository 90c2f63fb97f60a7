use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

/// Snapshot of one element as seen by the host.
///
/// `attributes` holds every attribute except `id` and `class`, which live in
/// their own fields. Form state (`value`, `checked`, selected options, file
/// names) is captured alongside so aggregators never need a live handle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementDesc {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub selected: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub content_editable: bool,
}

impl ElementDesc {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into().trim().to_string();
        self
    }

    /// Attribute lookup. `id` is answered from its field; `class` is not an
    /// attribute here, use [`ElementDesc::class_attr`].
    pub fn attr(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("id") {
            return self.id.as_deref();
        }
        self.attributes.get(name).map(String::as_str)
    }

    /// Like [`ElementDesc::attr`] but treats empty/whitespace values as absent.
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match name.as_str() {
            "id" => self.id = Some(value),
            "class" => self.classes = split_classes(&value),
            _ => {
                self.attributes.insert(name, value);
            }
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        match name {
            "id" => self.id = None,
            "class" => self.classes.clear(),
            _ => {
                self.attributes.remove(name);
            }
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn class_attr(&self) -> String {
        self.classes.join(" ")
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Lower-cased `type` of an input, `text` when absent. Empty for non-inputs.
    pub fn input_type(&self) -> String {
        if self.tag != "input" {
            return String::new();
        }
        self.attr("type")
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "select" | "textarea")
    }

    pub fn is_custom_element(&self) -> bool {
        self.tag.contains('-')
    }

    /// Iterates attribute names, including `id`/`class` when present.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        let id = self.id.as_ref().map(|_| "id");
        let class = (!self.classes.is_empty()).then_some("class");
        id.into_iter()
            .chain(class)
            .chain(self.attributes.keys().map(String::as_str))
    }
}

pub fn split_classes(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for class in raw.split_whitespace() {
        if !out.iter().any(|c| c == class) {
            out.push(class.to_string());
        }
    }
    out
}
