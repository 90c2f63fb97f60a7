//! Target snapshots and the accessibility bits they need.

use pagewire_core_types::dom::closest;
use pagewire_core_types::{DomError, DomPort, ElementDesc, NodeId, SelectorList, TargetInfo};

use crate::strategies::MAX_SELECTOR_TEXT;
use crate::synth::SelectorSynthesizer;
use crate::text::{attr_value, clean_text};

/// Text kept on a [`TargetInfo`].
pub const MAX_TARGET_TEXT: usize = 100;

const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "checkbox",
    "radio",
    "switch",
    "tab",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "combobox",
    "textbox",
    "searchbox",
    "slider",
    "spinbutton",
    "treeitem",
];

/// Snapshot of `node` for a semantic event. `None` when the node is gone.
pub fn target_info(
    dom: &dyn DomPort,
    node: NodeId,
    synth: &SelectorSynthesizer,
) -> Option<TargetInfo> {
    let element = dom.element(node)?;
    let text = clean_text(&element.text, MAX_TARGET_TEXT);
    let role = element
        .non_empty_attr("role")
        .map(str::to_string)
        .or_else(|| implicit_role(&element).map(str::to_string));
    let label = element
        .non_empty_attr("aria-label")
        .map(str::to_string)
        .or_else(|| {
            element
                .is_form_control()
                .then(|| form_label_text(dom, node))
                .flatten()
        })
        .or_else(|| element.non_empty_attr("placeholder").map(str::to_string))
        .or_else(|| element.non_empty_attr("title").map(str::to_string));

    Some(TargetInfo {
        selector: synth.best_selector(dom, node),
        tag: element.tag.clone(),
        id: element.id.clone().filter(|id| !id.is_empty()),
        text: (!text.is_empty()).then_some(text),
        role,
        label,
    })
}

/// Label text of a form control: `label[for=id]`, an enclosing `<label>`,
/// then `aria-labelledby`.
pub fn form_label_text(dom: &dyn DomPort, node: NodeId) -> Option<String> {
    let element = dom.element(node)?;
    label_for_control(dom, node, &element).ok().flatten()
}

pub(crate) fn label_for_control(
    dom: &dyn DomPort,
    node: NodeId,
    element: &ElementDesc,
) -> Result<Option<String>, DomError> {
    if let Some(id) = element.non_empty_attr("id") {
        let selector = format!("label[for={}]", attr_value(id));
        for label in dom.query_all(&selector)? {
            if let Some(text) = dom.element(label).and_then(|el| label_text(&el)) {
                return Ok(Some(text));
            }
        }
    }

    let label_selector = SelectorList::parse("label")?;
    if let Some(text) = closest(dom, node, &label_selector)
        .filter(|label| *label != node)
        .and_then(|label| dom.element(label))
        .and_then(|el| label_text(&el))
    {
        return Ok(Some(text));
    }

    Ok(labelled_by_text(dom, element))
}

/// Concatenated text of the elements named by `aria-labelledby`.
pub(crate) fn labelled_by_text(dom: &dyn DomPort, element: &ElementDesc) -> Option<String> {
    let ids = element.non_empty_attr("aria-labelledby")?;
    let parts: Vec<String> = ids
        .split_whitespace()
        .filter_map(|id| dom.element_by_id(id))
        .filter_map(|node| dom.element(node))
        .map(|el| clean_text(&el.text, MAX_SELECTOR_TEXT))
        .filter(|text| !text.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(clean_text(&parts.join(" "), MAX_SELECTOR_TEXT))
}

fn label_text(label: &ElementDesc) -> Option<String> {
    let text = clean_text(&label.text, MAX_SELECTOR_TEXT);
    (!text.is_empty()).then_some(text)
}

/// ARIA role an element has without a `role` attribute.
pub fn implicit_role(element: &ElementDesc) -> Option<&'static str> {
    let role = match element.tag.as_str() {
        "button" | "summary" => "button",
        "a" | "area" if element.attr("href").is_some() => "link",
        "input" => match element.input_type().as_str() {
            "button" | "submit" | "reset" | "image" => "button",
            "checkbox" => "checkbox",
            "radio" => "radio",
            "range" => "slider",
            "number" => "spinbutton",
            "search" => "searchbox",
            "hidden" => return None,
            "text" | "email" | "tel" | "url" | "password" => "textbox",
            _ => return None,
        },
        "textarea" => "textbox",
        "select" => {
            let multiple = element.attr("multiple").is_some();
            let sized = element
                .attr("size")
                .and_then(|s| s.trim().parse::<u32>().ok())
                .is_some_and(|size| size > 1);
            if multiple || sized {
                "listbox"
            } else {
                "combobox"
            }
        }
        "option" => "option",
        "img" if element.non_empty_attr("alt").is_some() => "img",
        "nav" => "navigation",
        "main" => "main",
        "header" => "banner",
        "footer" => "contentinfo",
        "aside" => "complementary",
        "form" => "form",
        "dialog" => "dialog",
        "article" => "article",
        "section" => "region",
        "ul" | "ol" => "list",
        "li" => "listitem",
        "table" => "table",
        "tr" => "row",
        "td" => "cell",
        "th" => "columnheader",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        "progress" => "progressbar",
        _ => return None,
    };
    Some(role)
}

/// Whether the element accepts direct interaction.
pub fn is_interactive(element: &ElementDesc) -> bool {
    if matches!(
        element.tag.as_str(),
        "a" | "button" | "input" | "select" | "textarea" | "summary" | "option"
    ) {
        return true;
    }
    if element
        .non_empty_attr("role")
        .is_some_and(|role| INTERACTIVE_ROLES.contains(&role))
    {
        return true;
    }
    element.content_editable || element.attr("tabindex").is_some() || element.attr("onclick").is_some()
}
