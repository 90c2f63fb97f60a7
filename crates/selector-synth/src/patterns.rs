//! Pattern tables for ids and classes that make poor locators.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ids minted by frameworks or generators; they change between renders.
static AUTO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d",
        r"^:r[0-9a-z]*:?$",
        r"^:[a-z0-9]+:$",
        r":r[0-9a-z]+:",
        r"^(react|ember|ng|mui|radix|headlessui|vue|svelte|rc|downshift|chakra|mantine|el|yui|ext|jsx|mat|cdk)[-_:]?[a-z-]*[-_:]?\d+",
        r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        r"^[a-zA-Z]+[-_]?[0-9a-f]{10,}$",
        r"[-_]\d{4,}$",
        r"^__",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static auto-id pattern"))
    .collect()
});

/// Utility, state and hashed classes that say nothing about what an element
/// is.
static NOISE_CLASS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // responsive / state variants (`md:flex`, `hover:bg-x`) and arbitrary values
        r"[:\[\]/]",
        // tailwind-style utilities
        r"^-?(m|p)[trblxyse]?-(\d|px|auto|\[)",
        r"^(w|h|min-w|min-h|max-w|max-h|size|gap|gap-[xy]|space-[xy]|inset|inset-[xy]|top|right|bottom|left|z|order|basis|col-span|row-span|col-start|row-start|grid-cols|grid-rows)-(\d|px|full|auto|screen|fit|min|max|none|first|last)",
        r"^(text|bg|border|border-[trblxy]|rounded|rounded-[trbl]{1,2}|shadow|ring|ring-offset|outline|divide|fill|stroke|from|via|to|decoration|placeholder|accent|caret)(-|$)",
        r"^(font|leading|tracking|line-clamp|opacity|blur|brightness|backdrop|scale|scale-[xy]|rotate|translate-[xy]|skew-[xy]|origin|cursor|pointer-events|resize|snap|will-change|appearance|overflow|overflow-[xy]|overscroll|whitespace|break|aspect|columns)(-|$)",
        r"^(items|justify|self|place-items|place-content|place-self|flex)-",
        r"^(transition|duration|ease|delay|animate)(-|$)",
        r"^(flex|grid|block|inline|inline-block|inline-flex|inline-grid|contents|table|hidden|relative|absolute|fixed|sticky|static|container|truncate|underline|uppercase|lowercase|capitalize|italic|visible|invisible|clearfix|sr-only|not-sr-only|grow|shrink|antialiased|shadow|border|rounded)$",
        // bootstrap grid / spacing helpers
        r"^col(-(xs|sm|md|lg|xl|xxl))?(-\d+|-auto)?$",
        r"^(d|m|p|g)[tblrxyse]?-((xs|sm|md|lg|xl|xxl)-)?(\d|auto|none|flex|block|inline|grid)$",
        r"^(text|align|float|order|flex|justify-content|align-items)-(xs|sm|md|lg|xl|xxl)-",
        // css-in-js and css-modules hashes
        r"^(css|sc|jsx|emotion|styled|svelte|jss|makeStyles|tw)-[A-Za-z0-9_-]+$",
        r"^_[A-Za-z0-9_-]{5,}$",
        r"__[A-Za-z0-9-]*\d[A-Za-z0-9-]*$",
        r"^[a-z]{1,3}-[a-zA-Z]*\d[a-zA-Z0-9]{4,}$",
        // transient state
        r"^(is|has)-",
        r"^(active|open|show|shown|focus|focused|hover|hovered|selected|disabled|loading|collapsed|expanded|in|fade|collapse|collapsing)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static noise-class pattern"))
    .collect()
});

pub fn is_auto_generated_id(id: &str) -> bool {
    let id = id.trim();
    id.is_empty() || AUTO_ID_PATTERNS.iter().any(|re| re.is_match(id))
}

pub fn is_noise_class(class: &str) -> bool {
    NOISE_CLASS_PATTERNS.iter().any(|re| re.is_match(class))
}

/// Classes worth putting in a locator, in their original order.
pub fn meaningful_classes(classes: &[String]) -> Vec<&str> {
    classes
        .iter()
        .map(String::as_str)
        .filter(|c| !c.is_empty() && !is_noise_class(c))
        .collect()
}
