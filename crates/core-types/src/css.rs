//! CSS selector matcher.
//!
//! Supports what the engine actually needs against element snapshots:
//! selector lists of compound selectors made of a tag (or `*`), `#id`,
//! `.class` and `[attr]` / `[attr=v]` / `[attr^=v]` / `[attr$=v]` /
//! `[attr*=v]` / `[attr~=v]`, chained with descendant (` `) and child (`>`)
//! combinators. Sibling combinators and pseudo-classes are reported as
//! [`DomError::UnsupportedSelector`]; malformed input as
//! [`DomError::InvalidSelector`].

use crate::dom::{ancestors, DomPort, NodeId};
use crate::element::ElementDesc;
use crate::errors::DomError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<Complex>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// `subject` plus the compounds to its left, nearest first. Each entry's
/// combinator links it to the compound on its right.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Complex {
    subject: Compound,
    context: Vec<(Combinator, Compound)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttrTest {
    name: String,
    op: AttrOp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Word(String),
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(DomError::invalid(source));
        }
        let mut selectors = Vec::new();
        for part in split_top_level(trimmed).map_err(|_| DomError::invalid(source))? {
            selectors.push(parse_complex(part.trim(), source)?);
        }
        Ok(Self {
            source: trimmed.to_string(),
            selectors,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when some selector in the list has a combinator and so needs the
    /// element's ancestors to be evaluated.
    pub fn needs_ancestors(&self) -> bool {
        self.selectors.iter().any(|s| !s.context.is_empty())
    }

    /// Matches `element` on its own. Selectors with combinators never match
    /// here; use [`SelectorList::matches_path`] or
    /// [`SelectorList::matches_node`].
    pub fn matches(&self, element: &ElementDesc) -> bool {
        self.matches_path(element, &[])
    }

    /// Matches `element` given its ancestor elements, nearest first.
    pub fn matches_path(&self, element: &ElementDesc, ancestors: &[&ElementDesc]) -> bool {
        self.selectors.iter().any(|selector| {
            selector.subject.matches(element) && context_matches(&selector.context, ancestors)
        })
    }

    /// Matches a live node, reading ancestors from `dom` when a combinator
    /// needs them. Ancestors stop at shadow-root boundaries.
    pub fn matches_node(&self, dom: &dyn DomPort, node: NodeId) -> bool {
        let Some(element) = dom.element(node) else {
            return false;
        };
        if !self.needs_ancestors() {
            return self.matches(&element);
        }
        let chain: Vec<ElementDesc> = ancestors(dom, node)
            .into_iter()
            .filter_map(|ancestor| dom.element(ancestor))
            .collect();
        let refs: Vec<&ElementDesc> = chain.iter().collect();
        self.matches_path(&element, &refs)
    }
}

fn context_matches(context: &[(Combinator, Compound)], ancestors: &[&ElementDesc]) -> bool {
    let Some(((combinator, compound), rest)) = context.split_first() else {
        return true;
    };
    match combinator {
        Combinator::Child => ancestors.split_first().is_some_and(|(parent, above)| {
            compound.matches(parent) && context_matches(rest, above)
        }),
        Combinator::Descendant => (0..ancestors.len()).any(|i| {
            compound.matches(ancestors[i]) && context_matches(rest, &ancestors[i + 1..])
        }),
    }
}

impl Compound {
    fn matches(&self, el: &ElementDesc) -> bool {
        if let Some(tag) = &self.tag {
            if !el.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if self
            .ids
            .iter()
            .any(|id| el.id.as_deref() != Some(id.as_str()))
        {
            return false;
        }
        if self.classes.iter().any(|c| !el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|test| test.matches(el))
    }
}

impl AttrTest {
    fn matches(&self, el: &ElementDesc) -> bool {
        let class_value;
        let value = if self.name == "class" {
            if el.classes.is_empty() {
                None
            } else {
                class_value = el.class_attr();
                Some(class_value.as_str())
            }
        } else {
            el.attr(&self.name)
        };
        let Some(value) = value else {
            return false;
        };
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => value == v,
            AttrOp::Prefix(v) => !v.is_empty() && value.starts_with(v.as_str()),
            AttrOp::Suffix(v) => !v.is_empty() && value.ends_with(v.as_str()),
            AttrOp::Contains(v) => !v.is_empty() && value.contains(v.as_str()),
            AttrOp::Word(v) => value.split_whitespace().any(|w| w == v),
        }
    }
}

/// Splits on commas that are not inside brackets or quotes.
fn split_top_level(input: &str) -> Result<Vec<&str>, ()> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
        if depth < 0 {
            return Err(());
        }
    }
    if quote.is_some() || depth != 0 {
        return Err(());
    }
    parts.push(&input[start..]);
    if parts.iter().any(|p| p.trim().is_empty()) {
        return Err(());
    }
    Ok(parts)
}

fn parse_complex(part: &str, source: &str) -> Result<Complex, DomError> {
    let mut compounds = Vec::new();
    for (combinator, text) in split_compounds(part).map_err(|_| DomError::invalid(source))? {
        compounds.push((combinator, parse_compound(text, source)?));
    }
    let Some((last_combinator, subject)) = compounds.pop() else {
        return Err(DomError::invalid(source));
    };
    let mut context = Vec::with_capacity(compounds.len());
    let mut link = last_combinator;
    while let Some((combinator, compound)) = compounds.pop() {
        context.push((link.unwrap_or(Combinator::Descendant), compound));
        link = combinator;
    }
    Ok(Complex { subject, context })
}

/// Splits one complex selector into compounds, each paired with the
/// combinator that precedes it (`None` for the first).
fn split_compounds(input: &str) -> Result<Vec<(Option<Combinator>, &str)>, ()> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start: Option<(usize, Option<Combinator>)> = None;
    let mut pending: Option<Combinator> = None;
    for (idx, ch) in input.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        if depth > 0 {
            match ch {
                '"' | '\'' => quote = Some(ch),
                '[' => depth += 1,
                ']' => depth -= 1,
                _ => {}
            }
            continue;
        }
        if ch.is_whitespace() || ch == '>' {
            if let Some((begin, combinator)) = start.take() {
                out.push((combinator, &input[begin..idx]));
            }
            if ch == '>' {
                if out.is_empty() || pending == Some(Combinator::Child) {
                    return Err(());
                }
                pending = Some(Combinator::Child);
            } else if pending.is_none() && !out.is_empty() {
                pending = Some(Combinator::Descendant);
            }
            continue;
        }
        if start.is_none() {
            start = Some((idx, pending.take()));
        }
        if ch == '[' {
            depth += 1;
        }
    }
    if quote.is_some() || depth != 0 {
        return Err(());
    }
    match start {
        Some((begin, combinator)) => out.push((combinator, &input[begin..])),
        None if pending == Some(Combinator::Child) => return Err(()),
        None => {}
    }
    if out.is_empty() {
        return Err(());
    }
    Ok(out)
}

fn parse_compound(part: &str, source: &str) -> Result<Compound, DomError> {
    let chars: Vec<char> = part.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;

    if i < chars.len() && chars[i] == '*' {
        i += 1;
    } else if i < chars.len() && is_ident_start(chars[i]) {
        let (ident, next) = read_ident(&chars, i);
        compound.tag = Some(ident.to_ascii_lowercase());
        i = next;
    }

    while i < chars.len() {
        match chars[i] {
            '#' => {
                let (ident, next) = read_ident(&chars, i + 1);
                if ident.is_empty() {
                    return Err(DomError::invalid(source));
                }
                compound.ids.push(ident);
                i = next;
            }
            '.' => {
                let (ident, next) = read_ident(&chars, i + 1);
                if ident.is_empty() {
                    return Err(DomError::invalid(source));
                }
                compound.classes.push(ident);
                i = next;
            }
            '[' => {
                let (test, next) = read_attr(&chars, i + 1, source)?;
                compound.attrs.push(test);
                i = next;
            }
            ' ' | '>' | '+' | '~' | ':' => return Err(DomError::unsupported(source)),
            _ => return Err(DomError::invalid(source)),
        }
    }

    if compound.tag.is_none()
        && compound.ids.is_empty()
        && compound.classes.is_empty()
        && compound.attrs.is_empty()
        && !part.starts_with('*')
    {
        return Err(DomError::invalid(source));
    }
    Ok(compound)
}

fn read_attr(chars: &[char], mut i: usize, source: &str) -> Result<(AttrTest, usize), DomError> {
    skip_ws(chars, &mut i);
    let (name, next) = read_ident(chars, i);
    if name.is_empty() {
        return Err(DomError::invalid(source));
    }
    i = next;
    skip_ws(chars, &mut i);

    let op_kind = match chars.get(i) {
        Some(']') => {
            return Ok((
                AttrTest {
                    name: name.to_ascii_lowercase(),
                    op: AttrOp::Exists,
                },
                i + 1,
            ))
        }
        Some('=') => {
            i += 1;
            '='
        }
        Some(c @ ('^' | '$' | '*' | '~')) if chars.get(i + 1) == Some(&'=') => {
            i += 2;
            *c
        }
        _ => return Err(DomError::invalid(source)),
    };

    skip_ws(chars, &mut i);
    let value = match chars.get(i) {
        Some(q @ ('"' | '\'')) => {
            let quote = *q;
            i += 1;
            let mut value = String::new();
            loop {
                match chars.get(i) {
                    None => return Err(DomError::invalid(source)),
                    Some('\\') => {
                        if let Some(escaped) = chars.get(i + 1) {
                            value.push(*escaped);
                        }
                        i += 2;
                    }
                    Some(c) if *c == quote => {
                        i += 1;
                        break;
                    }
                    Some(c) => {
                        value.push(*c);
                        i += 1;
                    }
                }
            }
            value
        }
        _ => {
            let (ident, next) = read_ident(chars, i);
            if ident.is_empty() {
                return Err(DomError::invalid(source));
            }
            i = next;
            ident
        }
    };
    skip_ws(chars, &mut i);
    if chars.get(i) != Some(&']') {
        return Err(DomError::invalid(source));
    }

    let op = match op_kind {
        '=' => AttrOp::Equals(value),
        '^' => AttrOp::Prefix(value),
        '$' => AttrOp::Suffix(value),
        '*' => AttrOp::Contains(value),
        _ => AttrOp::Word(value),
    };
    Ok((
        AttrTest {
            name: name.to_ascii_lowercase(),
            op,
        },
        i + 1,
    ))
}

fn read_ident(chars: &[char], mut i: usize) -> (String, usize) {
    let mut out = String::new();
    while let Some(&c) = chars.get(i) {
        if c == '\\' {
            if let Some(&escaped) = chars.get(i + 1) {
                out.push(escaped);
                i += 2;
                continue;
            }
            break;
        }
        if is_ident_char(c) {
            out.push(c);
            i += 1;
        } else {
            break;
        }
    }
    (out, i)
}

fn skip_ws(chars: &[char], i: &mut usize) {
    while chars.get(*i).is_some_and(|c| c.is_whitespace()) {
        *i += 1;
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

/// True when `value` can be written after `#` or `.` without escaping.
pub fn is_plain_ident(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if is_ident_start(first) && !first.is_ascii_digit() => {}
        _ => return false,
    }
    if value.starts_with("--") || (value.starts_with('-') && value[1..].starts_with(|c: char| c.is_ascii_digit())) {
        return false;
    }
    chars.all(is_ident_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> ElementDesc {
        ElementDesc::new("button")
            .with_id("save")
            .with_class("btn")
            .with_class("btn-primary")
            .with_attr("type", "submit")
            .with_attr("data-testid", "save-button")
    }

    #[test]
    fn matches_compound_parts() {
        let el = button();
        for sel in [
            "button",
            "*",
            "#save",
            "button#save.btn.btn-primary",
            "[type=submit]",
            "[data-testid=\"save-button\"]",
            "[data-testid^='save']",
            "[data-testid$=button]",
            "[data-testid*=\"ve-bu\"]",
            "[class~=btn]",
            "a, button.btn",
        ] {
            let list = SelectorList::parse(sel).expect(sel);
            assert!(list.matches(&el), "{sel} should match");
        }
        for sel in ["a", ".missing", "#other", "[href]", "button[type=button]"] {
            let list = SelectorList::parse(sel).expect(sel);
            assert!(!list.matches(&el), "{sel} should not match");
        }
    }

    #[test]
    fn descendant_and_child_combinators_use_ancestors() {
        let ads = ElementDesc::new("div").with_class("ads");
        let figure = ElementDesc::new("figure");
        let img = ElementDesc::new("img");

        let nested = SelectorList::parse(".ads img").unwrap();
        assert!(nested.needs_ancestors());
        assert!(nested.matches_path(&img, &[&figure, &ads]));
        assert!(!nested.matches_path(&img, &[&figure]));
        assert!(!nested.matches(&img));

        let direct = SelectorList::parse("div.ads > img").unwrap();
        assert!(direct.matches_path(&img, &[&ads]));
        assert!(!direct.matches_path(&img, &[&figure, &ads]));

        let mixed = SelectorList::parse(".ads>figure img, video").unwrap();
        assert!(mixed.matches_path(&img, &[&figure, &ads]));
        assert!(mixed.matches(&ElementDesc::new("video")));
        assert!(!SelectorList::parse("button").unwrap().needs_ancestors());
    }

    #[test]
    fn rejects_unsupported_syntax_and_garbage() {
        assert!(matches!(
            SelectorList::parse("h2 + p"),
            Err(DomError::UnsupportedSelector(_))
        ));
        assert!(matches!(
            SelectorList::parse("a > > b"),
            Err(DomError::InvalidSelector(_))
        ));
        assert!(matches!(
            SelectorList::parse("> a"),
            Err(DomError::InvalidSelector(_))
        ));
        assert!(matches!(
            SelectorList::parse("a:hover"),
            Err(DomError::UnsupportedSelector(_))
        ));
        assert!(matches!(
            SelectorList::parse("div.hover:bg-blue"),
            Err(DomError::UnsupportedSelector(_))
        ));
        assert!(matches!(
            SelectorList::parse("[data-x"),
            Err(DomError::InvalidSelector(_))
        ));
        assert!(matches!(
            SelectorList::parse("a,,b"),
            Err(DomError::InvalidSelector(_))
        ));
        assert!(SelectorList::parse("   ").is_err());
        assert!(SelectorList::parse("div.").is_err());
    }

    #[test]
    fn plain_ident_detection() {
        assert!(is_plain_ident("email"));
        assert!(is_plain_ident("main-nav_2"));
        assert!(!is_plain_ident("2col"));
        assert!(!is_plain_ident("a:b"));
        assert!(!is_plain_ident("-1x"));
        assert!(!is_plain_ident(""));
    }
}
