//! Small string helpers shared by the strategies.

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters, never splitting a code point.
pub fn truncate_chars(input: &str, max: usize) -> String {
    match input.char_indices().nth(max) {
        Some((idx, _)) => input[..idx].to_string(),
        None => input.to_string(),
    }
}

/// Normalized visible text, clipped to `max` characters.
pub fn clean_text(input: &str, max: usize) -> String {
    truncate_chars(&collapse_whitespace(input), max)
}

/// Wraps a value in double quotes, escaping backslashes and quotes.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' | '\r' | '\t' => out.push(' '),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Emits a bare identifier when the value is one, otherwise a quoted
/// string. Used inside `[attr=value]` brackets.
pub fn attr_value(value: &str) -> String {
    if pagewire_core_types::css::is_plain_ident(value) {
        value.to_string()
    } else {
        quote(value)
    }
}

/// Escapes an id for use after `#`.
pub fn escape_ident(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (idx, ch) in value.chars().enumerate() {
        let needs_escape = !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii())
            || (idx == 0 && ch.is_ascii_digit());
        if needs_escape {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_collapsed_then_clipped() {
        assert_eq!(clean_text("  Add \n\t to   cart ", 50), "Add to cart");
        assert_eq!(clean_text("abcdef", 3), "abc");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(quote(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(quote(r"a\b"), r#""a\\b""#);
    }

    #[test]
    fn attr_values_quote_only_when_needed() {
        assert_eq!(attr_value("email"), "email");
        assert_eq!(attr_value("first name"), "\"first name\"");
    }

    #[test]
    fn ids_escape_special_characters() {
        assert_eq!(escape_ident("main-nav"), "main-nav");
        assert_eq!(escape_ident("a.b"), "a\\.b");
    }
}
