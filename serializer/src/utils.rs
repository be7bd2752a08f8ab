//! String utilities shared by the squashers, convertors and introspection

use crate::error::SerializerError;

/// Escape a string for use inside a single-quoted SQL literal
pub fn escape_single_quotes(s: &str) -> String {
    s.replace('\'', "''")
}

/// Render a string as a single-quoted SQL literal
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", escape_single_quotes(s))
}

/// Strip one layer of identifier quoting (`"x"`, `` `x` ``, `[x]`)
pub fn unquote_identifier(s: &str) -> &str {
    let s = s.trim();
    for (open, close) in [('"', '"'), ('`', '`'), ('[', ']')] {
        if let Some(inner) = s.strip_prefix(open).and_then(|r| r.strip_suffix(close)) {
            return inner;
        }
    }
    s
}

/// Split `input` on `delim` wherever the delimiter sits outside quotes and
/// parentheses. At most `max_fields` pieces are produced; the last piece keeps
/// the remainder verbatim, delimiters included.
pub fn split_fields<'a>(input: &'a str, delim: &str, max_fields: usize) -> Vec<&'a str> {
    let mut out = Vec::new();
    if delim.is_empty() || max_fields == 0 {
        out.push(input);
        return out;
    }

    let bytes = input.as_bytes();
    let delim_bytes = delim.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                _ => {
                    if depth == 0
                        && out.len() + 1 < max_fields
                        && bytes[i..].starts_with(delim_bytes)
                    {
                        out.push(&input[start..i]);
                        i += delim_bytes.len();
                        start = i;
                        continue;
                    }
                }
            },
        }
        i += 1;
    }
    out.push(&input[start..]);
    out
}

/// Split on every top-level occurrence of `delim`.
pub fn split_top_level<'a>(input: &'a str, delim: &str) -> Vec<&'a str> {
    split_fields(input, delim, usize::MAX)
}

/// Split a squashed list (`a,b,c`). An empty string is an empty list.
pub fn split_list(input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }
    split_top_level(input, ",")
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Decode an optional squashed field; empty and `undefined` mean absent.
pub fn opt_field(s: &str) -> Option<String> {
    match s {
        "" | "undefined" => None,
        other => Some(other.to_string()),
    }
}

/// Fetch field `idx` of a decoded token or fail with a decode error.
pub fn field<'a>(
    parts: &[&'a str],
    idx: usize,
    what: &'static str,
    input: &str,
) -> Result<&'a str, SerializerError> {
    parts
        .get(idx)
        .copied()
        .ok_or_else(|| SerializerError::decode(what, input))
}

pub fn parse_bool(s: &str, what: &'static str) -> Result<bool, SerializerError> {
    match s {
        "true" => Ok(true),
        "false" | "" | "undefined" => Ok(false),
        other => Err(SerializerError::decode(what, other)),
    }
}

/// Return the text between the parenthesis at byte offset `open` and its
/// matching close, honouring quotes. `None` when unbalanced.
pub fn balanced_parens(s: &str, open: usize) -> Option<(&str, usize)> {
    let bytes = s.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((&s[open + 1..i], i));
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Wrap an expression in parentheses unless it is already fully wrapped.
pub fn parenthesize(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.starts_with('(')
        && balanced_parens(trimmed, 0).is_some_and(|(_, end)| end == trimmed.len() - 1)
    {
        trimmed.to_string()
    } else {
        format!("({trimmed})")
    }
}

/// Remove one layer of parentheses wrapping the whole expression.
pub fn strip_outer_parens(expr: &str) -> &str {
    let trimmed = expr.trim();
    match balanced_parens(trimmed, 0) {
        Some((inner, end)) if end == trimmed.len() - 1 => inner.trim(),
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_respects_quotes_and_parens() {
        let parts = split_top_level("a;'x;y';f(1;2);b", ";");
        assert_eq!(parts, vec!["a", "'x;y'", "f(1;2)", "b"]);
    }

    #[test]
    fn split_fields_keeps_remainder() {
        let parts = split_fields("name;value; with ; more", ";", 2);
        assert_eq!(parts, vec!["name", "value; with ; more"]);
    }

    #[test]
    fn split_keeps_trailing_empty_field() {
        assert_eq!(split_top_level("a;;", ";"), vec!["a", "", ""]);
    }

    #[test]
    fn split_on_multi_char_delimiter() {
        let parts = split_top_level("id--false--true--last--,,lower(\"a--b\")--true", ",,");
        assert_eq!(parts.len(), 2);
        assert_eq!(split_top_level(parts[0], "--").len(), 5);
    }

    #[test]
    fn doubled_quotes_stay_inside_literal() {
        let parts = split_top_level("c;status <> 'it''s;x'", ";");
        assert_eq!(parts, vec!["c", "status <> 'it''s;x'"]);
    }

    #[test]
    fn parenthesize_only_once() {
        assert_eq!(parenthesize("a + b"), "(a + b)");
        assert_eq!(parenthesize("(a + b)"), "(a + b)");
        assert_eq!(parenthesize("(a) + (b)"), "((a) + (b))");
    }

    #[test]
    fn unquote() {
        assert_eq!(unquote_identifier("\"users\""), "users");
        assert_eq!(unquote_identifier("`users`"), "users");
        assert_eq!(unquote_identifier("[users]"), "users");
        assert_eq!(unquote_identifier("users"), "users");
    }

    #[test]
    fn literal_escaping() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn strips_only_wrapping_parens() {
        assert_eq!(strip_outer_parens("((price > 0))"), "(price > 0)");
        assert_eq!(strip_outer_parens("(a) AND (b)"), "(a) AND (b)");
    }
}
