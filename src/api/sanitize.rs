use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

// A tag opens with `<` followed by a name, `/`, `!` or `?`; an unterminated
// tag swallows the rest of the string.
static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<[a-zA-Z/!?][^>]*(>|$)").expect("markup tag pattern to compile")
});

/// Trim, drop markup tags and HTML-escape a user supplied string.
pub fn clean_text(raw: &str) -> String {
    let stripped = TAG_PATTERN.replace_all(raw.trim(), "");
    escape_html(&stripped)
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Apply [`clean_text`] to every string inside `value`, at any depth.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_value(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Sanitize a decoded body, leaving the `raw` keys (passwords) untouched.
pub fn sanitize_fields(body: Map<String, Value>, raw: &[&str]) -> Map<String, Value> {
    body.into_iter()
        .map(|(key, value)| {
            if raw.contains(&key.as_str()) {
                (key, value)
            } else {
                (key, sanitize_value(value))
            }
        })
        .collect()
}
