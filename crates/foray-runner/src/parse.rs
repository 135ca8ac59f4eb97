//! Recovering a JSON object from raw model output.
//!
//! Models are asked for a bare JSON object but regularly wrap it in a
//! fenced code block, add prose around it, or leave a trailing comma. The
//! strategies are tried in order:
//! 1. Direct `serde_json` parse
//! 2. Contents of a fenced code block
//! 3. Trailing commas stripped
//! 4. Code block contents with trailing commas stripped
//! 5. The first balanced `{...}` span in the text, commas stripped

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// The first JSON object recoverable from `raw`.
pub fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();

    if let Some(object) = parse_object(trimmed) {
        return Some(object);
    }

    let block = extract_json_from_codeblock(trimmed);
    if let Some(object) = block.and_then(parse_object) {
        return Some(object);
    }

    if let Some(object) = parse_object(&strip_trailing_commas(trimmed)) {
        return Some(object);
    }

    if let Some(object) = block.and_then(|b| parse_object(&strip_trailing_commas(b))) {
        return Some(object);
    }

    first_object_span(trimmed).and_then(|span| parse_object(&strip_trailing_commas(span)))
}

/// Lowercased keys of `object`, nested keys joined to their parent with
/// `_` (`{"a": {"B": 1}}` gives `a_b`).
pub fn flatten_keys(object: &Map<String, Value>) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    for (key, value) in object {
        let key = key.to_lowercase();
        match value {
            Value::Object(inner) if !inner.is_empty() => {
                for nested in flatten_keys(inner) {
                    keys.insert(format!("{key}_{nested}"));
                }
            }
            _ => {
                keys.insert(key);
            }
        }
    }
    keys
}

/// `object` with every key lowercased, recursively.
pub fn lowercase_keys(object: Map<String, Value>) -> Map<String, Value> {
    object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Object(inner) => Value::Object(lowercase_keys(inner)),
                other => other,
            };
            (key.to_lowercase(), value)
        })
        .collect()
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(object) => Some(object),
        _ => None,
    }
}

/// Contents of the first ```` ```json ```` or ```` ``` ```` fence.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let open = text.find("```json").map_or_else(
        || text.find("```").map(|i| (i, 3)),
        |i| Some((i, 7)),
    )?;
    let after_tag = open.0.checked_add(open.1)?;
    let rest = text.get(after_tag..)?;
    let body_start = rest.find('\n').and_then(|nl| nl.checked_add(1)).unwrap_or(0);
    let body = rest.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

/// Drop commas directly followed (after whitespace) by `}` or `]`.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ',' {
            let closes = chars
                .clone()
                .find(|n| !n.is_whitespace())
                .is_some_and(|n| n == '}' || n == ']');
            if closes {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// The first brace-balanced `{...}` span, ignoring braces inside strings.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let tail = text.get(start..)?;
    let mut depth: u32 = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in tail.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth = depth.saturating_add(1),
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return tail.get(..=offset);
                }
            }
            _ => {}
        }
    }
    None
}
