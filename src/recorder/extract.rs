//! Pulling field values out of model replies.
//!
//! Two formats are understood:
//!
//! - An inline block the model appends to a conversational reply:
//!
//!   ```text
//!   [FIELDS]
//!   goal: cut my commute
//!   constraints: budget under 500; must fit in the lift
//!   [/FIELDS]
//!   ```
//!
//! - A JSON object answering a full-transcript extraction request, possibly
//!   wrapped in prose or a code fence.

use serde_json::Value;

use super::Field;

const OPEN_TAG: &str = "[FIELDS]";
const CLOSE_TAG: &str = "[/FIELDS]";

/// Values that mean "nothing stated" and must not fill a field.
const PLACEHOLDERS: &[&str] = &[
    "", "-", "none", "null", "n/a", "na", "unknown", "not mentioned", "not specified",
    "not provided", "tbd", "कोई नहीं", "पता नहीं",
];

/// One extracted value, still in its raw textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub field: Field,
    pub value: String,
}

/// Split `reply` into the text meant for the user and the values found in
/// `[FIELDS]` blocks. Tags match case-insensitively; an unterminated block runs
/// to the end of the reply.
pub fn split_field_block(reply: &str) -> (String, Vec<Extracted>) {
    let mut visible = String::new();
    let mut values = Vec::new();
    let mut rest = reply;

    while let Some(start) = find_ci(rest, OPEN_TAG) {
        visible.push_str(&rest[..start]);
        let body_start = start + OPEN_TAG.len();
        let (body, after) = match find_ci(&rest[body_start..], CLOSE_TAG) {
            Some(end) => (
                &rest[body_start..body_start + end],
                &rest[body_start + end + CLOSE_TAG.len()..],
            ),
            None => (&rest[body_start..], ""),
        };
        values.extend(parse_block_lines(body));
        rest = after;
    }
    visible.push_str(rest);

    (visible.trim().to_string(), values)
}

/// ASCII case-insensitive substring search returning a byte offset in `haystack`.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - pat.len()).find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}

fn parse_block_lines(body: &str) -> Vec<Extracted> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim().trim_start_matches(['-', '*', '•']).trim();
            let (key, value) = line.split_once(':')?;
            let field: Field = key.parse().ok()?;
            let value = value.trim();
            (!is_placeholder(value)).then(|| Extracted {
                field,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Parse a JSON extraction answer. Unknown keys, placeholders and non-text
/// values are skipped; arrays become `;`-separated lists.
pub fn parse_extraction(reply: &str) -> Vec<Extracted> {
    let Some(object) = json_object(reply) else {
        tracing::debug!("extraction reply held no JSON object");
        return Vec::new();
    };

    object
        .into_iter()
        .filter_map(|(key, value)| {
            let field: Field = key.parse().ok()?;
            let text = match value {
                Value::String(s) => s,
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) if !is_placeholder(&s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let text = text.trim();
            (!is_placeholder(text)).then(|| Extracted {
                field,
                value: text.to_string(),
            })
        })
        .collect()
}

fn json_object(reply: &str) -> Option<serde_json::Map<String, Value>> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&reply[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim().trim_end_matches('.').to_lowercase();
    PLACEHOLDERS.contains(&v.as_str())
}

/// Split a list value into items. `;` and newlines separate items; a single
/// line with neither is split on commas.
pub fn split_list(value: &str) -> Vec<String> {
    let separators: &[char] = if value.contains(';') || value.contains('\n') {
        &[';', '\n']
    } else {
        &[',']
    };
    value
        .split(separators)
        .map(|item| item.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|item| !is_placeholder(item))
        .map(str::to_string)
        .collect()
}
