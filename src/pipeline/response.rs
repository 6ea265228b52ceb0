//! Parse-and-validate boundary for the comparison reply.
//!
//! The comparison stage asks for JSON but gets free text back. This module is
//! the single place that decides whether that text is a [`MatchResult`].
//!
//! ## Accepted shapes
//!
//! - plain JSON: `{"Designation Match": 90, ...}`
//! - JSON wrapped in a ```` ```json ```` fence (fence newlines are already
//!   gone by the time the reply gets here)
//! - JSON embedded in a sentence: the outermost `{...}` span is tried
//! - keys in any case or spacing (`final_match`, `FinalMatch`), and
//!   `Keyword Match` / `Overall Match` as aliases
//! - values as numbers or numeric strings, with an optional `%` suffix
//!
//! Anything else is a [`ResponseFormatError`] that carries the raw reply.

use crate::error::ResponseFormatError;
use crate::output::MatchResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").unwrap());

/// Canonical key, then accepted normalised spellings.
const FIELDS: [(&str, &[&str]); 3] = [
    ("Designation Match", &["designationmatch"]),
    ("Semantic Keyword Match", &["semantickeywordmatch", "keywordmatch"]),
    ("Final Match", &["finalmatch", "overallmatch"]),
];

/// Parse the comparison reply into a typed result.
pub fn parse_match_result(raw: &str) -> Result<MatchResult, ResponseFormatError> {
    let fail = |detail: String| ResponseFormatError {
        detail,
        raw: raw.to_string(),
    };

    let text = raw.trim();
    if text.is_empty() {
        return Err(fail("empty reply".into()));
    }
    let text = strip_fence(text);

    let value = parse_json(text).ok_or_else(|| fail("no JSON object found".into()))?;
    let object = match value {
        Value::Object(map) => map,
        other => return Err(fail(format!("expected a JSON object, got {}", kind(&other)))),
    };

    let mut values = [0.0f64; 3];
    for (slot, (canonical, aliases)) in values.iter_mut().zip(FIELDS) {
        let field =
            find_field(&object, aliases).ok_or_else(|| fail(format!("missing '{canonical}'")))?;
        *slot = as_percentage(field)
            .ok_or_else(|| fail(format!("'{canonical}' is not a number: {field}")))?;
    }

    let [designation_match, keyword_match, final_match] = values;
    Ok(MatchResult {
        designation_match,
        keyword_match,
        final_match,
    })
}

fn strip_fence(text: &str) -> &str {
    match RE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text,
    }
}

/// Whole text first, then the outermost brace span.
fn parse_json(text: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return Some(v);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn normalise_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn find_field<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    object
        .iter()
        .find(|(k, _)| aliases.contains(&normalise_key(k).as_str()))
        .map(|(_, v)| v)
}

fn as_percentage(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
