//! Turns free-form judge output into a [`Decision`].
//!
//! Tiers, first hit wins: the whole text as a JSON object, the first
//! balanced `{...}` inside it, a bare verdict token, then a fixed
//! escalation.

use super::report::{Decision, Verdict};
use serde_json::{Map, Value};

pub const NON_JSON_FALLBACK: &str = "non-JSON fallback";
pub const UNPARSEABLE: &str = "unparseable response";
pub const NO_REASON: &str = "no reason provided";

const DECISION_KEYS: [&str; 3] = ["decision", "conclusion", "result"];
const CONFIDENCE_KEYS: [&str; 2] = ["confidence", "score"];
const REASONING_KEYS: [&str; 2] = ["reasoning", "reason"];

pub fn parse_response(text: &str) -> Decision {
    if let Some(object) = extract_object(text) {
        return from_object(&object);
    }
    if let Some(verdict) = guess_verdict(text) {
        return Decision::new(verdict, 0.0, NON_JSON_FALLBACK);
    }
    Decision::escalate(UNPARSEABLE)
}

fn extract_object(text: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(object);
    }
    let candidate = first_balanced_object(text)?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Substring from the first `{` to its matching `}`. Braces inside
/// string literals do not count.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// First key present in the object wins, even when its value is null.
fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

fn from_object(object: &Map<String, Value>) -> Decision {
    let verdict = match first_present(object, &DECISION_KEYS) {
        Some(Value::String(raw)) => Verdict::normalize(raw),
        _ => Verdict::NeedGm,
    };
    let confidence = first_present(object, &CONFIDENCE_KEYS).map_or(0.0, coerce_confidence);
    let reasoning = match first_present(object, &REASONING_KEYS) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.trim().to_string(),
        Some(other) => other.to_string(),
    };
    let reasoning = if reasoning.is_empty() {
        NO_REASON.to_string()
    } else {
        reasoning
    };
    Decision::new(verdict, confidence, reasoning)
}

/// Numbers and numeric strings; anything else is 0.
pub fn coerce_confidence(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Case-insensitive scan for whole verdict words. Words are runs of ASCII
/// letters, digits and `_`, so "abandon" never reads as `BAN`. Mentions of
/// more than one distinct verdict are ambiguous and yield nothing.
fn guess_verdict(text: &str) -> Option<Verdict> {
    let mut found: Option<Verdict> = None;
    let words = text
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty());
    for word in words {
        let Some(verdict) = Verdict::ALL
            .into_iter()
            .find(|verdict| word.eq_ignore_ascii_case(verdict.as_str()))
        else {
            continue;
        };
        match found {
            Some(previous) if previous != verdict => return None,
            _ => found = Some(verdict),
        }
    }
    found
}
