//! JSON extraction from free-form model text
//!
//! Model output routinely wraps the requested JSON in narrative or markdown
//! fencing. This module digs the object out without ever panicking; a parse
//! failure is logged and reported as None.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fenced_json_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").unwrap())
}

/// Extract a JSON object from a string, tolerating markdown code fences and
/// surrounding narrative.
///
/// Resolution order: a fenced ```json block wins; otherwise the substring
/// from the first `{` to the last `}` is used; otherwise None. Control
/// characters other than newline, tab and carriage return are stripped
/// before parsing, since model output occasionally carries stray control
/// bytes that break strict parsers.
///
/// Pure and deterministic for identical input.
pub fn extract_json(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }

    let candidate = if let Some(captures) = fenced_json_re().captures(text) {
        captures.get(1)?.as_str().to_string()
    } else {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start {
            return None;
        }
        text[start..=end].to_string()
    };

    let cleaned: String = candidate
        .chars()
        .filter(|c| (*c as u32) > 31 || matches!(c, '\n' | '\t' | '\r'))
        .collect();

    match serde_json::from_str(&cleaned) {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("Failed to decode JSON from model output: {}", e);
            None
        }
    }
}
