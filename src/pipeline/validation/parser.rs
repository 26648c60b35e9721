use serde_json::{Map, Value};

use super::types::ValidationResult;
use super::ValidationError;

/// Length in bytes of the balanced `{...}` object at the start of `s`,
/// ignoring braces inside JSON strings.
fn balanced_object_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
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
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the validator verdict object in a noisy model reply.
///
/// Prose and markdown fences around the object are skipped. Candidates are
/// tried in order of their opening brace and the first object carrying an
/// `is_valid` key wins, so braces in leading prose ("use {placeholders}",
/// "an empty {}") do not hide the verdict that follows. When no candidate
/// has the key, the first parseable object is returned.
pub fn extract_json_object(reply: &str) -> Result<Map<String, Value>, ValidationError> {
    let mut first_object = None;
    let mut last_error = None;

    for (start, _) in reply.match_indices('{') {
        let Some(len) = balanced_object_len(&reply[start..]) else {
            continue;
        };
        match serde_json::from_str::<Value>(&reply[start..start + len]) {
            Ok(Value::Object(map)) if map.contains_key("is_valid") => return Ok(map),
            Ok(Value::Object(map)) => {
                first_object.get_or_insert(map);
            }
            Ok(_) => {}
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    if let Some(map) = first_object {
        return Ok(map);
    }
    Err(match last_error {
        Some(e) => ValidationError::JsonParsing(e),
        None => ValidationError::NoJsonObject,
    })
}

/// Map a model-reported confidence onto 0..=100.
///
/// Integers are clamped. A fractional value in [0, 1] is read as a ratio
/// (0.85 -> 85). Numeric strings are accepted; anything else counts as 0.
pub fn normalize_confidence(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };

    let Some(mut x) = raw.filter(|x| x.is_finite()) else {
        return 0;
    };
    if x.fract() != 0.0 && (0.0..=1.0).contains(&x) {
        x *= 100.0;
    }
    x.round().clamp(0.0, 100.0) as u8
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn parse_is_valid(value: Option<&Value>) -> Result<bool, ValidationError> {
    match value {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(ValidationError::MissingField("is_valid")),
    }
}

/// Parse the validator model's reply into the canonical result.
///
/// `is_valid` is required. Every other field has a conservative default.
pub fn parse_validation_reply(reply: &str) -> Result<ValidationResult, ValidationError> {
    let obj = extract_json_object(reply)?;

    let is_valid = parse_is_valid(obj.get("is_valid"))?;

    let corrections = obj
        .get("corrections")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string);

    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(ValidationResult {
        is_valid,
        confidence: normalize_confidence(obj.get("confidence")),
        issues: string_list(obj.get("issues")),
        corrections,
        safety_flags: string_list(obj.get("safety_flags")),
        reasoning,
    }
    .enforce_policy())
}
