//! Payload Normalization
//!
//! Models return JSON wrapped in prose, markdown fences, or both. This
//! module recovers the first brace-balanced JSON object from a raw text
//! payload: direct parse first, then fence stripping, then balanced-object
//! extraction.

use callsight_core::{CoreError, CoreResult};

/// Normalize a raw model payload into a JSON object value.
pub fn normalize_payload(raw: &str) -> CoreResult<serde_json::Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::parse("empty payload"));
    }

    // Fast path: the whole payload is the object.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if value.is_object() {
            return Ok(value);
        }
    }

    // Strip markdown fences and retry.
    let unfenced = strip_code_fences(trimmed);
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(unfenced.trim()) {
        if value.is_object() {
            return Ok(value);
        }
    }

    // Last resort: pull the first balanced object out of surrounding prose.
    if let Some(candidate) = extract_first_object(&unfenced) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&candidate) {
            if value.is_object() {
                return Ok(value);
            }
        }
    }

    Err(CoreError::parse(format!(
        "no JSON object in payload ({} chars)",
        raw.len()
    )))
}

/// Remove the first markdown code fence pair, returning its inner content.
/// Payloads without a fence pass through unchanged.
fn strip_code_fences(text: &str) -> String {
    let Some(open) = text.find("```") else {
        return text.to_string();
    };

    // Skip the optional language tag on the opening fence line.
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];

    match body.find("```") {
        Some(close) => body[..close].to_string(),
        None => body.to_string(),
    }
}

/// Extract the first brace-balanced JSON object, respecting string
/// literals and escapes.
fn extract_first_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }

    None
}
