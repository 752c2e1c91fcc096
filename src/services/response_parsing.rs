//! Pulling structured content out of free-form oracle text.

use serde_json::Value;

/// Slice from the first `{` to the last `}`.
///
/// Oracles wrap JSON in prose or markdown fences; this tolerates both.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse the JSON object embedded in `raw`.
pub fn parse_json_object(raw: &str) -> Result<Value, String> {
    let slice = extract_json_object(raw).ok_or_else(|| "no JSON object found in response".to_string())?;
    serde_json::from_str(slice).map_err(|e| e.to_string())
}

/// Code and explanation recovered from an implementation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCode {
    /// Extracted source code
    pub code: String,
    /// Text outside the code block, trimmed
    pub explanation: String,
}

/// Recover code from an oracle response.
///
/// Tried in order: a JSON object with a string `code` field, the first fenced
/// code block, then the whole trimmed text. Returns `None` when nothing
/// non-empty is left.
pub fn extract_code(raw: &str) -> Option<ExtractedCode> {
    if let Ok(value) = parse_json_object(raw) {
        if let Some(code) = value.get("code").and_then(Value::as_str) {
            let code = code.trim();
            if !code.is_empty() {
                let explanation = value
                    .get("explanation")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                return Some(ExtractedCode {
                    code: code.to_string(),
                    explanation,
                });
            }
        }
    }

    let code = fenced_block(raw).unwrap_or_else(|| raw.trim());
    (!code.is_empty()).then(|| ExtractedCode {
        code: code.to_string(),
        explanation: String::new(),
    })
}

/// Body of the first ```` ``` ```` fenced block, language tag dropped.
fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_fence = &raw[open + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}
