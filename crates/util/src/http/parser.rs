//! # HTTP Response Parsing
//!
//! Helpers for turning raw HTTP response bodies into JSON with useful
//! diagnostics when the body is not what the caller expected.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Return a user-friendly hint for common HTTP failure statuses.
///
/// # Example
/// ```rust
/// use fathom_util::http::status_error_message;
///
/// let error_401 = status_error_message(401).unwrap();
/// assert!(error_401.contains("Unauthorized"));
///
/// let error_429 = status_error_message(429).unwrap();
/// assert!(error_429.contains("Too Many Requests"));
///
/// assert!(status_error_message(404).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: check the provider's Authorization header".into()),
        403 => Some("Forbidden (403). Hint: check the token's scopes and access to the resource".into()),
        429 => Some("Too Many Requests (429). Hint: lower concurrency or enable caching".into()),
        _ => None,
    }
}

/// Parse a response body as JSON, or explain why it is not JSON.
///
/// The error names the status (when known) and carries a whitespace-collapsed
/// preview of at most 200 bytes of the body, so HTML error pages and cut-off
/// payloads are recognisable in logs.
pub fn parse_response_json_strict(text: &str, status: Option<StatusCode>) -> Result<Value, JsonParseError> {
    serde_json::from_str::<Value>(text).map_err(|error| {
        let status_note = status
            .map(|code| format!("status {code}"))
            .unwrap_or_else(|| "unknown status".to_string());
        let preview = truncate_response_preview(text, 200);

        JsonParseError::new(status_note, error, preview)
    })
}

/// Collapse line breaks and tabs and cut `text` after roughly `limit` bytes.
/// Blank bodies become `<empty>`.
pub fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// A response body that should have been JSON but was not.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({status_note}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    status_note: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    pub fn new(status_note: String, source: serde_json::Error, body_preview: String) -> Self {
        Self {
            status_note,
            source,
            body_preview,
        }
    }

    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }

    pub fn source_error(&self) -> &serde_json::Error {
        &self.source
    }
}
