use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value};

/// Bytes left untouched in path placeholder values (RFC 3986 unreserved set).
const PATH_PLACEHOLDER: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Fill `{name}` placeholders in a path template from `variables`.
///
/// Values are percent-encoded. Placeholders without a matching variable are
/// left in place.
pub fn build_path(template: &str, variables: &Map<String, Value>) -> String {
    let mut path = template.to_string();
    for (key, value) in variables {
        let needle = format!("{{{}}}", key);
        if path.contains(&needle) {
            path = path.replace(&needle, &encode_path_placeholder_value(&scalar_to_string(value)));
        }
    }
    path
}

/// Split request parameters into path placeholders and the remainder.
///
/// Returns the resolved path plus every parameter that did not fill a
/// placeholder, in their original order.
pub fn split_path_params(template: &str, params: &Map<String, Value>) -> (String, Map<String, Value>) {
    let mut remaining = Map::new();
    let mut placeholders = Map::new();
    for (key, value) in params {
        if template.contains(&format!("{{{}}}", key)) {
            placeholders.insert(key.clone(), value.clone());
        } else {
            remaining.insert(key.clone(), value.clone());
        }
    }
    (build_path(template, &placeholders), remaining)
}

/// Join a base URL and a relative path with exactly one separating slash.
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.is_empty() {
        return base_url.to_string();
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn encode_path_placeholder_value(value: &str) -> String {
    utf8_percent_encode(value, PATH_PLACEHOLDER).to_string()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_path_preserves_unreserved_identifier_bytes() {
        let variables = Map::from_iter([("service_id".to_string(), json!("srv-d5f6a7b8"))]);
        assert_eq!(build_path("/v1/services/{service_id}", &variables), "/v1/services/srv-d5f6a7b8");
    }

    #[test]
    fn build_path_encodes_reserved_bytes_for_placeholder_values() {
        let variables = Map::from_iter([("project".to_string(), json!("team/app name"))]);
        assert_eq!(build_path("/v1/projects/{project}", &variables), "/v1/projects/team%2Fapp%20name");
    }

    #[test]
    fn split_path_params_keeps_unused_params() {
        let params = Map::from_iter([("id".to_string(), json!(7)), ("include".to_string(), json!("author"))]);
        let (path, remaining) = split_path_params("/posts/{id}", &params);

        assert_eq!(path, "/posts/7");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.get("include"), Some(&json!("author")));
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("https://api.example.com/", "/posts"), "https://api.example.com/posts");
        assert_eq!(join_url("https://api.example.com", "posts"), "https://api.example.com/posts");
        assert_eq!(join_url("https://api.example.com", ""), "https://api.example.com");
        assert_eq!(join_url("https://api.example.com", "https://cdn.example.com/a"), "https://cdn.example.com/a");
    }
}
