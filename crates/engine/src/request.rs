use std::hash::{DefaultHasher, Hash, Hasher};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A provider-native request built from a query, ready to execute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Capture transport failures on the response instead of returning them.
    pub suppress_errors: bool,
    /// Whether the response may be stored in and served from a cache.
    pub cacheable: bool,
    /// Name of the provider the request is bound to. Entries from different
    /// providers never share a cache key.
    #[serde(skip)]
    pub cache_scope: String,
}

impl PreparedRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: IndexMap::new(),
            query: Vec::new(),
            body: None,
            suppress_errors: false,
            cacheable: false,
            cache_scope: String::new(),
        }
    }

    /// Deterministic cache key covering the provider scope, method, URL,
    /// headers, query pairs, and body.
    ///
    /// Query pairs and headers are sorted first so their order does not split
    /// cache entries. Header names compare case-insensitively.
    pub fn cache_key(&self) -> String {
        let mut pairs = self.query.clone();
        pairs.sort();
        let mut headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
            .collect::<Vec<_>>();
        headers.sort();

        let mut hasher = DefaultHasher::new();
        self.cache_scope.hash(&mut hasher);
        self.method.to_ascii_uppercase().hash(&mut hasher);
        self.url.hash(&mut hasher);
        headers.hash(&mut hasher);
        pairs.hash(&mut hasher);
        if let Some(body) = &self.body {
            body.to_string().hash(&mut hasher);
        }
        format!("fathom.{:016x}", hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_key_ignores_query_pair_order() {
        let mut first = PreparedRequest::new("GET", "https://api.example.com/posts");
        first.query = vec![("page".into(), "2".into()), ("tag".into(), "rust".into())];
        let mut second = first.clone();
        second.query.reverse();

        assert_eq!(first.cache_key(), second.cache_key());
    }

    #[test]
    fn cache_key_distinguishes_bodies() {
        let mut first = PreparedRequest::new("POST", "https://api.example.com/graphql");
        first.body = Some(json!({"query": "{ a }"}));
        let mut second = first.clone();
        second.body = Some(json!({"query": "{ b }"}));

        assert_ne!(first.cache_key(), second.cache_key());
    }

    #[test]
    fn cache_key_covers_headers_and_scope() {
        let mut english = PreparedRequest::new("GET", "https://api.example.com/posts");
        english.headers.insert("Accept-Language".into(), "en".into());
        let mut french = english.clone();
        french.headers.insert("Accept-Language".into(), "fr".into());
        assert_ne!(english.cache_key(), french.cache_key());

        let mut renamed = english.clone();
        renamed.headers = IndexMap::from([("accept-language".to_string(), "en".to_string())]);
        assert_eq!(english.cache_key(), renamed.cache_key());

        let mut other_tenant = english.clone();
        other_tenant.cache_scope = "shop".into();
        assert_ne!(english.cache_key(), other_tenant.cache_key());
    }
}
