use fathom_types::{Query, QueryKind};
use fathom_util::{build_query_pairs, join_url, split_path_params};
use serde_json::Value;

use super::{BuildQueryStrategy, query_headers};
use crate::error::QueryError;
use crate::provider::DataProvider;
use crate::request::PreparedRequest;

/// Builds plain HTTP requests.
///
/// `{name}` placeholders in the path are filled from params. For `GET`,
/// `HEAD`, and `DELETE` the leftover params become the query string; for
/// other methods an explicit body wins, otherwise leftovers form a JSON body.
/// Only `GET` and `HEAD` responses are cacheable.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestStrategy;

impl BuildQueryStrategy for RestStrategy {
    fn kind(&self) -> QueryKind {
        QueryKind::REST
    }

    fn build(&self, query: &Query, provider: &dyn DataProvider) -> Result<PreparedRequest, QueryError> {
        let method = query.method().to_ascii_uppercase();
        let (path, remaining) = split_path_params(query.path(), query.params());

        let mut request = PreparedRequest::new(method.as_str(), join_url(provider.base_url(), &path));
        request.headers = query_headers(query);
        request.suppress_errors = query.is_sub_request();
        request.cacheable = matches!(method.as_str(), "GET" | "HEAD");

        match method.as_str() {
            "GET" | "HEAD" | "DELETE" => request.query = build_query_pairs(&remaining),
            _ => {
                request.body = match query.body() {
                    Some(body) => Some(body.clone()),
                    None if remaining.is_empty() => None,
                    None => Some(Value::Object(remaining)),
                }
            }
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::HttpProvider;
    use serde_json::json;

    fn provider() -> HttpProvider {
        HttpProvider::new("https://api.example.com/v1").expect("provider")
    }

    #[test]
    fn get_requests_use_query_string_and_are_cacheable() {
        let query = Query::rest("/posts/{id}/comments")
            .named("comments")
            .with_param("id", 7)
            .with_param("page", 2);

        let request = RestStrategy.build(&query, &provider()).expect("build");
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "https://api.example.com/v1/posts/7/comments");
        assert_eq!(request.query, vec![("page".to_string(), "2".to_string())]);
        assert!(request.body.is_none());
        assert!(request.cacheable);
        assert!(!request.suppress_errors);
    }

    #[test]
    fn post_requests_send_leftover_params_as_body() {
        let query = Query::rest("/posts").with_method("post").with_param("title", "Hello");

        let request = RestStrategy.build(&query, &provider()).expect("build");
        assert_eq!(request.method, "POST");
        assert!(request.query.is_empty());
        assert_eq!(request.body, Some(json!({"title": "Hello"})));
        assert!(!request.cacheable);
    }

    #[test]
    fn explicit_body_wins_over_params() {
        let query = Query::rest("/posts")
            .with_method("PUT")
            .with_param("ignored", true)
            .with_body(json!({"title": "Explicit"}));

        let request = RestStrategy.build(&query, &provider()).expect("build");
        assert_eq!(request.body, Some(json!({"title": "Explicit"})));
    }

    #[test]
    fn sub_requests_suppress_errors_and_keep_headers() {
        let query = Query::rest("/optional").as_sub_request().with_header("X-Trace", "abc");

        let request = RestStrategy.build(&query, &provider()).expect("build");
        assert!(request.suppress_errors);
        assert_eq!(request.headers.get("X-Trace").map(String::as_str), Some("abc"));
    }
}
