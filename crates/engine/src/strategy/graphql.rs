use fathom_types::{Query, QueryKind};
use fathom_util::join_url;
use serde_json::{Map, Value};

use super::{BuildQueryStrategy, query_headers, query_label};
use crate::error::QueryError;
use crate::provider::DataProvider;
use crate::request::PreparedRequest;

/// Builds GraphQL-over-HTTP requests.
///
/// The document is posted as `{"query", "variables", "operationName"}` with
/// the query params as variables. Mutations are never cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphQlStrategy;

impl BuildQueryStrategy for GraphQlStrategy {
    fn kind(&self) -> QueryKind {
        QueryKind::GRAPHQL
    }

    fn build(&self, query: &Query, provider: &dyn DataProvider) -> Result<PreparedRequest, QueryError> {
        let document = query
            .document()
            .filter(|document| !document.trim().is_empty())
            .ok_or_else(|| QueryError::build(query_label(query), "GraphQL query has no document"))?;

        let mut body = Map::new();
        body.insert("query".into(), Value::String(document.to_string()));
        body.insert("variables".into(), Value::Object(query.params().clone()));
        if let Some(operation_name) = query.operation_name() {
            body.insert("operationName".into(), Value::String(operation_name.to_string()));
        }

        let mut request = PreparedRequest::new("POST", join_url(provider.base_url(), query.path()));
        request.headers = query_headers(query);
        request.body = Some(Value::Object(body));
        request.suppress_errors = query.is_sub_request();
        request.cacheable = !is_mutation(document);
        Ok(request)
    }
}

/// Whether the first operation in `document` is a mutation.
fn is_mutation(document: &str) -> bool {
    document
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .find(|line| !line.is_empty())
        .is_some_and(|line| {
            line.strip_prefix("mutation")
                .is_some_and(|rest| rest.chars().next().is_none_or(|next| !next.is_alphanumeric() && next != '_'))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::GraphQlProvider;
    use fathom_types::Capability;
    use serde_json::json;

    fn provider() -> GraphQlProvider {
        GraphQlProvider::new("https://api.example.com/graphql").expect("provider")
    }

    #[test]
    fn posts_document_with_variables() {
        let query = Query::graphql("query Post($id: ID!) { post(id: $id) { title } }")
            .named("post")
            .with_param("id", "7")
            .with_operation_name("Post");

        let request = GraphQlStrategy.build(&query, &provider()).expect("build");
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "https://api.example.com/graphql");
        assert!(request.cacheable);

        let body = request.body.expect("body");
        assert_eq!(body["variables"], json!({"id": "7"}));
        assert_eq!(body["operationName"], json!("Post"));
    }

    #[test]
    fn mutations_are_not_cacheable() {
        let query = Query::graphql("# create\nmutation { createPost(title: \"x\") { id } }");
        let request = GraphQlStrategy.build(&query, &provider()).expect("build");
        assert!(!request.cacheable);
    }

    #[test]
    fn missing_document_is_a_build_error() {
        let query = Query::new(QueryKind::GRAPHQL, Capability::GRAPHQL).named("empty");
        assert!(matches!(
            GraphQlStrategy.build(&query, &provider()),
            Err(QueryError::Build { query, .. }) if query == "empty"
        ));
    }

    #[test]
    fn mutation_detection_ignores_similar_names() {
        assert!(is_mutation("mutation Rename { rename }"));
        assert!(is_mutation("mutation{ rename }"));
        assert!(!is_mutation("mutations { all }"));
        assert!(!is_mutation("{ mutation }"));
        assert!(!is_mutation("query { viewer }"));
    }
}
