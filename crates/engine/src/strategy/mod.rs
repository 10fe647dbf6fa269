//! Build strategies turn a [`Query`] into a provider-native [`PreparedRequest`].
//!
//! The manager looks strategies up by [`QueryKind`]; adding support for a new
//! kind of query means registering a strategy for it.

mod graphql;
mod rest;

pub use graphql::GraphQlStrategy;
pub use rest::RestStrategy;

use std::sync::Arc;

use fathom_types::{Query, QueryKind};
use indexmap::IndexMap;

use crate::error::QueryError;
use crate::provider::DataProvider;
use crate::request::PreparedRequest;

/// Converts queries of one kind into prepared requests for a provider.
pub trait BuildQueryStrategy: Send + Sync + std::fmt::Debug {
    /// The query kind this strategy handles.
    fn kind(&self) -> QueryKind;

    /// Produce the request to execute. Called once, when the query is added.
    fn build(&self, query: &Query, provider: &dyn DataProvider) -> Result<PreparedRequest, QueryError>;
}

/// Strategies keyed by query kind. Registering a kind twice replaces the
/// earlier strategy.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: IndexMap<QueryKind, Arc<dyn BuildQueryStrategy>>,
}

impl StrategyRegistry {
    /// A registry with the REST and GraphQL strategies installed.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(RestStrategy));
        registry.register(Arc::new(GraphQlStrategy));
        registry
    }

    pub fn register(&mut self, strategy: Arc<dyn BuildQueryStrategy>) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    pub fn resolve(&self, kind: &QueryKind) -> Option<&Arc<dyn BuildQueryStrategy>> {
        self.strategies.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &QueryKind> {
        self.strategies.keys()
    }
}

/// Headers declared on the query, copied onto the request.
pub(crate) fn query_headers(query: &Query) -> IndexMap<String, String> {
    query.headers().clone()
}

/// Display name used in build errors.
pub(crate) fn query_label(query: &Query) -> String {
    query.name().unwrap_or("<unnamed>").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct CustomStrategy;

    impl BuildQueryStrategy for CustomStrategy {
        fn kind(&self) -> QueryKind {
            QueryKind::new("custom")
        }

        fn build(&self, _query: &Query, provider: &dyn DataProvider) -> Result<PreparedRequest, QueryError> {
            Ok(PreparedRequest::new("GET", provider.base_url()))
        }
    }

    #[test]
    fn defaults_cover_rest_and_graphql() {
        let registry = StrategyRegistry::with_defaults();
        assert!(registry.resolve(&QueryKind::REST).is_some());
        assert!(registry.resolve(&QueryKind::GRAPHQL).is_some());
        assert!(registry.resolve(&QueryKind::new("custom")).is_none());
    }

    #[test]
    fn register_adds_new_kinds() {
        let mut registry = StrategyRegistry::with_defaults();
        registry.register(Arc::new(CustomStrategy));
        assert_eq!(registry.kinds().count(), 3);
        assert!(registry.resolve(&QueryKind::new("custom")).is_some());
    }
}
