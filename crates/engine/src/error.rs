//! Error types for query orchestration.

use fathom_types::{Capability, MappingError, QueryKind};
use fathom_util::JsonParseError;
use thiserror::Error;

use crate::cache::CacheError;

/// Main error type for query manager operations.
///
/// Configuration and lookup failures are returned synchronously from the
/// offending call. Transport failures surface from accessors that trigger a
/// run, unless the failing query is a sub-request.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query has no name; every query added to a manager must be named")]
    MissingName,

    #[error("A query named '{name}' is already registered")]
    DuplicateQuery { name: String },

    #[error("A data provider named '{name}' is already registered")]
    DuplicateProvider { name: String },

    #[error("Cannot add query '{query}': no data provider has been added")]
    NoProvider { query: String },

    #[error("Data provider not found: {name}")]
    UnknownProvider { name: String },

    #[error("Data provider '{provider}' cannot run query '{query}': missing capability '{capability}'")]
    IncompatibleProvider {
        query: String,
        provider: String,
        capability: Capability,
    },

    #[error("No build strategy registered for query kind '{kind}' (query '{query}')")]
    UnsupportedQueryKind { query: String, kind: QueryKind },

    #[error("Query not found: {name}")]
    UnknownQuery { name: String },

    #[error("Query '{name}' has no response after running the query stack")]
    ExecutionIncomplete { name: String },

    #[error("Cache tagging unsupported: {reason}")]
    TaggingUnsupported { reason: String },

    #[error("Could not build request for query '{query}': {reason}")]
    Build { query: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] JsonParseError),

    #[error("GraphQL errors: {}", .messages.join("; "))]
    GraphQl { messages: Vec<String> },

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl QueryError {
    pub fn duplicate_query(name: impl Into<String>) -> Self {
        Self::DuplicateQuery { name: name.into() }
    }

    pub fn duplicate_provider(name: impl Into<String>) -> Self {
        Self::DuplicateProvider { name: name.into() }
    }

    pub fn unknown_provider(name: impl Into<String>) -> Self {
        Self::UnknownProvider { name: name.into() }
    }

    pub fn unknown_query(name: impl Into<String>) -> Self {
        Self::UnknownQuery { name: name.into() }
    }

    pub fn tagging_unsupported(reason: impl Into<String>) -> Self {
        Self::TaggingUnsupported { reason: reason.into() }
    }

    pub fn build(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Build {
            query: query.into(),
            reason: reason.into(),
        }
    }
}

/// Failure raised while executing a prepared request.
///
/// Cloneable so a suppressed failure can stay attached to its response and be
/// reported again by later accessors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    url: String,
    status: Option<u16>,
}

impl TransportError {
    /// The request never produced a response (DNS, connect, timeout, ...).
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            message: format!("Network error for {}: {}", fathom_util::redact_sensitive(&url), message.into()),
            url,
            status: None,
        }
    }

    /// The server answered with a non-success status.
    pub fn status(url: impl Into<String>, status: u16, body_preview: impl AsRef<str>) -> Self {
        let url = url.into();
        let hint = fathom_util::status_error_message(status).unwrap_or_else(|| format!("HTTP {status}"));
        let preview = body_preview.as_ref().trim();
        let message = if preview.is_empty() {
            format!("{} from {}", hint, fathom_util::redact_sensitive(&url))
        } else {
            format!("{} from {}: {}", hint, fathom_util::redact_sensitive(&url), preview)
        };
        Self {
            message,
            url,
            status: Some(status),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_include_hint_and_preview() {
        let error = TransportError::status("https://api.example.com/me", 401, "{\"error\":\"nope\"}");
        assert_eq!(error.status_code(), Some(401));
        assert!(error.to_string().starts_with("Unauthorized (401)"));
        assert!(error.to_string().ends_with("{\"error\":\"nope\"}"));
    }

    #[test]
    fn network_errors_redact_tokens_in_urls() {
        let error = TransportError::network("https://api.example.com/?token=abc", "connection refused");
        assert!(error.status_code().is_none());
        assert!(!error.to_string().contains("abc"));
        assert_eq!(error.url(), "https://api.example.com/?token=abc");
    }

    #[test]
    fn graphql_errors_join_messages() {
        let error = QueryError::GraphQl {
            messages: vec!["first".into(), "second".into()],
        };
        assert_eq!(error.to_string(), "GraphQL errors: first; second");
    }
}
