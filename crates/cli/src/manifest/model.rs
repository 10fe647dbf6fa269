use std::path::PathBuf;

use fathom_types::{Capability, PaginationFields, PropertyMap, Query, QueryKind};
use fathom_util::InterpolationError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Root of a query manifest. Providers and queries keep their file order.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
    #[serde(default)]
    pub queries: IndexMap<String, QueryConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub lifetime_secs: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Transport flavor for providers, and request flavor for queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Rest,
    Graphql,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Rest => write!(f, "rest"),
            ProviderKind::Graphql => write!(f, "graphql"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    pub base_url: String,
    /// Default headers. Values may contain `${env:NAME}` placeholders.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Provider to bind to; the last declared provider when omitted.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub root_path: Option<String>,
    #[serde(default)]
    pub sub_request: bool,
    #[serde(default)]
    pub pagination: Option<PaginationFields>,
    #[serde(default)]
    pub fields: PropertyMap,
    /// Map the result as a collection rather than a single item.
    #[serde(default)]
    pub collection: bool,
}

impl QueryConfig {
    /// Build the engine query named `name`.
    pub fn to_query(&self, name: &str) -> Query {
        let mut query = match self.kind {
            ProviderKind::Rest => Query::rest(self.path.as_str()),
            ProviderKind::Graphql => match &self.document {
                Some(document) => Query::graphql(document.as_str()).with_path(self.path.as_str()),
                None => Query::new(QueryKind::GRAPHQL, Capability::GRAPHQL).with_path(self.path.as_str()),
            },
        }
        .named(name)
        .with_params(self.params.clone())
        .with_property_map(self.fields.clone());

        if let Some(method) = &self.method {
            query = query.with_method(method);
        }
        if let Some(body) = &self.body {
            query = query.with_body(body.clone());
        }
        if let Some(operation_name) = &self.operation_name {
            query = query.with_operation_name(operation_name.as_str());
        }
        if let Some(root_path) = &self.root_path {
            query = query.with_root_path(root_path.as_str());
        }
        if let Some(pagination) = &self.pagination {
            query = query.with_pagination(pagination.clone());
        }
        for (name, value) in &self.headers {
            query = query.with_header(name.as_str(), value.as_str());
        }
        if self.sub_request {
            query = query.as_sub_request();
        }
        query
    }
}

/// Errors that can occur while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest not found at {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing environment variable '{name}' referenced in the manifest")]
    MissingEnvVar { name: String },

    #[error("Interpolation error: {0}")]
    Interpolation(InterpolationError),

    #[error("Invalid manifest: {message}")]
    Invalid { message: String },
}

impl ManifestError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

impl From<InterpolationError> for ManifestError {
    fn from(error: InterpolationError) -> Self {
        match error {
            InterpolationError::MissingEnvVar { name } => Self::MissingEnvVar { name },
            other => Self::Interpolation(other),
        }
    }
}
