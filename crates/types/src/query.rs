use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::json_path::select_path;
use crate::mapping::{MappingError, PropertyMap};
use crate::pagination::{Collection, PaginationFields, PaginationSource};

/// Identifier of a request-construction strategy.
///
/// Kinds are open-ended: new kinds only need a matching build strategy
/// registered with the query manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKind(Cow<'static, str>);

impl QueryKind {
    pub const REST: QueryKind = QueryKind(Cow::Borrowed("rest"));
    pub const GRAPHQL: QueryKind = QueryKind(Cow::Borrowed("graphql"));

    pub fn new(kind: impl Into<String>) -> Self {
        Self(Cow::Owned(kind.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability tag advertised by data providers and required by queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(Cow<'static, str>);

impl Capability {
    /// Plain HTTP request/response exchange.
    pub const HTTP: Capability = Capability(Cow::Borrowed("http"));
    /// GraphQL document execution over HTTP.
    pub const GRAPHQL: Capability = Capability(Cow::Borrowed("graphql"));

    pub fn new(capability: impl Into<String>) -> Self {
        Self(Cow::Owned(capability.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declarative description of one data-fetch operation.
///
/// A query carries no transport state. It is bound to a data provider and
/// turned into a prepared request when added to a query manager.
///
/// ```
/// use fathom_types::{Query, QueryKind};
///
/// let query = Query::rest("/posts/{id}")
///     .named("post")
///     .with_param("id", 7)
///     .with_root_path("data");
///
/// assert_eq!(query.name(), Some("post"));
/// assert_eq!(query.kind(), &QueryKind::REST);
/// assert_eq!(query.root_property_path(), Some("data"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    name: Option<String>,
    kind: QueryKind,
    required_capability: Capability,
    method: String,
    path: String,
    params: Map<String, Value>,
    headers: IndexMap<String, String>,
    body: Option<Value>,
    document: Option<String>,
    operation_name: Option<String>,
    root_property_path: Option<String>,
    sub_request: bool,
    pagination: PaginationFields,
    property_map: Option<PropertyMap>,
}

impl Query {
    /// Create an unnamed query of an arbitrary kind.
    pub fn new(kind: QueryKind, required_capability: Capability) -> Self {
        Self {
            name: None,
            kind,
            required_capability,
            method: "GET".into(),
            path: String::new(),
            params: Map::new(),
            headers: IndexMap::new(),
            body: None,
            document: None,
            operation_name: None,
            root_property_path: None,
            sub_request: false,
            pagination: PaginationFields::default(),
            property_map: None,
        }
    }

    /// A REST query against `path`, relative to the provider base URL.
    ///
    /// `{placeholder}` segments in the path are filled from params of the same name.
    pub fn rest(path: impl Into<String>) -> Self {
        let mut query = Self::new(QueryKind::REST, Capability::HTTP);
        query.path = path.into();
        query
    }

    /// A GraphQL query executing `document`. Params become the variables.
    ///
    /// The root property path defaults to `data`.
    pub fn graphql(document: impl Into<String>) -> Self {
        let mut query = Self::new(QueryKind::GRAPHQL, Capability::GRAPHQL);
        query.method = "POST".into();
        query.document = Some(document.into());
        query.root_property_path = Some("data".into());
        query
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_method(mut self, method: impl AsRef<str>) -> Self {
        self.method = method.as_ref().trim().to_ascii_uppercase();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn with_root_path(mut self, path: impl Into<String>) -> Self {
        self.root_property_path = Some(path.into());
        self
    }

    pub fn with_required_capability(mut self, capability: Capability) -> Self {
        self.required_capability = capability;
        self
    }

    /// Mark as a sub-request: transport failures are captured instead of
    /// aborting sibling queries.
    pub fn as_sub_request(mut self) -> Self {
        self.sub_request = true;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationFields) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_property_map(mut self, property_map: PropertyMap) -> Self {
        self.property_map = (!property_map.is_empty()).then_some(property_map);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }

    pub fn has_name(&self) -> bool {
        self.name().is_some()
    }

    pub fn kind(&self) -> &QueryKind {
        &self.kind
    }

    pub fn required_capability(&self) -> &Capability {
        &self.required_capability
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    pub fn root_property_path(&self) -> Option<&str> {
        self.root_property_path.as_deref()
    }

    pub fn set_root_property_path(&mut self, path: Option<String>) {
        self.root_property_path = path;
    }

    pub fn is_sub_request(&self) -> bool {
        self.sub_request
    }

    pub fn pagination(&self) -> &PaginationFields {
        &self.pagination
    }

    pub fn is_pagination_data_from_headers(&self) -> bool {
        self.pagination.source == PaginationSource::Headers
    }

    pub fn property_map(&self) -> Option<&PropertyMap> {
        self.property_map.as_ref()
    }

    /// Map a decoded payload onto a single item.
    ///
    /// `root_override` takes precedence over the query's own root path for
    /// this call only.
    pub fn map_item(&self, data: &Value, root_override: Option<&str>) -> Result<Value, MappingError> {
        let root = self.select_root(data, root_override)?;
        Ok(self.map_one(root))
    }

    /// Map a decoded payload onto a collection.
    ///
    /// Pagination counters are read from `headers` (lowercase keys) or from
    /// the full decoded body, depending on the query's pagination source.
    /// A `null` root maps to an empty collection.
    pub fn map_collection(
        &self,
        data: &Value,
        headers: &IndexMap<String, String>,
        root_override: Option<&str>,
    ) -> Result<Collection, MappingError> {
        let root = self.select_root(data, root_override)?;
        let items = match root {
            Value::Array(items) => items.iter().map(|item| self.map_one(item)).collect::<Vec<_>>(),
            Value::Null => Vec::new(),
            _ => {
                let path = root_override.or(self.root_property_path()).unwrap_or(".");
                return Err(MappingError::not_a_collection(path));
            }
        };
        let pagination = self.pagination.resolve(data, headers, items.len());
        Ok(Collection { items, pagination })
    }

    fn select_root<'a>(&self, data: &'a Value, root_override: Option<&str>) -> Result<&'a Value, MappingError> {
        match root_override.or(self.root_property_path()) {
            Some(path) => select_path(data, path).ok_or_else(|| MappingError::root_path_not_found(path)),
            None => Ok(data),
        }
    }

    fn map_one(&self, item: &Value) -> Value {
        match &self.property_map {
            Some(property_map) if item.is_object() => property_map.apply(item),
            _ => item.clone(),
        }
    }
}
