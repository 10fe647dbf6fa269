use anyhow::Result;
use async_trait::async_trait;
use fathom_api::ApiClient;
use fathom_types::Capability;
use serde_json::Value;

use super::{DataProvider, HttpProvider, decode_json};
use crate::cache::CacheSettings;
use crate::error::{QueryError, TransportError};
use crate::response::CacheableResponse;

/// Data provider for GraphQL endpoints served over HTTP.
///
/// Executes like [`HttpProvider`] but reports a top-level `errors` array in
/// the payload as [`QueryError::GraphQl`] when the response is decoded.
#[derive(Debug, Clone)]
pub struct GraphQlProvider {
    http: HttpProvider,
}

impl GraphQlProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: HttpProvider::new(base_url)?.with_capability(Capability::GRAPHQL),
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.http = self.http.with_header(name, value);
        self
    }

    pub fn with_client(mut self, client: ApiClient) -> Self {
        self.http = self.http.with_client(client);
        self
    }
}

fn error_messages(payload: &Value) -> Option<Vec<String>> {
    let errors = payload.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    let messages = errors
        .iter()
        .map(|error| match error.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => error.to_string(),
        })
        .collect();
    Some(messages)
}

#[async_trait]
impl DataProvider for GraphQlProvider {
    fn capabilities(&self) -> &[Capability] {
        self.http.capabilities()
    }

    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    fn cache_settings(&self) -> &CacheSettings {
        self.http.cache_settings()
    }

    fn cache_settings_mut(&mut self) -> &mut CacheSettings {
        self.http.cache_settings_mut()
    }

    fn set_transport(&mut self, client: ApiClient) -> bool {
        self.http.set_transport(client)
    }

    async fn run_request(&self, response: &mut CacheableResponse) -> Result<(), TransportError> {
        self.http.execute(response).await
    }

    fn decode(&self, response: &CacheableResponse) -> Result<Value, QueryError> {
        let payload = decode_json(response)?;
        match error_messages(&payload) {
            Some(messages) => Err(QueryError::GraphQl { messages }),
            None => Ok(payload),
        }
    }
}
