use anyhow::{Context, Result};
use async_trait::async_trait;
use fathom_api::{ApiClient, validate_base_url};
use fathom_types::Capability;
use indexmap::IndexMap;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use super::{DataProvider, decode_json, run_cached};
use crate::cache::CacheSettings;
use crate::error::{QueryError, TransportError};
use crate::request::PreparedRequest;
use crate::response::{CacheableResponse, RawResponse};

/// Data provider for JSON-over-HTTP APIs.
///
/// Requests inherit the provider's default headers; headers set on the query
/// win on conflict.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    base_url: String,
    headers: IndexMap<String, String>,
    client: ApiClient,
    cache: CacheSettings,
    capabilities: Vec<Capability>,
}

impl HttpProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        validate_base_url(base_url)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: IndexMap::new(),
            client: ApiClient::new().context("create http client")?,
            cache: CacheSettings::default(),
            capabilities: vec![Capability::HTTP],
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_client(mut self, client: ApiClient) -> Self {
        self.client = client;
        self
    }

    pub(crate) fn with_capability(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub(crate) fn replace_client(&mut self, client: ApiClient) {
        self.client = client;
    }

    pub(crate) async fn execute(&self, response: &mut CacheableResponse) -> Result<(), TransportError> {
        let request = response.request().clone();
        run_cached(&self.cache, response, self.send(request)).await
    }

    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|error| TransportError::network(&request.url, format!("invalid method '{}': {}", request.method, error)))?;

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in self.headers.iter().filter(|(name, _)| !has_header(&request.headers, name)) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| TransportError::network(&request.url, error.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str().to_ascii_lowercase(), value.to_string())))
            .collect::<IndexMap<_, _>>();
        let body = response
            .text()
            .await
            .map_err(|error| TransportError::network(&request.url, format!("failed to read body: {error}")))?;

        debug!(
            method = %request.method,
            url = %fathom_util::redact_sensitive(&request.url),
            status,
            "http request completed"
        );

        Ok(RawResponse { status, headers, body })
    }
}

fn has_header(headers: &IndexMap<String, String>, name: &str) -> bool {
    headers.keys().any(|existing| existing.eq_ignore_ascii_case(name))
}

#[async_trait]
impl DataProvider for HttpProvider {
    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn cache_settings(&self) -> &CacheSettings {
        &self.cache
    }

    fn cache_settings_mut(&mut self) -> &mut CacheSettings {
        &mut self.cache
    }

    fn set_transport(&mut self, client: ApiClient) -> bool {
        self.replace_client(client);
        true
    }

    async fn run_request(&self, response: &mut CacheableResponse) -> Result<(), TransportError> {
        self.execute(response).await
    }

    fn decode(&self, response: &CacheableResponse) -> Result<Value, QueryError> {
        decode_json(response)
    }
}
