//! Scripted data provider for manager tests. No network.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fathom_api::ApiClient;
use fathom_types::Capability;
use fathom_util::join_url;
use indexmap::IndexMap;
use serde_json::Value;

use crate::cache::CacheSettings;
use crate::error::{QueryError, TransportError};
use crate::provider::{DataProvider, decode_json, run_cached};
use crate::response::{CacheableResponse, RawResponse};

/// Shared record of the URLs a [`ScriptedProvider`] actually sent, in
/// completion order, plus how many sends overlapped.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<CallRecord>>);

#[derive(Debug, Default)]
struct CallRecord {
    urls: Vec<String>,
    in_flight: usize,
    peak_in_flight: usize,
}

impl CallLog {
    pub fn total(&self) -> usize {
        self.0.lock().expect("call log lock").urls.len()
    }

    pub fn for_url(&self, url: &str) -> usize {
        self.0.lock().expect("call log lock").urls.iter().filter(|sent| sent.as_str() == url).count()
    }

    pub fn urls(&self) -> Vec<String> {
        self.0.lock().expect("call log lock").urls.clone()
    }

    /// Most sends that were in flight at the same moment.
    pub fn peak_in_flight(&self) -> usize {
        self.0.lock().expect("call log lock").peak_in_flight
    }

    fn start(&self) {
        let mut record = self.0.lock().expect("call log lock");
        record.in_flight += 1;
        record.peak_in_flight = record.peak_in_flight.max(record.in_flight);
    }

    fn finish(&self, url: &str) {
        let mut record = self.0.lock().expect("call log lock");
        record.in_flight -= 1;
        record.urls.push(url.to_string());
    }
}

/// Serves canned responses keyed by absolute URL.
///
/// Unknown URLs fail with a network error. Cache handling goes through
/// [`run_cached`] like the real providers, so cache hits are not logged.
#[derive(Debug)]
pub struct ScriptedProvider {
    base_url: String,
    routes: IndexMap<String, Result<RawResponse, TransportError>>,
    delays: IndexMap<String, Duration>,
    capabilities: Vec<Capability>,
    cache: CacheSettings,
    accepts_transport: bool,
    calls: CallLog,
}

impl ScriptedProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            routes: IndexMap::new(),
            delays: IndexMap::new(),
            capabilities: vec![Capability::HTTP],
            cache: CacheSettings::default(),
            accepts_transport: true,
            calls: CallLog::default(),
        }
    }

    pub fn with_response(mut self, path: &str, raw: RawResponse) -> Self {
        self.routes.insert(join_url(&self.base_url, path), Ok(raw));
        self
    }

    pub fn with_failure(mut self, path: &str, error: TransportError) -> Self {
        self.routes.insert(join_url(&self.base_url, path), Err(error));
        self
    }

    /// Hold the send for `path` open for `delay` before answering.
    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(join_url(&self.base_url, path), delay);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn without_transport(mut self) -> Self {
        self.accepts_transport = false;
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
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

    fn set_transport(&mut self, _client: ApiClient) -> bool {
        self.accepts_transport
    }

    async fn run_request(&self, response: &mut CacheableResponse) -> Result<(), TransportError> {
        let url = response.request().url.clone();
        let outcome = self
            .routes
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::network(&url, "no scripted route")));
        let delay = self.delays.get(&url).copied();
        let calls = self.calls.clone();
        run_cached(&self.cache, response, async move {
            calls.start();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            calls.finish(&url);
            outcome
        })
        .await
    }

    fn decode(&self, response: &CacheableResponse) -> Result<Value, QueryError> {
        decode_json(response)
    }
}
