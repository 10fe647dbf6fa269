//! Data providers: execute prepared requests and decode their responses.
//!
//! Modules:
//! - `http`: REST provider over a shared [`ApiClient`]
//! - `graphql`: GraphQL provider layered on the HTTP provider
//!
//! Every provider runs requests through [`run_cached`] so cache lookups,
//! writes, and error suppression behave the same regardless of transport.

mod graphql;
mod http;

pub use graphql::GraphQlProvider;
pub use http::HttpProvider;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fathom_api::ApiClient;
use fathom_types::Capability;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheError, CacheSettings, CacheStore};
use crate::error::{QueryError, TransportError};
use crate::response::{CacheableResponse, RawResponse};

/// A source of structured data reachable through some transport.
///
/// Providers are registered with a query manager under a unique name. The
/// manager pushes cache configuration and the shared transport onto every
/// provider, then hands it prepared requests to execute.
#[async_trait]
pub trait DataProvider: Send + Sync + std::fmt::Debug {
    /// Capabilities used to check query compatibility.
    fn capabilities(&self) -> &[Capability];

    fn supports(&self, capability: &Capability) -> bool {
        self.capabilities().contains(capability)
    }

    /// Base URL that build strategies resolve query paths against.
    fn base_url(&self) -> &str;

    fn cache_settings(&self) -> &CacheSettings;

    fn cache_settings_mut(&mut self) -> &mut CacheSettings;

    /// Adopt a shared transport. Returns `false` when the provider cannot use it.
    fn set_transport(&mut self, _client: ApiClient) -> bool {
        false
    }

    /// Execute the request held by `response`, filling it in place.
    ///
    /// When the request suppresses errors, a transport failure is captured on
    /// the response and `Ok(())` is returned. Otherwise the failure is both
    /// captured and returned.
    async fn run_request(&self, response: &mut CacheableResponse) -> Result<(), TransportError>;

    /// Decode an executed response into structured data.
    fn decode(&self, response: &CacheableResponse) -> Result<Value, QueryError>;

    fn set_cache(&mut self, store: Arc<dyn CacheStore>, lifetime: Option<Duration>) {
        self.cache_settings_mut().set_cache(store, lifetime);
    }

    fn cache(&self) -> Option<&Arc<dyn CacheStore>> {
        self.cache_settings().cache()
    }

    fn enable_cache(&mut self, lifetime: Option<Duration>) {
        self.cache_settings_mut().enable(lifetime);
    }

    fn disable_cache(&mut self) {
        self.cache_settings_mut().disable();
    }

    fn is_cache_enabled(&self) -> bool {
        self.cache_settings().is_enabled()
    }

    fn set_cache_tags(&mut self, tags: Vec<String>) -> Result<(), CacheError> {
        self.cache_settings_mut().set_tags(tags)
    }
}

/// Run `send` for `response`, consulting and filling the provider cache.
///
/// `send` is only polled on a cache miss. On a hit the cached raw response is
/// restored and the response is flagged as a hit. After a successful response
/// is written to the store the cache item is detached from the response.
pub async fn run_cached<F>(settings: &CacheSettings, response: &mut CacheableResponse, send: F) -> Result<(), TransportError>
where
    F: Future<Output = Result<RawResponse, TransportError>> + Send,
{
    let store = settings.active_store().filter(|_| response.request().cacheable).cloned();

    if let Some(store) = &store {
        let cache_key = response.request().cache_key();
        match store.get_item(&cache_key) {
            Ok(item) if item.is_hit() => {
                debug!(cache_key = %cache_key, "provider cache hit");
                if let Some(raw) = item.into_value() {
                    response.complete(raw);
                }
                response.set_hit(true);
                return Ok(());
            }
            Ok(item) => {
                debug!(cache_key = %cache_key, "provider cache miss");
                response.set_cache_item(item.with_lifetime(settings.lifetime()).with_tags(settings.tags().to_vec()));
            }
            Err(error) => warn!(cache_key = %cache_key, error = %error, "cache lookup failed"),
        }
    }

    let outcome = send.await;
    let item = response.unset_cache_item();
    match outcome {
        Ok(raw) if raw.is_success() => {
            if let (Some(store), Some(item)) = (&store, item) {
                let cache_key = item.key().to_string();
                match store.save(&item.with_value(raw.clone())) {
                    Ok(()) => debug!(cache_key = %cache_key, "provider response cached"),
                    Err(error) => warn!(cache_key = %cache_key, error = %error, "cache write failed"),
                }
            }
            response.complete(raw);
            Ok(())
        }
        Ok(raw) => {
            let preview = fathom_util::truncate_response_preview(&raw.body, STATUS_PREVIEW_LIMIT);
            let error = TransportError::status(&response.request().url, raw.status, preview);
            response.complete(raw);
            capture_failure(response, error)
        }
        Err(error) => capture_failure(response, error),
    }
}

/// Body characters kept on status errors.
const STATUS_PREVIEW_LIMIT: usize = 160;

fn capture_failure(response: &mut CacheableResponse, error: TransportError) -> Result<(), TransportError> {
    response.fail(error.clone());
    if response.request().suppress_errors {
        warn!(
            url = %fathom_util::redact_sensitive(&response.request().url),
            error = %error,
            "suppressed sub-request failure"
        );
        return Ok(());
    }
    Err(error)
}

/// Decode a response body as JSON. Empty bodies decode to `null`.
pub(crate) fn decode_json(response: &CacheableResponse) -> Result<Value, QueryError> {
    if let Some(failure) = response.failure() {
        return Err(QueryError::Transport(failure.clone()));
    }
    let Some(raw) = response.raw() else {
        return Ok(Value::Null);
    };
    if raw.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let status = reqwest::StatusCode::from_u16(raw.status).ok();
    Ok(fathom_util::parse_response_json_strict(&raw.body, status)?)
}
