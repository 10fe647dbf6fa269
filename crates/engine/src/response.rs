//! Response handles tracked by the query stack.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cache::CacheItem;
use crate::error::TransportError;
use crate::request::PreparedRequest;

/// A raw, undecoded response as returned by a transport.
///
/// Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: IndexMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Response handle for one prepared request, decorated with cache state.
///
/// Created unexecuted when a query is added. Running the request fills in
/// either a [`RawResponse`], a captured [`TransportError`], or both (a
/// non-success status keeps the body for inspection).
///
/// A cache item is attached only while the response is eligible for storage;
/// [`CacheableResponse::is_cacheable`] reflects exactly that.
#[derive(Debug, Clone)]
pub struct CacheableResponse {
    request: PreparedRequest,
    raw: Option<RawResponse>,
    failure: Option<TransportError>,
    hit: bool,
    cache_item: Option<CacheItem>,
}

impl CacheableResponse {
    pub fn new(request: PreparedRequest) -> Self {
        Self {
            request,
            raw: None,
            failure: None,
            hit: false,
            cache_item: None,
        }
    }

    pub fn request(&self) -> &PreparedRequest {
        &self.request
    }

    pub fn is_executed(&self) -> bool {
        self.raw.is_some() || self.failure.is_some()
    }

    pub fn raw(&self) -> Option<&RawResponse> {
        self.raw.as_ref()
    }

    pub fn status(&self) -> Option<u16> {
        self.raw.as_ref().map(|raw| raw.status)
    }

    pub fn body(&self) -> Option<&str> {
        self.raw.as_ref().map(|raw| raw.body.as_str())
    }

    /// Lowercase-keyed response headers, empty until executed.
    pub fn headers(&self) -> &IndexMap<String, String> {
        static EMPTY: std::sync::OnceLock<IndexMap<String, String>> = std::sync::OnceLock::new();
        match &self.raw {
            Some(raw) => &raw.headers,
            None => EMPTY.get_or_init(IndexMap::new),
        }
    }

    pub fn failure(&self) -> Option<&TransportError> {
        self.failure.as_ref()
    }

    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub fn set_hit(&mut self, hit: bool) {
        self.hit = hit;
    }

    pub fn is_cacheable(&self) -> bool {
        self.cache_item.is_some()
    }

    pub fn cache_item(&self) -> Option<&CacheItem> {
        self.cache_item.as_ref()
    }

    pub fn set_cache_item(&mut self, item: CacheItem) {
        self.cache_item = Some(item);
    }

    /// Detach the cache item once it has been persisted (or abandoned) so the
    /// response stops holding a copy of the payload.
    pub fn unset_cache_item(&mut self) -> Option<CacheItem> {
        self.cache_item.take()
    }

    pub fn complete(&mut self, raw: RawResponse) {
        self.raw = Some(raw);
    }

    pub fn fail(&mut self, error: TransportError) {
        self.failure = Some(error);
    }
}
