//! Cache abstraction consumed by data providers.
//!
//! Modules:
//! - `memory`: in-process [`CacheStore`] with expiry and tag invalidation
//! - `settings`: per-provider cache configuration pushed down by the manager

mod memory;
mod settings;

pub use memory::MemoryCache;
pub use settings::CacheSettings;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::response::RawResponse;

/// Errors raised by cache backends and cache configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend does not support tags")]
    TaggingUnsupported,

    #[error("no cache configured")]
    NotConfigured,

    #[error("cache backend error: {message}")]
    Backend { message: String },
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into() }
    }
}

/// One addressable cache slot.
///
/// Returned by [`CacheStore::get_item`] for both hits and misses; a miss is an
/// item without a value. Lifetime and tags are applied when the item is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    key: String,
    value: Option<RawResponse>,
    lifetime: Option<Duration>,
    tags: Vec<String>,
}

impl CacheItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            lifetime: None,
            tags: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: RawResponse) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_hit(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&RawResponse> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<RawResponse> {
        self.value
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Storage backend for cached responses.
///
/// Implementations must be safe to share between providers; every provider
/// registered with a manager holds the same store.
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Look up `key`, returning a miss (valueless item) when absent or expired.
    fn get_item(&self, key: &str) -> Result<CacheItem, CacheError>;

    /// Persist an item with its value, lifetime, and tags.
    fn save(&self, item: &CacheItem) -> Result<(), CacheError>;

    fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Whether items can carry tags for group invalidation.
    fn is_taggable(&self) -> bool;

    /// Remove every item carrying any of `tags`, returning how many were removed.
    fn invalidate_tags(&self, tags: &[String]) -> Result<usize, CacheError>;

    fn clear(&self) -> Result<(), CacheError>;
}
