use std::sync::Arc;
use std::time::Duration;

use super::{CacheError, CacheStore};

/// Cache configuration for one data provider (or the manager-wide defaults).
///
/// Caching is active only when a store is attached and the enabled flag is
/// set. Disabling never touches entries already in the store.
#[derive(Debug, Clone, Default)]
pub struct CacheSettings {
    store: Option<Arc<dyn CacheStore>>,
    enabled: bool,
    lifetime: Option<Duration>,
    tags: Vec<String>,
}

impl CacheSettings {
    /// Attach a store and enable caching.
    ///
    /// Tags are dropped when the new store cannot carry them.
    pub fn set_cache(&mut self, store: Arc<dyn CacheStore>, lifetime: Option<Duration>) {
        if !store.is_taggable() {
            self.tags.clear();
        }
        self.store = Some(store);
        self.enabled = true;
        if lifetime.is_some() {
            self.lifetime = lifetime;
        }
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref()
    }

    pub fn enable(&mut self, lifetime: Option<Duration>) {
        self.enabled = true;
        if lifetime.is_some() {
            self.lifetime = lifetime;
        }
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.store.is_some()
    }

    /// The store to use for the next request, if caching is active.
    pub fn active_store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref().filter(|_| self.enabled)
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether non-empty tags could be applied right now.
    pub fn supports_tags(&self) -> bool {
        self.store.as_ref().is_some_and(|store| store.is_taggable())
    }

    /// Replace the tag set applied to future cache writes.
    ///
    /// An empty set always succeeds. A non-empty set needs a taggable store.
    pub fn set_tags(&mut self, tags: Vec<String>) -> Result<(), CacheError> {
        if !tags.is_empty() {
            match &self.store {
                None => return Err(CacheError::NotConfigured),
                Some(store) if !store.is_taggable() => return Err(CacheError::TaggingUnsupported),
                Some(_) => {}
            }
        }
        self.replace_tags(tags);
        Ok(())
    }

    /// Replace the tag set without consulting the store.
    pub(crate) fn replace_tags(&mut self, tags: Vec<String>) {
        self.tags = tags;
    }
}
