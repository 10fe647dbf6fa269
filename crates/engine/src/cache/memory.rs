use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::debug;

use super::{CacheError, CacheItem, CacheStore};
use crate::response::RawResponse;

#[derive(Debug, Clone)]
struct CacheEntry {
    expires_at: Option<Instant>,
    tags: Vec<String>,
    value: RawResponse,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.expires_at.is_none_or(|expires_at| Instant::now() < expires_at)
    }
}

/// In-process cache store keyed by request cache key.
///
/// Clones share the same underlying map, so one instance can back several
/// managers. Expired entries are dropped lazily on lookup.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    taggable: bool,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    /// A tag-aware memory cache.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            taggable: true,
        }
    }

    /// A memory cache that rejects tagging, for backends without tag support.
    pub fn untagged() -> Self {
        Self {
            taggable: false,
            ..Self::new()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get_item(&self, key: &str) -> Result<CacheItem, CacheError> {
        let mut entries = self.entries.lock().expect("cache lock");
        let item = CacheItem::new(key);
        match entries.get(key) {
            Some(entry) if entry.is_fresh() => Ok(item.with_value(entry.value.clone()).with_tags(entry.tags.clone())),
            Some(_) => {
                debug!(cache_key = %key, "cache entry expired");
                entries.remove(key);
                Ok(item)
            }
            None => Ok(item),
        }
    }

    fn save(&self, item: &CacheItem) -> Result<(), CacheError> {
        let value = item
            .value()
            .cloned()
            .ok_or_else(|| CacheError::backend(format!("refusing to save '{}' without a value", item.key())))?;
        if !self.taggable && !item.tags().is_empty() {
            return Err(CacheError::TaggingUnsupported);
        }
        let entry = CacheEntry {
            // Lifetimes past the clock's range never expire.
            expires_at: item.lifetime().and_then(|lifetime| Instant::now().checked_add(lifetime)),
            tags: item.tags().to_vec(),
            value,
        };
        self.entries.lock().expect("cache lock").insert(item.key().to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.lock().expect("cache lock").remove(key).is_some())
    }

    fn is_taggable(&self) -> bool {
        self.taggable
    }

    fn invalidate_tags(&self, tags: &[String]) -> Result<usize, CacheError> {
        if !self.taggable {
            return Err(CacheError::TaggingUnsupported);
        }
        let wanted = tags.iter().map(String::as_str).collect::<HashSet<_>>();
        let mut entries = self.entries.lock().expect("cache lock");
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.iter().any(|tag| wanted.contains(tag.as_str())));
        let removed = before - entries.len();
        debug!(tag_count = tags.len(), removed, "cache tags invalidated");
        Ok(removed)
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.lock().expect("cache lock").clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn item(key: &str) -> CacheItem {
        CacheItem::new(key).with_value(RawResponse::new(200, "{}"))
    }

    #[test]
    fn get_item_misses_then_hits_after_save() {
        let cache = MemoryCache::new();
        assert!(!cache.get_item("a").expect("lookup").is_hit());

        cache.save(&item("a")).expect("save");
        let hit = cache.get_item("a").expect("lookup");
        assert!(hit.is_hit());
        assert_eq!(hit.value().map(|raw| raw.status), Some(200));
    }

    #[test]
    fn expired_entries_are_misses() {
        let cache = MemoryCache::new();
        cache.save(&item("a").with_lifetime(Some(Duration::ZERO))).expect("save");
        assert!(!cache.get_item("a").expect("lookup").is_hit());
        assert!(cache.is_empty());
    }

    #[test]
    fn huge_lifetimes_never_expire() {
        let cache = MemoryCache::new();
        cache.save(&item("a").with_lifetime(Some(Duration::from_secs(u64::MAX)))).expect("save");
        assert!(cache.get_item("a").expect("lookup").is_hit());
    }

    #[test]
    fn invalidate_tags_removes_only_tagged_entries() {
        let cache = MemoryCache::new();
        cache.save(&item("a").with_tags(vec!["blog".into()])).expect("save");
        cache.save(&item("b").with_tags(vec!["shop".into()])).expect("save");
        cache.save(&item("c")).expect("save");

        let removed = cache.invalidate_tags(&["blog".to_string()]).expect("invalidate");
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn untagged_cache_rejects_tags() {
        let cache = MemoryCache::untagged();
        assert!(!cache.is_taggable());
        assert_eq!(
            cache.save(&item("a").with_tags(vec!["blog".into()])),
            Err(CacheError::TaggingUnsupported)
        );
        assert!(cache.save(&item("a")).is_ok());
    }

    #[test]
    fn save_requires_a_value() {
        let cache = MemoryCache::new();
        assert!(matches!(cache.save(&CacheItem::new("a")), Err(CacheError::Backend { .. })));
    }
}
