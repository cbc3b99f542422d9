//! Bounded in-memory image cache backed by moka.
//!
//! Stores display URLs (mostly data URIs, which carry the pixel data
//! inline) with size-weighted LRU eviction. Moka's sync cache reads are
//! lock-free, which is what lets `get_cached` honor its never-block
//! contract.

use std::sync::atomic::{AtomicU64, Ordering};

use moka::sync::Cache;

use super::{png_data_uri, BoxFuture, CacheError, ImageCache};
use crate::decode::RawBitmap;

/// Default size budget: 256 MB of stored URLs.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 256 * 1024 * 1024;

/// In-memory image cache with size-weighted LRU eviction.
pub struct MemoryImageCache {
    cache: Cache<String, String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a cache bounded to roughly `max_size_bytes` of stored URL
    /// text. Data URIs dominate, so this is effectively a pixel budget.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = Cache::builder()
            .weigher(|key: &String, value: &String| {
                (key.len() + value.len()).min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Number of lookups answered from the cache.
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that missed.
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of entries currently held.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let found = self.cache.get(key);
        match &found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE_BYTES)
    }
}

impl ImageCache for MemoryImageCache {
    fn get_cached(&self, key: &str) -> Option<String> {
        self.lookup(key)
    }

    fn get_image<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(std::future::ready(self.lookup(key)))
    }

    fn save_image<'a>(
        &'a self,
        key: &'a str,
        bitmap: &'a RawBitmap,
    ) -> BoxFuture<'a, Result<String, CacheError>> {
        let result = png_data_uri(bitmap).inspect(|url| {
            self.cache.insert(key.to_string(), url.clone());
        });
        Box::pin(std::future::ready(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap() -> RawBitmap {
        RawBitmap {
            width: 1,
            height: 1,
            data: vec![1, 2, 3, 255],
        }
    }

    #[tokio::test]
    async fn test_save_then_lookup() {
        let cache = MemoryImageCache::default();

        assert_eq!(cache.get_image("crew_icons/cm_kirk").await, None);

        let url = cache.save_image("crew_icons/cm_kirk", &bitmap()).await.unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        assert_eq!(cache.get_image("crew_icons/cm_kirk").await, Some(url.clone()));
        assert_eq!(cache.get_cached("crew_icons/cm_kirk"), Some(url));
    }

    #[tokio::test]
    async fn test_hit_and_miss_counters() {
        let cache = MemoryImageCache::default();

        cache.get_cached("absent");
        assert_eq!(cache.miss_count(), 1);
        assert_eq!(cache.hit_count(), 0);

        cache.save_image("present", &bitmap()).await.unwrap();
        cache.get_cached("present");
        assert_eq!(cache.hit_count(), 1);
    }
}
