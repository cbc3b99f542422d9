//! Resolution metrics for observability.
//!
//! Providers record what happened to each resolution attempt on lock-free
//! atomic counters; callers take a [`MetricsSnapshot`] when they want a
//! point-in-time view. There is no background reporting; displaying the
//! numbers is the embedding application's concern.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters for image resolution outcomes.
#[derive(Debug, Default)]
pub struct ResolveMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    fetches: AtomicU64,
    fallback_fetches: AtomicU64,
    decode_failures: AtomicU64,
    negative_hits: AtomicU64,
}

impl ResolveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fallback_fetch(&self) {
        self.fallback_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn negative_hit(&self) {
        self.negative_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            fallback_fetches: self.fallback_fetches.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            negative_hits: self.negative_hits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ResolveMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Resolutions answered by the image cache.
    pub cache_hits: u64,
    /// Resolutions that had to go to the source.
    pub cache_misses: u64,
    /// Network fetches issued.
    pub fetches: u64,
    /// Fetches retried under the fallback packaging extension.
    pub fallback_fetches: u64,
    /// Decodes that failed.
    pub decode_failures: u64,
    /// Lookups suppressed by the negative cache.
    pub negative_hits: u64,
}

/// Installs a fmt tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_snapshot() {
        let metrics = ResolveMetrics::new();
        metrics.cache_hit();
        metrics.cache_miss();
        metrics.cache_miss();
        metrics.fetch();
        metrics.fallback_fetch();
        metrics.decode_failure();
        metrics.negative_hit();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 2);
        assert_eq!(snapshot.fetches, 1);
        assert_eq!(snapshot.fallback_fetches, 1);
        assert_eq!(snapshot.decode_failures, 1);
        assert_eq!(snapshot.negative_hits, 1);
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
